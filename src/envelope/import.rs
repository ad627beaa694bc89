//! Envelope import from untrusted input.
//!
//! Parsing never fails outright: anything that cannot become a well-formed
//! [`Request`] turns into a ready-made Failure [`Response`] with a null id,
//! which the server echoes back without consulting the dispatcher.

use serde_json::Value;

use super::{Request, Response, Version, JSONRPC_VERSION};
use crate::types::{Id, RpcError};

/// One element of an inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    /// Passed the shape check; may be dispatched.
    Valid(Request),
    /// Rejected before dispatch; answered as-is.
    Rejected(Response),
}

impl Candidate {
    fn rejected(error: RpcError) -> Self {
        Self::Rejected(Response::failure(Id::Null, error))
    }
}

/// Parsed inbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRequest {
    Single(Candidate),
    /// Never empty; an empty array is reported as a single rejection.
    Batch(Vec<Candidate>),
}

/// Parse raw text. Undecodable text yields a single ParseError rejection.
pub fn parse_str(raw: &str) -> ParsedRequest {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => parse_value(value),
        Err(e) => {
            tracing::debug!("Rejecting undecodable payload: {}", e);
            ParsedRequest::Single(Candidate::rejected(RpcError::parse_error()))
        }
    }
}

/// Parse an already-decoded payload.
pub fn parse_value(value: Value) -> ParsedRequest {
    match value {
        Value::Array(items) if items.is_empty() => ParsedRequest::Single(Candidate::rejected(
            RpcError::invalid_request("Invalid Request"),
        )),
        Value::Array(items) => ParsedRequest::Batch(items.into_iter().map(check_request).collect()),
        other => ParsedRequest::Single(check_request(other)),
    }
}

/// Shape check for one request candidate.
pub fn check_request(value: Value) -> Candidate {
    let Value::Object(mut obj) = value else {
        return Candidate::rejected(RpcError::invalid_request("Invalid Request"));
    };
    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Candidate::rejected(RpcError::invalid_request("Invalid JSON-RPC version"));
    }
    let id = match obj.get("id") {
        None => return Candidate::rejected(RpcError::invalid_request("Missing ID")),
        Some(raw) => match Id::from_value(raw) {
            Some(id) => id,
            None => return Candidate::rejected(RpcError::invalid_request("Invalid ID")),
        },
    };
    let method = match obj.remove("method") {
        Some(Value::String(method)) => method,
        _ => return Candidate::rejected(RpcError::invalid_request("Invalid method")),
    };

    Candidate::Valid(Request {
        jsonrpc: Version,
        id,
        method,
        params: obj.remove("params"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::ErrorCode;
    use serde_json::json;

    fn rejection_code(candidate: &Candidate) -> Option<ErrorCode> {
        match candidate {
            Candidate::Rejected(resp) => resp.error().map(RpcError::kind),
            Candidate::Valid(_) => None,
        }
    }

    #[test]
    fn test_parse_error_on_bad_text() {
        let ParsedRequest::Single(candidate) = parse_str("{not json") else {
            panic!("expected single");
        };
        assert_eq!(rejection_code(&candidate), Some(ErrorCode::ParseError));
        let Candidate::Rejected(resp) = candidate else { unreachable!() };
        assert!(resp.id.is_null());
    }

    #[test]
    fn test_empty_batch_is_invalid_request() {
        let ParsedRequest::Single(candidate) = parse_str("[]") else {
            panic!("expected single");
        };
        assert_eq!(rejection_code(&candidate), Some(ErrorCode::InvalidRequest));
    }

    #[test]
    fn test_valid_single_request() {
        let parsed = parse_value(json!({"jsonrpc": "2.0", "id": "x", "method": "a.b", "params": [1]}));
        let ParsedRequest::Single(Candidate::Valid(req)) = parsed else {
            panic!("expected valid request");
        };
        assert_eq!(req.id, Id::from("x"));
        assert_eq!(req.method, "a.b");
        assert_eq!(req.params, Some(json!([1])));
    }

    #[test]
    fn test_shape_violations() {
        let cases = [
            json!(42),
            json!({"jsonrpc": "1.0", "id": 1, "method": "m"}),
            json!({"jsonrpc": "2.0", "method": "m"}),
            json!({"jsonrpc": "2.0", "id": {"nested": true}, "method": "m"}),
            json!({"jsonrpc": "2.0", "id": 1, "method": 5}),
        ];
        for case in cases {
            let ParsedRequest::Single(candidate) = parse_value(case.clone()) else {
                panic!("expected single for {case}");
            };
            assert_eq!(rejection_code(&candidate), Some(ErrorCode::InvalidRequest), "{case}");
            let Candidate::Rejected(resp) = candidate else { unreachable!() };
            assert!(resp.id.is_null(), "{case}");
        }
    }

    #[test]
    fn test_null_id_is_well_formed() {
        let parsed = parse_value(json!({"jsonrpc": "2.0", "id": null, "method": "m"}));
        assert!(matches!(parsed, ParsedRequest::Single(Candidate::Valid(_))));
    }

    #[test]
    fn test_batch_keeps_order_and_mixes_rejections() {
        let parsed = parse_value(json!([
            {"jsonrpc": "2.0", "id": 1, "method": "a"},
            "garbage",
            {"jsonrpc": "2.0", "id": 3, "method": "c"},
        ]));
        let ParsedRequest::Batch(items) = parsed else {
            panic!("expected batch");
        };
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], Candidate::Valid(r) if r.id == Id::from(1u64)));
        assert_eq!(rejection_code(&items[1]), Some(ErrorCode::InvalidRequest));
        assert!(matches!(&items[2], Candidate::Valid(r) if r.id == Id::from(3u64)));
    }
}
