//! Envelope export: status mapping and reply rendering.

use super::{ResponsePayload, StatusCategory};

/// Media type of every reply body.
pub const CONTENT_TYPE: &str = "application/json";

/// Aggregate status of an outbound payload.
///
/// A batch reports its elements' shared category, or `Mixed` when they
/// disagree. An empty response array is `NoContent`.
pub fn status_category(payload: &ResponsePayload) -> StatusCategory {
    let mut categories = payload.responses().iter().map(|r| r.status_category());
    let Some(first) = categories.next() else {
        return StatusCategory::NoContent;
    };
    if categories.all(|c| c == first) {
        first
    } else {
        StatusCategory::Mixed
    }
}

/// What an HTTP adapter writes back: a status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCategory,
    pub body: ResponsePayload,
}

impl Reply {
    pub fn new(body: ResponsePayload) -> Self {
        Self {
            status: status_category(&body),
            body,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.status.http_status()
    }

    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE
    }

    /// Render the body as JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Response;
    use crate::types::{Id, RpcError};
    use serde_json::json;

    fn ok(id: u64) -> Response {
        Response::success(Id::from(id), json!(id))
    }

    #[test]
    fn test_single_status() {
        assert_eq!(status_category(&ResponsePayload::Single(ok(1))), StatusCategory::Success);
        let missing = Response::failure(Id::from(1u64), RpcError::method_not_found());
        assert_eq!(status_category(&ResponsePayload::Single(missing)), StatusCategory::NotFound);
    }

    #[test]
    fn test_uniform_batch_status() {
        let payload = ResponsePayload::Batch(vec![ok(1), ok(2)]);
        assert_eq!(status_category(&payload), StatusCategory::Success);
    }

    #[test]
    fn test_mixed_batch_status() {
        let payload = ResponsePayload::Batch(vec![
            ok(1),
            Response::failure(Id::from(2u64), RpcError::invalid_params("bad")),
        ]);
        assert_eq!(status_category(&payload), StatusCategory::Mixed);
        assert_eq!(Reply::new(payload).http_status(), 207);
    }

    #[test]
    fn test_empty_response_array_is_no_content() {
        let reply = Reply::new(ResponsePayload::Batch(Vec::new()));
        assert_eq!(reply.status, StatusCategory::NoContent);
        assert_eq!(reply.http_status(), 204);
        assert_eq!(reply.to_json().unwrap(), "[]");
    }
}
