//! Envelope - the request/response wire format.
//!
//! A JSON-RPC 2.0 compatible envelope, singular or batched:
//! - **Request**: `{jsonrpc: "2.0", id, method, params}`
//! - **Response**: `{jsonrpc: "2.0", id, result}` or `{jsonrpc: "2.0", id, error}`
//! - **Batch**: an order-preserving array of either
//!
//! Parsing of untrusted input lives in [`import`]; status mapping and reply
//! rendering live in [`export`].

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Id, RpcError};

pub mod enums;
pub mod export;
pub mod import;

pub use enums::{ErrorCode, StatusCategory};
pub use export::Reply;
pub use import::{parse_str, parse_value, Candidate, ParsedRequest};

/// Fixed protocol marker.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method answered with static server info instead of a tree lookup.
pub const SERVER_INFO_METHOD: &str = "rpc.server";

/// Separator between method path segments.
pub const PATH_SEPARATOR: char = '.';

/// The `jsonrpc` member. Serializes as `"2.0"` and refuses anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version;

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == JSONRPC_VERSION {
            Ok(Version)
        } else {
            Err(de::Error::custom(format!("unsupported jsonrpc version {raw:?}")))
        }
    }
}

/// A well-formed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: Version,
    pub id: Id,
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<Id>, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: Version,
            id: id.into(),
            method: method.into(),
            params: Some(Value::Array(params)),
        }
    }

    /// Method split into path segments.
    pub fn path(&self) -> Vec<&str> {
        self.method.split(PATH_SEPARATOR).collect()
    }

    /// Params as a positional sequence: absent is empty, an array stays as
    /// is, any other value becomes a one-element sequence.
    pub fn positional_params(&self) -> Vec<Value> {
        match &self.params {
            None => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        }
    }
}

/// Outcome member of a response: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// A Result or Failure response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: Version,
    pub id: Id,

    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    pub fn success(id: Id, value: Value) -> Self {
        Self {
            jsonrpc: Version,
            id,
            outcome: Outcome::Result(value),
        }
    }

    pub fn failure(id: Id, error: RpcError) -> Self {
        Self {
            jsonrpc: Version,
            id,
            outcome: Outcome::Error(error),
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match &self.outcome {
            Outcome::Error(err) => Some(err),
            Outcome::Result(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }

    pub fn status_category(&self) -> StatusCategory {
        match &self.outcome {
            Outcome::Result(_) => StatusCategory::Success,
            Outcome::Error(err) => err.kind().status_category(),
        }
    }

    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.outcome {
            Outcome::Result(value) => Ok(value),
            Outcome::Error(err) => Err(err),
        }
    }
}

/// Outbound payload: one response, or one per batch element in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Single(Response),
    Batch(Vec<Response>),
}

impl ResponsePayload {
    /// Responses as a slice, regardless of shape.
    pub fn responses(&self) -> &[Response] {
        match self {
            Self::Single(response) => std::slice::from_ref(response),
            Self::Batch(responses) => responses,
        }
    }
}
