//! Application error types.
//!
//! Two families live here:
//! - [`RpcError`]: a classified error that crosses the dispatcher/envelope
//!   boundary and is serialized as the `error` member of a Failure.
//! - [`Error`]: everything the crate itself can fail with, including the
//!   client-side taxonomy (requester, batch mismatch, transport, timeout).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::envelope::ErrorCode;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by procedures and context transformers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Local-only cause attached to a classified error.
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

/// Classified error carried by a Failure response.
///
/// `cause` holds the original, unclassified error for in-process diagnostics.
/// It is skipped by serde and therefore never reaches the wire.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("{message} (code {code})")]
pub struct RpcError {
    pub code: i64,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip)]
    cause: Option<Cause>,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            cause: None,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError.code(), "Parse error")
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest.code(), message)
    }

    pub fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound.code(), "Method not found")
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams.code(), message)
    }

    /// Wrap an unclassified failure, keeping it for local diagnostics only.
    pub fn internal(cause: impl Into<Cause>) -> Self {
        Self::new(ErrorCode::InternalError.code(), "Internal error").with_cause(cause)
    }

    /// InternalError for a procedure or transformer that panicked. The panic
    /// message is kept as the local cause.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let cause: Cause = Arc::new(Panicked::from_payload(payload));
        Self::internal(cause)
    }

    /// A deliberately raised application error with a custom code.
    pub fn application(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            data,
            ..Self::new(code, message)
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Cause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// The original error behind this one, if any. Never serialized.
    pub fn original_cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Shared handle to the cause, for re-attaching it to a remapped error.
    pub fn shared_cause(&self) -> Option<Cause> {
        self.cause.clone()
    }

    pub fn kind(&self) -> ErrorCode {
        ErrorCode::from_code(self.code)
    }

    /// Classify an error raised by a procedure or transformer.
    ///
    /// An `RpcError` keeps its code, message and data; anything else becomes
    /// an InternalError with the original retained as cause.
    pub fn classify(err: BoxError) -> Self {
        match err.downcast::<RpcError>() {
            Ok(rpc) => *rpc,
            Err(other) => Self::internal(Cause::from(other)),
        }
    }
}

/// Cause recorded when a procedure or transformer panics.
#[derive(Error, Debug)]
#[error("panicked: {0}")]
pub struct Panicked(pub String);

impl Panicked {
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&'static str>()
                .map_or_else(|| "non-string panic payload".to_string(), |s| s.to_string()),
        };
        Self(message)
    }
}

impl PartialEq for RpcError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message && self.data == other.data
    }
}

/// Main error enum for the crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The server answered with a Failure.
    #[error("rpc error: {0}")]
    Rpc(RpcError),

    /// Response version, identifier, or shape did not match the request.
    #[error("requester error: {0}")]
    Requester(String),

    /// A batch reply whose length differs from the number of requests sent.
    #[error("batch mismatch: sent {sent} requests, received {received} responses")]
    BatchMismatch { sent: usize, received: usize },

    /// Network failure or non-success transport outcome.
    #[error("transport error: {0}")]
    Transport(String),

    /// The round trip exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Router key or client path segment is not a legal name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// A validator schema failed to compile.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Router key registered twice at one level.
    #[error("duplicate route: {0}")]
    DuplicateRoute(String),

    /// The requester went away before the call settled.
    #[error("requester closed before the call settled")]
    Closed,

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<RpcError> for Error {
    fn from(err: RpcError) -> Self {
        Self::Rpc(err)
    }
}

// Convenience constructors
impl Error {
    pub fn requester(msg: impl Into<String>) -> Self {
        Self::Requester(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName(name.into())
    }

    /// Code of the server-side error, when this is one.
    pub fn rpc_code(&self) -> Option<i64> {
        match self {
            Self::Rpc(err) => Some(err.code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn test_classify_preserves_rpc_error() {
        let raised: BoxError = Box::new(RpcError::application(-32001, "quota", Some(json!({"left": 0}))));
        let classified = RpcError::classify(raised);
        assert_eq!(classified.code, -32001);
        assert_eq!(classified.message, "quota");
        assert_eq!(classified.data, Some(json!({"left": 0})));
        assert!(classified.original_cause().is_none());
    }

    #[test]
    fn test_classify_wraps_foreign_error() {
        let classified = RpcError::classify(Box::new(DiskError));
        assert_eq!(classified.kind(), ErrorCode::InternalError);
        assert_eq!(classified.message, "Internal error");
        assert_eq!(classified.original_cause().unwrap().to_string(), "disk on fire");
    }

    #[test]
    fn test_cause_never_serialized() {
        let err = RpcError::internal(Cause::from(Box::new(DiskError) as BoxError));
        let wire = serde_json::to_value(&err).unwrap();
        assert_eq!(wire, json!({"code": -32603, "message": "Internal error"}));
    }

    #[test]
    fn test_panic_payload_becomes_internal_cause() {
        let err = RpcError::from_panic(Box::new("handler bug"));
        assert_eq!(err.kind(), ErrorCode::InternalError);
        assert_eq!(err.original_cause().unwrap().to_string(), "panicked: handler bug");

        let owned = RpcError::from_panic(Box::new(format!("index {}", 3)));
        assert_eq!(owned.original_cause().unwrap().to_string(), "panicked: index 3");
    }

    #[test]
    fn test_error_display() {
        let err = Error::BatchMismatch { sent: 3, received: 2 };
        assert_eq!(err.to_string(), "batch mismatch: sent 3 requests, received 2 responses");
        assert_eq!(Error::from(RpcError::method_not_found()).rpc_code(), Some(-32601));
    }
}
