//! Error codes and transport status categories.

use serde::{Deserialize, Serialize};

/// Classified error kinds with their reserved JSON-RPC codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// -32700: payload not decodable.
    ParseError,
    /// -32600: envelope shape violation, including an empty batch.
    InvalidRequest,
    /// -32601: path does not resolve to an endpoint.
    MethodNotFound,
    /// -32602: validator rejection.
    InvalidParams,
    /// -32603: uncaught failure inside a transformer or procedure.
    InternalError,
    /// Any other code, raised deliberately by a procedure.
    Application(i64),
}

impl ErrorCode {
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::Application(code) => code,
        }
    }

    pub const fn from_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            other => Self::Application(other),
        }
    }

    /// Fixed code-to-status table. Unknown application codes count as
    /// server errors.
    pub const fn status_category(self) -> StatusCategory {
        match self {
            Self::ParseError | Self::InvalidRequest | Self::InvalidParams => {
                StatusCategory::ClientError
            }
            Self::MethodNotFound => StatusCategory::NotFound,
            Self::InternalError | Self::Application(_) => StatusCategory::ServerError,
        }
    }
}

/// Transport-level outcome of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Success,
    ClientError,
    NotFound,
    ServerError,
    /// Batch elements disagree.
    Mixed,
    /// Empty response array.
    NoContent,
}

impl StatusCategory {
    /// HTTP status an adapter should send for this category.
    pub const fn http_status(self) -> u16 {
        match self {
            Self::Success => 200,
            Self::NoContent => 204,
            Self::Mixed => 207,
            Self::ClientError => 400,
            Self::NotFound => 404,
            Self::ServerError => 500,
        }
    }
}
