//! Core types shared across the crate.
//!
//! - **Ids**: the wire identifier (`string | number | null`)
//! - **Errors**: classified RPC errors and the crate error enum
//! - **Config**: server, client and observability configuration

mod config;
mod errors;
mod ids;

pub use config::{BatchMode, ClientConfig, Config, ObservabilityConfig, ServerConfig};
pub use errors::{BoxError, Cause, Error, Panicked, Result, RpcError};
pub use ids::Id;
