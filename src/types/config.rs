//! Configuration structures.
//!
//! Every section deserializes with defaults, so a partial config file (or
//! none at all) yields a working setup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server-side envelope handling.
    #[serde(default)]
    pub server: ServerConfig,

    /// Client transport batching and deadlines.
    #[serde(default)]
    pub client: ClientConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// How the elements of a batch are evaluated. Response order is the same
/// either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    #[default]
    Concurrent,
    Sequential,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported by the `rpc.server` probe.
    pub name: String,

    /// Answer `rpc.server` without touching the procedure tree.
    pub expose_server_info: bool,

    pub batch_mode: BatchMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "kissrpc".to_string(),
            expose_server_info: true,
            batch_mode: BatchMode::Concurrent,
        }
    }
}

/// Client transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Flush as soon as this many calls are queued.
    pub max_batch_size: usize,

    /// Flush this long after the first call of an open window.
    #[serde(with = "humantime_serde")]
    pub max_batch_wait: Duration,

    /// Deadline for one round trip.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 1,
            max_batch_wait: Duration::ZERO,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
