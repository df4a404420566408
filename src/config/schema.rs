//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the TOML config file.

use serde::{Deserialize, Serialize};

use crate::backend::RelayMode;
use crate::inspect::DEFAULT_MAX_HEADER_BYTES;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Client-facing listener.
    pub listener: ListenerConfig,

    /// Named backends registered at startup.
    pub backends: Vec<BackendConfig>,

    /// How connections are inspected and routed.
    pub processing: ProcessingConfig,

    /// Buffer and header limits.
    pub limits: LimitsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent client connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// A named backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Identifier used by routing rules.
    pub name: String,

    pub host: String,

    pub port: u16,

    #[serde(default)]
    pub relay_mode: RelayMode,
}

/// Which processing mode connections use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    /// Inspect raw chunks.
    Raw,
    /// Inspect the parsed header map.
    #[default]
    Headers,
    /// Inspect one gating header.
    Header,
}

/// Connection processing pipeline.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub mode: ModeKind,

    /// Gating header for `header` mode.
    pub header: Option<String>,

    /// Target used when no rule matches (backend name or `host:port`).
    pub default_target: Option<String>,

    /// Ordered routing rules; first match wins.
    pub rules: Vec<RuleConfig>,
}

/// One routing rule.
///
/// Which fields apply depends on the mode: `prefix` for `raw`, `header` and
/// `value` for `headers`, `value` alone for `header`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleConfig {
    /// Byte prefix of the first chunk.
    pub prefix: Option<String>,

    /// Header to compare in `headers` mode.
    pub header: Option<String>,

    /// Expected header value (case-insensitive).
    pub value: Option<String>,

    /// Backend name or `host:port`.
    pub target: String,
}

/// Size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest header block accepted before the terminator.
    pub max_header_bytes: usize,

    /// Read buffer reserved per client read.
    pub read_buffer_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            read_buffer_bytes: 8 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Time a client has to produce a routing decision.
    pub inspect_secs: u64,

    /// Backend connection establishment timeout.
    pub connect_secs: u64,

    /// Time allowed for live connections to drain on shutdown.
    pub shutdown_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            inspect_secs: 30,
            connect_secs: 5,
            shutdown_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
