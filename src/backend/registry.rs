//! Named backend table.
//!
//! # Responsibilities
//! - Map backend identifiers to connection options
//! - Resolve identifiers at arming time, failing on unknown names

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::BackendConfig;
use crate::error::RouterError;

/// Identifier of a registered backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(String);

impl BackendId {
    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BackendId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BackendId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the runtime relays bytes once the backend is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Plain buffered relay.
    #[default]
    Standard,
    /// Latency-oriented relay (no Nagle coalescing on either socket).
    Fast,
}

/// Connection options for a backend, named or anonymous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOptions {
    pub host: String,
    pub port: u16,
    pub relay_mode: RelayMode,
}

impl BackendOptions {
    /// Options with the default relay mode.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            relay_mode: RelayMode::Standard,
        }
    }

    /// Set the relay mode.
    pub fn with_relay_mode(mut self, relay_mode: RelayMode) -> Self {
        self.relay_mode = relay_mode;
        self
    }

    /// `host:port` form, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// A registered backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSpec {
    pub id: BackendId,
    pub options: BackendOptions,
}

/// Table of named backends shared by every connection.
///
/// Populate it during startup, then wrap it in an `Arc` and hand clones to
/// connections. Lookups never fall back to a default entry.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendId, BackendSpec>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the `[[backends]]` config section.
    pub fn from_config(backends: &[BackendConfig]) -> Self {
        let mut registry = Self::new();
        for backend in backends {
            registry.register(
                backend.name.as_str(),
                BackendOptions::new(backend.host.clone(), backend.port)
                    .with_relay_mode(backend.relay_mode),
            );
        }
        registry
    }

    /// Insert a backend, replacing any previous entry with the same id.
    pub fn register(&mut self, id: impl Into<BackendId>, options: BackendOptions) {
        let id = id.into();
        tracing::debug!(backend = %id, address = %options.address(), relay_mode = ?options.relay_mode, "Backend registered");
        self.backends.insert(id.clone(), BackendSpec { id, options });
    }

    /// Resolve a backend by id.
    pub fn lookup(&self, id: &BackendId) -> Result<&BackendSpec, RouterError> {
        self.backends
            .get(id)
            .ok_or_else(|| RouterError::UnknownBackend(id.clone()))
    }

    /// Whether an id has been registered.
    pub fn contains(&self, id: &BackendId) -> bool {
        self.backends.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }
}
