//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated config into the shared routing state
//! - Register every backend before any connection can see the registry
//! - Compile the routing rules
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use std::sync::Arc;

use thiserror::Error;

use crate::backend::BackendRegistry;
use crate::config::{validate_config, ProxyConfig, ValidationError};
use crate::error::RouterError;
use crate::rules::RuleSet;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Config(Vec<ValidationError>),

    #[error("routing rules rejected: {0}")]
    Rules(#[from] RouterError),
}

/// Shared state every connection is built from.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub registry: Arc<BackendRegistry>,
    pub rules: Arc<RuleSet>,
}

impl Prepared {
    /// Validate `config` and build the registry and rule set.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, StartupError> {
        validate_config(config).map_err(StartupError::Config)?;

        let registry = BackendRegistry::from_config(&config.backends);
        if registry.is_empty() {
            tracing::warn!("No backends registered; only inline targets can be routed");
        }
        let rules = RuleSet::from_config(&config.processing)?;

        tracing::info!(backends = registry.len(), rules = rules.len(), "Routing state prepared");
        Ok(Self {
            registry: Arc::new(registry),
            rules: Arc::new(rules),
        })
    }
}
