//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → backends registered once, rules compiled once, at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend registry never changes after startup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackendConfig, LimitsConfig, ListenerConfig, ModeKind, ObservabilityConfig, ProcessingConfig,
    ProxyConfig, RuleConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
