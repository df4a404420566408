//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (connection_id, backend, target)
//!     → logging.rs installs the subscriber that formats them
//! ```
//!
//! # Design Decisions
//! - Structured fields over formatted strings
//! - Connection ID flows through every event of a connection via a span
//! - `RUST_LOG` overrides the configured level

pub mod logging;

pub use logging::init_logging;
