//! Config-driven routing rules.
//!
//! # Data Flow
//! ```text
//! Rule Compilation (at startup):
//!     ProcessingConfig
//!     → parse targets (name or host:port)
//!     → compile matchers (prefix / header / value)
//!     → freeze as immutable Arc<RuleSet>
//!
//! Per connection:
//!     RuleSet::install
//!     → ProcessingMode hook for the configured mode + logging fallback
//!     → hook evaluates matchers in order, routes to the first hit
//!     → no hit: default target, else no route (connection closes)
//! ```
//!
//! # Design Decisions
//! - Rules compiled at startup, immutable at runtime
//! - No regex (prefix and exact comparisons only)
//! - Deterministic: same input always matches same rule
//! - First match wins (config order)

pub mod matcher;
pub mod router;

pub use matcher::{HeaderMatcher, Inspection, Matcher, PrefixMatcher, ValueMatcher};
pub use router::RuleSet;
