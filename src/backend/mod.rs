//! Backend registry subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     config [[backends]] / operator code
//!     → BackendRegistry::register (exclusive &mut access)
//!     → frozen into Arc<BackendRegistry>
//!
//! Per connection:
//!     RoutingTarget::Named(id)
//!     → BackendRegistry::lookup (shared, read-only)
//!     → BackendSpec handed to the runtime for arming
//! ```
//!
//! # Design Decisions
//! - Registry is an explicit value injected into every connection, never a global
//! - Writes need `&mut`, so nothing can register once the registry is shared
//! - Unknown identifiers fail loudly; there is no default backend

pub mod registry;

pub use registry::{BackendId, BackendOptions, BackendRegistry, BackendSpec, RelayMode};
