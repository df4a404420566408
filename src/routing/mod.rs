//! Connection routing subsystem.
//!
//! # Data Flow
//! ```text
//! runtime delivers chunk
//!     → machine.rs (Connection::on_chunk)
//!     → inspect::HeaderParser (headers / header modes)
//!     → hooks.rs (operator hook with HookContext)
//!     → target.rs (resolve RoutingTarget against the registry)
//!     → Runtime::setup_backend + relay_forward, or Runtime::close_connection
//!
//! Any error along that path:
//!     → failsafe.rs (fallback once + close, or propagate)
//! ```
//!
//! # Design Decisions
//! - Every connection ends Relaying or Closed, never in between
//! - Processing mode is a tagged enum fixed before traffic
//! - The core is synchronous; waiting means returning to the runtime
//! - Last `route_to` before arming wins

pub mod failsafe;
pub mod hooks;
pub mod machine;
pub mod target;

pub use failsafe::Failsafe;
pub use hooks::{FallbackHook, HeaderHook, HeadersHook, HookContext, ProcessingMode, RawHook};
pub use machine::{Collecting, Connection, ConnectionState};
pub use target::RoutingTarget;
