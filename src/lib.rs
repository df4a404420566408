//! Programmable routing layer for a TCP-level HTTP proxy.
//!
//! Operators register named backends, then give each connection a
//! processing mode whose hook inspects raw bytes, the parsed header map, or a
//! single header value and picks a backend. The routing core turns client
//! chunks into that decision and then arms the relay, or closes.
//!
//! ```text
//!  client ──chunks──▶ routing::Connection ──▶ inspect::HeaderParser
//!                           │                        │
//!                           ▼                        ▼
//!                     operator hook ◀──── HeaderBlock / raw chunk
//!                           │
//!                           ▼
//!              backend::BackendRegistry (named targets)
//!                           │
//!                           ▼
//!          runtime::Runtime ── setup_backend / relay_forward / close
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod inspect;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod rules;
pub mod runtime;

pub use backend::{BackendId, BackendOptions, BackendRegistry, RelayMode};
pub use config::ProxyConfig;
pub use error::{HookError, RouterError};
pub use lifecycle::Shutdown;
pub use net::ProxyServer;
pub use routing::{Connection, ConnectionState, HookContext, ProcessingMode, RoutingTarget};
pub use runtime::{Command, CommandQueue, Runtime};
