//! Network runtime subsystem.
//!
//! The routing core is runtime-agnostic; this module is the Tokio runtime
//! that feeds it and carries out its commands.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → connection.rs (ID, accounting for shutdown)
//!     → server.rs (per-connection task, routing context from shared rules)
//!     → relay.rs (chunks → routing core → connect / replay / close → relay)
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Commands from the core run in the order they were issued

pub mod connection;
pub mod listener;
pub mod relay;
pub mod server;

pub use server::ProxyServer;
