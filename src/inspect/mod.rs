//! Request inspection subsystem.
//!
//! # Data Flow
//! ```text
//! client chunk
//!     → parser.rs (append, resumable terminator scan)
//!     → incomplete: wait for the next chunk
//!     → complete: HeaderBlock { start_line, headers, raw_bytes }
//! ```
//!
//! # Design Decisions
//! - One parser per connection, discarded after the first completed block
//! - Raw bytes are kept verbatim so they can be replayed to the backend
//! - Header keys are lower-cased on insert and on lookup
//! - Accumulation is capped; oversized blocks fail with `HeaderTooLarge`

pub mod parser;

pub use parser::{HeaderBlock, HeaderMap, HeaderParser, DEFAULT_MAX_HEADER_BYTES};
