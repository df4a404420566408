//! Per-connection processing state machine.
//!
//! # States
//! - Idle: nothing received yet
//! - Collecting: chunks are being inspected (raw) or parsed (headers)
//! - Routed: a target was chosen and is being armed
//! - Relaying: handed to the runtime's relay; the core is done
//! - Closed: the connection was (or must be) torn down
//!
//! # State Transitions
//! ```text
//! Idle → Collecting: first chunk
//! Collecting → Collecting: header block still incomplete
//! Collecting → Routed → Relaying: hook selected a target and arming succeeded
//! Collecting → Closed: no target, explicit close, gating header absent, or error
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::backend::BackendRegistry;
use crate::error::{HookError, RouterError};
use crate::inspect::{HeaderBlock, HeaderParser, DEFAULT_MAX_HEADER_BYTES};
use crate::net::connection::ConnectionId;
use crate::routing::failsafe::Failsafe;
use crate::routing::hooks::{HookContext, ProcessingMode};
use crate::routing::target::RoutingTarget;
use crate::runtime::Runtime;

/// What the connection is collecting while it waits for a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collecting {
    Raw,
    Headers,
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Collecting(Collecting),
    Routed,
    Relaying,
    Closed,
}

impl ConnectionState {
    /// Relaying and Closed receive no further chunks.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Relaying | ConnectionState::Closed)
    }
}

/// Outcome of inspecting one chunk, before anything is asked of the runtime.
#[derive(Debug)]
enum Decision {
    /// Header block still incomplete.
    Pending,
    /// Hook asked for the connection to be closed.
    CloseRequested,
    /// Gating header absent; the hook did not run.
    GateClosed,
    /// Hook ran but picked no target.
    Unrouted,
    /// Arm `target` and forward `payload` to it.
    Arm { target: RoutingTarget, payload: Bytes },
}

/// Routing context for one client connection.
///
/// Configure it with [`on_process`](Self::on_process) (and optionally
/// [`on_fallback`](Self::on_fallback)) before traffic, then hand every client
/// chunk to [`on_chunk`](Self::on_chunk) in arrival order.
#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    registry: Arc<BackendRegistry>,
    mode: Option<ProcessingMode>,
    parser: Option<HeaderParser>,
    selected: Option<RoutingTarget>,
    failsafe: Failsafe,
    state: ConnectionState,
    max_header_bytes: usize,
}

impl Connection {
    /// Create a connection context sharing `registry`.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self {
            id: ConnectionId::new(),
            registry,
            mode: None,
            parser: None,
            selected: None,
            failsafe: Failsafe::new(),
            state: ConnectionState::Idle,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }

    /// Use an id allocated elsewhere (e.g. by the connection tracker).
    pub fn with_id(mut self, id: ConnectionId) -> Self {
        self.id = id;
        self
    }

    /// Cap the header block size for the parsing modes.
    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    /// Install the error fallback, replacing any earlier one.
    pub fn on_fallback<F>(&mut self, hook: F)
    where
        F: FnOnce(&RouterError, Option<&RoutingTarget>) -> Result<(), HookError> + Send + 'static,
    {
        self.failsafe.set(Box::new(hook));
    }

    /// Set the processing mode. Ignored once traffic has started.
    pub fn on_process(&mut self, mode: ProcessingMode) {
        if self.state != ConnectionState::Idle {
            tracing::warn!(connection_id = %self.id, state = ?self.state, mode = mode.name(), "Processing mode changed after traffic started; ignoring");
            return;
        }
        tracing::trace!(connection_id = %self.id, mode = mode.name(), "Processing mode set");
        self.parser = None;
        self.mode = Some(mode);
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn selected_target(&self) -> Option<&RoutingTarget> {
        self.selected.as_ref()
    }

    /// Handle one chunk of client bytes.
    ///
    /// Inspection, the hook, and arming all run inside the failsafe boundary.
    /// An error comes back only when no fallback is installed (or the fallback
    /// itself failed); the connection is `Closed` either way.
    pub fn on_chunk<R>(&mut self, chunk: &[u8], runtime: &mut R) -> Result<ConnectionState, RouterError>
    where
        R: Runtime + ?Sized,
    {
        if self.state.is_terminal() {
            tracing::trace!(connection_id = %self.id, state = ?self.state, len = chunk.len(), "Chunk after terminal state ignored");
            return Ok(self.state);
        }

        let outcome = self
            .inspect(chunk)
            .and_then(|decision| self.apply(decision, runtime));

        if let Err(err) = outcome {
            self.state = ConnectionState::Closed;
            self.failsafe
                .contain(err, self.selected.as_ref(), runtime)?;
        }
        Ok(self.state)
    }

    /// The client finished sending. Closes the connection unless it is
    /// already relaying or closed.
    pub fn on_eof<R>(&mut self, runtime: &mut R)
    where
        R: Runtime + ?Sized,
    {
        if self.state.is_terminal() {
            return;
        }
        tracing::debug!(connection_id = %self.id, state = ?self.state, "Client closed before routing");
        self.close(runtime);
    }

    /// Run the configured hook against `chunk`.
    fn inspect(&mut self, chunk: &[u8]) -> Result<Decision, RouterError> {
        let max_header_bytes = self.max_header_bytes;
        let Some(mode) = self.mode.as_mut() else {
            return Err(RouterError::NotConfigured);
        };

        let (payload, close_requested) = match mode {
            ProcessingMode::Raw(hook) => {
                self.state = ConnectionState::Collecting(Collecting::Raw);
                let mut ctx = HookContext::new(&mut self.selected, None);
                hook(&mut ctx, chunk)?;
                (Bytes::copy_from_slice(chunk), ctx.close_requested())
            }
            ProcessingMode::Headers(hook) => {
                self.state = ConnectionState::Collecting(Collecting::Headers);
                let Some(block) = feed(&mut self.parser, max_header_bytes, chunk)? else {
                    return Ok(Decision::Pending);
                };
                let mut ctx = HookContext::new(&mut self.selected, Some(&block.headers));
                hook(&mut ctx, &block.headers)?;
                let close_requested = ctx.close_requested();
                (block.raw_bytes, close_requested)
            }
            ProcessingMode::Header { key, hook } => {
                self.state = ConnectionState::Collecting(Collecting::Headers);
                let Some(block) = feed(&mut self.parser, max_header_bytes, chunk)? else {
                    return Ok(Decision::Pending);
                };
                let Some(value) = block.headers.get(key) else {
                    tracing::debug!(connection_id = %self.id, header = %key, "Gating header absent");
                    return Ok(Decision::GateClosed);
                };
                let mut ctx = HookContext::new(&mut self.selected, Some(&block.headers));
                hook(&mut ctx, value)?;
                let close_requested = ctx.close_requested();
                (block.raw_bytes, close_requested)
            }
        };

        if close_requested {
            return Ok(Decision::CloseRequested);
        }
        Ok(match &self.selected {
            Some(target) => Decision::Arm {
                target: target.clone(),
                payload,
            },
            None => Decision::Unrouted,
        })
    }

    /// Carry out a decision against the runtime.
    fn apply<R>(&mut self, decision: Decision, runtime: &mut R) -> Result<(), RouterError>
    where
        R: Runtime + ?Sized,
    {
        match decision {
            Decision::Pending => Ok(()),
            Decision::CloseRequested | Decision::GateClosed | Decision::Unrouted => {
                tracing::debug!(connection_id = %self.id, reason = ?decision, "Closing without a backend");
                self.close(runtime);
                Ok(())
            }
            Decision::Arm { target, payload } => {
                self.state = ConnectionState::Routed;
                let (name, options) = target.resolve(&self.registry)?;
                tracing::debug!(
                    connection_id = %self.id,
                    target = %target,
                    address = %options.address(),
                    relay_mode = ?options.relay_mode,
                    replay_bytes = payload.len(),
                    "Backend armed"
                );
                runtime.setup_backend(name.as_ref(), &options);
                runtime.relay_forward(payload);
                self.state = ConnectionState::Relaying;
                Ok(())
            }
        }
    }

    fn close<R>(&mut self, runtime: &mut R)
    where
        R: Runtime + ?Sized,
    {
        self.state = ConnectionState::Closed;
        self.parser = None;
        runtime.close_connection();
    }
}

/// Feed the connection's parser, dropping it once it has produced its block.
fn feed(
    parser: &mut Option<HeaderParser>,
    max_header_bytes: usize,
    chunk: &[u8],
) -> Result<Option<HeaderBlock>, RouterError> {
    let block = parser
        .get_or_insert_with(|| HeaderParser::new(max_header_bytes))
        .feed(chunk)?;
    if block.is_some() {
        *parser = None;
    }
    Ok(block)
}
