//! Operator hooks and the context they run in.

use std::fmt;

use crate::error::{HookError, RouterError};
use crate::inspect::HeaderMap;
use crate::routing::target::RoutingTarget;

/// Hook run for every raw client chunk.
pub type RawHook = Box<dyn FnMut(&mut HookContext<'_>, &[u8]) -> Result<(), HookError> + Send>;

/// Hook run once with the parsed header map.
pub type HeadersHook =
    Box<dyn FnMut(&mut HookContext<'_>, &HeaderMap) -> Result<(), HookError> + Send>;

/// Hook run once with the value of a single gating header.
pub type HeaderHook = Box<dyn FnMut(&mut HookContext<'_>, &str) -> Result<(), HookError> + Send>;

/// Error handler run at most once, with the failure and the target selected
/// when it happened.
pub type FallbackHook =
    Box<dyn FnOnce(&RouterError, Option<&RoutingTarget>) -> Result<(), HookError> + Send>;

/// How a connection inspects its traffic before routing.
///
/// Each variant carries the hook signature that fits it, so the mode and the
/// hook can never disagree.
pub enum ProcessingMode {
    /// Hook sees each chunk as it arrives.
    Raw(RawHook),
    /// Hook sees the complete header map.
    Headers(HeadersHook),
    /// Hook sees the value of `key`, and only runs when `key` is present.
    Header { key: String, hook: HeaderHook },
}

impl ProcessingMode {
    pub fn raw<F>(hook: F) -> Self
    where
        F: FnMut(&mut HookContext<'_>, &[u8]) -> Result<(), HookError> + Send + 'static,
    {
        ProcessingMode::Raw(Box::new(hook))
    }

    pub fn headers<F>(hook: F) -> Self
    where
        F: FnMut(&mut HookContext<'_>, &HeaderMap) -> Result<(), HookError> + Send + 'static,
    {
        ProcessingMode::Headers(Box::new(hook))
    }

    pub fn header<F>(key: impl Into<String>, hook: F) -> Self
    where
        F: FnMut(&mut HookContext<'_>, &str) -> Result<(), HookError> + Send + 'static,
    {
        ProcessingMode::Header {
            key: key.into(),
            hook: Box::new(hook),
        }
    }

    /// Whether this mode needs the header parser.
    pub fn parses_headers(&self) -> bool {
        !matches!(self, ProcessingMode::Raw(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProcessingMode::Raw(_) => "raw",
            ProcessingMode::Headers(_) => "headers",
            ProcessingMode::Header { .. } => "header",
        }
    }
}

impl fmt::Debug for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessingMode::Header { key, .. } => {
                f.debug_struct("Header").field("key", key).finish_non_exhaustive()
            }
            other => f.write_str(other.name()),
        }
    }
}

/// What a hook can do to its connection.
#[derive(Debug)]
pub struct HookContext<'a> {
    selected: &'a mut Option<RoutingTarget>,
    headers: Option<&'a HeaderMap>,
    close_requested: bool,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(selected: &'a mut Option<RoutingTarget>, headers: Option<&'a HeaderMap>) -> Self {
        Self {
            selected,
            headers,
            close_requested: false,
        }
    }

    /// Select the backend for this connection. Later calls replace earlier ones.
    pub fn route_to(&mut self, target: impl Into<RoutingTarget>) {
        let target = target.into();
        tracing::trace!(target = %target, "Route selected");
        *self.selected = Some(target);
    }

    /// Parse `target` (`name` or `host:port`) and select it.
    pub fn try_route_to(&mut self, target: &str) -> Result<(), RouterError> {
        let target: RoutingTarget = target.parse()?;
        self.route_to(target);
        Ok(())
    }

    /// Target selected so far, if any.
    pub fn selected_target(&self) -> Option<&RoutingTarget> {
        self.selected.as_ref()
    }

    /// Close the client connection once the hook returns, even if a route
    /// was selected.
    pub fn close_connection(&mut self) {
        self.close_requested = true;
    }

    /// Parsed headers, in the header-parsing modes.
    pub fn current_headers(&self) -> Option<&HeaderMap> {
        self.headers
    }

    pub(crate) fn close_requested(&self) -> bool {
        self.close_requested
    }
}
