//! Error taxonomy for the routing core.
//!
//! Every error raised while handling one chunk or one completed header block
//! ends up as a [`RouterError`] at the failsafe boundary, regardless of where
//! it originated (parser, operator hook, routing, or backend arming).

use thiserror::Error;

use crate::backend::BackendId;

/// Error type operator hooks may return.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the routing core.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Routing resolved to an identifier that was never registered.
    #[error("unknown backend: {0}")]
    UnknownBackend(BackendId),

    /// The header block grew past the configured cap before completing.
    #[error("header block exceeds {limit} bytes")]
    HeaderTooLarge { limit: usize },

    /// An operator-supplied hook failed.
    #[error("hook failed: {0}")]
    Hook(#[source] HookError),

    /// A routing target is neither a backend identifier nor a `host:port` pair.
    #[error("malformed routing target: {0:?}")]
    MalformedTarget(String),

    /// A chunk arrived before a processing mode was configured.
    #[error("no processing mode configured for connection")]
    NotConfigured,
}

impl RouterError {
    /// Wrap an arbitrary hook failure.
    pub fn hook(err: impl Into<HookError>) -> Self {
        RouterError::Hook(err.into())
    }
}

/// Core errors that travelled through a hook via `?` come back out unwrapped.
impl From<HookError> for RouterError {
    fn from(err: HookError) -> Self {
        match err.downcast::<RouterError>() {
            Ok(inner) => *inner,
            Err(other) => RouterError::Hook(other),
        }
    }
}
