//! Error boundary around hook invocation and backend arming.
//!
//! # Responsibilities
//! - Hold the connection's optional fallback hook
//! - On failure, run the fallback once and close the connection
//! - Without a fallback, hand the error back to the runtime
//!
//! # Design Decisions
//! - The fallback is consumed when it runs, so it can never run twice
//! - Errors raised by the fallback itself are returned unguarded, after the close

use crate::error::RouterError;
use crate::routing::hooks::FallbackHook;
use crate::routing::target::RoutingTarget;
use crate::runtime::Runtime;

#[derive(Default)]
pub struct Failsafe {
    fallback: Option<FallbackHook>,
}

impl Failsafe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the fallback, replacing any earlier one.
    pub fn set(&mut self, hook: FallbackHook) {
        self.fallback = Some(hook);
    }

    /// Whether a fallback is waiting to run.
    pub fn is_armed(&self) -> bool {
        self.fallback.is_some()
    }

    /// Contain a failure from the guarded region.
    ///
    /// Returns `Err(err)` unchanged when no fallback is installed. Otherwise
    /// runs the fallback, requests a close, and returns whatever the fallback
    /// returned.
    pub fn contain<R>(
        &mut self,
        err: RouterError,
        target: Option<&RoutingTarget>,
        runtime: &mut R,
    ) -> Result<(), RouterError>
    where
        R: Runtime + ?Sized,
    {
        let Some(fallback) = self.fallback.take() else {
            return Err(err);
        };

        tracing::debug!(
            error = %err,
            target = target.map(tracing::field::display),
            "Connection processing failed, running fallback"
        );
        let outcome = fallback(&err, target);
        runtime.close_connection();
        outcome.map_err(RouterError::from)
    }
}

impl std::fmt::Debug for Failsafe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Failsafe")
            .field("armed", &self.is_armed())
            .finish()
    }
}
