//! Accept loop wiring the network runtime to the routing core.
//!
//! # Responsibilities
//! - Accept client connections under the listener's connection limit
//! - Build a routing context per connection from the shared registry and rules
//! - Serve each connection on its own task
//! - Stop accepting on shutdown and drain live connections

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::lifecycle::Prepared;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Accepted, Listener, ListenerError};
use crate::net::relay::{serve_connection, RelaySettings, Served};
use crate::routing::Connection;

/// The proxy's client-facing server.
#[derive(Debug)]
pub struct ProxyServer {
    prepared: Prepared,
    settings: Arc<RelaySettings>,
    max_header_bytes: usize,
    drain_timeout: Duration,
    tracker: ConnectionTracker,
}

impl ProxyServer {
    pub fn new(config: &ProxyConfig, prepared: Prepared) -> Self {
        Self {
            prepared,
            settings: Arc::new(RelaySettings::from(config)),
            max_header_bytes: config.limits.max_header_bytes,
            drain_timeout: Duration::from_secs(config.timeouts.shutdown_secs),
            tracker: ConnectionTracker::new(),
        }
    }

    /// Connection accounting, for shutdown and tests.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept and serve connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            max_connections = listener.max_connections(),
            "Proxy server starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => self.spawn_connection(accepted),
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        let active = self.tracker.active_count();
        if active > 0 {
            tracing::info!(active, timeout = ?self.drain_timeout, "Draining connections");
            if !self.tracker.drain(self.drain_timeout).await {
                tracing::warn!(
                    remaining = self.tracker.active_count(),
                    "Drain deadline passed; abandoning connections"
                );
            }
        }

        tracing::info!("Proxy server stopped");
        Ok(())
    }

    fn spawn_connection(&self, accepted: Accepted) {
        let Accepted {
            stream,
            peer_addr,
            permit,
        } = accepted;

        let guard = self.tracker.track();
        let mut conn = Connection::new(Arc::clone(&self.prepared.registry))
            .with_id(guard.id())
            .with_max_header_bytes(self.max_header_bytes);
        self.prepared.rules.install(&mut conn);

        let settings = Arc::clone(&self.settings);
        let span = tracing::info_span!("connection", connection_id = %guard.id(), peer_addr = %peer_addr);

        tokio::spawn(
            async move {
                let _permit = permit;
                let _guard = guard;
                match serve_connection(stream, conn, &settings).await {
                    Ok(Served::Closed) => tracing::debug!("Connection closed without a backend"),
                    Ok(Served::Relayed { to_backend, to_client }) => {
                        tracing::debug!(to_backend, to_client, "Connection relayed")
                    }
                    Err(e) => tracing::warn!(error = %e, "Connection ended with error"),
                }
            }
            .instrument(span),
        );
    }
}
