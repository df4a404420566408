//! Tokio driver for one client connection.
//!
//! # Responsibilities
//! - Read client chunks and hand them to the routing core in order
//! - Execute the core's commands: connect, replay buffered bytes, close
//! - Relay bytes in both directions once a backend is armed
//!
//! # Design Decisions
//! - The routing decision must arrive within `inspect_timeout`
//! - Backend connects are bounded by `connect_timeout`
//! - Fast relay mode disables Nagle on both sockets

use std::io;
use std::time::Duration;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use crate::backend::{BackendOptions, RelayMode};
use crate::config::ProxyConfig;
use crate::error::RouterError;
use crate::routing::{Connection, ConnectionState};
use crate::runtime::{Command, CommandQueue};

/// Errors ending a served connection.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("client I/O error: {0}")]
    Client(#[source] io::Error),

    #[error("no routing decision within {0:?}")]
    InspectTimeout(Duration),

    #[error("backend {address} unreachable: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("backend {address} did not accept within {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error("backend armed twice")]
    AlreadyArmed,

    #[error("connection relaying without an armed backend")]
    NotArmed,

    #[error(transparent)]
    Routing(#[from] RouterError),

    #[error("relay I/O error: {0}")]
    Relay(#[source] io::Error),
}

/// Tunables for the connection driver.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub read_buffer_bytes: usize,
    pub inspect_timeout: Duration,
    pub connect_timeout: Duration,
}

impl From<&ProxyConfig> for RelaySettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            read_buffer_bytes: config.limits.read_buffer_bytes,
            inspect_timeout: Duration::from_secs(config.timeouts.inspect_secs),
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from(&ProxyConfig::default())
    }
}

/// How a served connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Served {
    /// Closed without reaching a backend.
    Closed,
    /// Relayed until either side hung up.
    Relayed { to_backend: u64, to_client: u64 },
}

/// Serve a client connection through the routing core.
pub async fn serve_connection(
    mut client: TcpStream,
    mut conn: Connection,
    settings: &RelaySettings,
) -> Result<Served, RelayError> {
    let deadline = Instant::now() + settings.inspect_timeout;
    let mut buf = BytesMut::with_capacity(settings.read_buffer_bytes);
    let mut commands = CommandQueue::new();
    let mut backend: Option<(TcpStream, RelayMode)> = None;

    loop {
        buf.reserve(settings.read_buffer_bytes);
        let read = tokio::time::timeout_at(deadline, client.read_buf(&mut buf))
            .await
            .map_err(|_| RelayError::InspectTimeout(settings.inspect_timeout))?
            .map_err(RelayError::Client)?;

        let outcome = if read == 0 {
            conn.on_eof(&mut commands);
            Ok(conn.state())
        } else {
            let chunk = buf.split().freeze();
            conn.on_chunk(&chunk, &mut commands)
        };

        let close_requested = execute(&mut commands, &mut backend, settings).await?;
        let state = outcome?;

        if close_requested || state == ConnectionState::Closed {
            let _ = client.shutdown().await;
            return Ok(Served::Closed);
        }

        if state == ConnectionState::Relaying {
            let Some((mut upstream, mode)) = backend.take() else {
                return Err(RelayError::NotArmed);
            };
            let (to_backend, to_client) = relay(&mut client, &mut upstream, mode)
                .await
                .map_err(RelayError::Relay)?;
            tracing::debug!(to_backend, to_client, "Relay finished");
            return Ok(Served::Relayed {
                to_backend,
                to_client,
            });
        }
    }
}

/// Run queued commands in order. Returns whether a close was requested.
async fn execute(
    commands: &mut CommandQueue,
    backend: &mut Option<(TcpStream, RelayMode)>,
    settings: &RelaySettings,
) -> Result<bool, RelayError> {
    let mut close_requested = false;
    for command in commands.drain() {
        match command {
            Command::SetupBackend { name, options } => {
                if backend.is_some() {
                    return Err(RelayError::AlreadyArmed);
                }
                tracing::debug!(
                    backend = name.as_ref().map(tracing::field::display),
                    address = %options.address(),
                    "Connecting to backend"
                );
                let stream = connect(&options, settings.connect_timeout).await?;
                *backend = Some((stream, options.relay_mode));
            }
            Command::Forward(bytes) => {
                let Some((upstream, _)) = backend.as_mut() else {
                    tracing::warn!(len = bytes.len(), "Forward requested before a backend was armed");
                    continue;
                };
                upstream.write_all(&bytes).await.map_err(RelayError::Relay)?;
            }
            Command::Close => close_requested = true,
        }
    }
    Ok(close_requested)
}

async fn connect(options: &BackendOptions, timeout: Duration) -> Result<TcpStream, RelayError> {
    let address = options.address();
    match tokio::time::timeout(timeout, TcpStream::connect((options.host.as_str(), options.port))).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(RelayError::Connect { address, source }),
        Err(_) => Err(RelayError::ConnectTimeout { address, timeout }),
    }
}

async fn relay(client: &mut TcpStream, upstream: &mut TcpStream, mode: RelayMode) -> io::Result<(u64, u64)> {
    if mode == RelayMode::Fast {
        client.set_nodelay(true)?;
        upstream.set_nodelay(true)?;
    }
    tokio::io::copy_bidirectional(client, upstream).await
}
