//! Programmable HTTP-inspecting TCP proxy.
//!
//! Loads a TOML config, registers its backends, compiles its routing rules,
//! and serves until SIGINT/SIGTERM.

use std::path::PathBuf;

use clap::Parser;

use programmable_proxy::config::{load_config, ProxyConfig};
use programmable_proxy::lifecycle::{signals, Prepared, Shutdown};
use programmable_proxy::net::listener::Listener;
use programmable_proxy::observability::init_logging;
use programmable_proxy::ProxyServer;

#[derive(Parser)]
#[command(name = "programmable-proxy")]
#[command(about = "TCP proxy that routes connections by inspecting HTTP headers", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, overriding the config (RUST_LOG still wins).
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    init_logging(level);

    tracing::info!(
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        mode = ?config.processing.mode,
        "programmable-proxy v0.1.0 starting"
    );

    let prepared = Prepared::from_config(&config)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_handler(shutdown);

    ProxyServer::new(&config, prepared)
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
