//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use programmable_proxy::config::ProxyConfig;
use programmable_proxy::lifecycle::{Prepared, Shutdown};
use programmable_proxy::net::listener::Listener;
use programmable_proxy::ProxyServer;

/// Start a backend that answers every request with `name` as the body.
pub async fn start_named_backend(name: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    name.len(),
                    name
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a backend that reads until EOF and reports everything it received.
pub async fn start_capturing_backend() -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut received = Vec::new();
                let _ = socket.read_to_end(&mut received).await;
                let _ = socket.write_all(b"captured").await;
                let _ = socket.shutdown().await;
                let _ = tx.send(received);
            });
        }
    });

    (addr, rx)
}

/// A proxy running on an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<()>,
}

/// Start the proxy for `config`, ignoring its bind address.
pub async fn start_proxy(config: ProxyConfig) -> RunningProxy {
    let prepared = Prepared::from_config(&config).expect("config should be valid");
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let listener = Listener::from_listener(tcp, config.listener.max_connections);
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = ProxyServer::new(&config, prepared);
    let handle = tokio::spawn(async move {
        server.run(listener, server_shutdown).await.unwrap();
    });

    RunningProxy {
        addr,
        shutdown,
        handle,
    }
}

/// Send `parts` with a short pause between each, then read until the proxy
/// or backend closes.
pub async fn exchange(addr: SocketAddr, parts: &[&[u8]]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    for part in parts {
        stream.write_all(part).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("proxy should answer or close")
        .unwrap_or_default();
    response
}
