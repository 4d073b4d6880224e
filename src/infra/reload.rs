//! Live-reload WebSocket server
//!
//! Development clients connect over WebSocket and receive the reload token
//! after each successful rebuild. Clients are subscribed to the broadcast only
//! once their handshake has completed, so a reload never reaches a half-open
//! connection.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::config::defaults;
use crate::error::DevError;

/// Time clients get to receive their close frame on shutdown
const CLIENT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pending messages per client before it starts lagging
const BROADCAST_CAPACITY: usize = 16;

/// Running live-reload server
#[derive(Debug)]
pub struct LiveReloadServer {
    local_addr: SocketAddr,
    reloads: broadcast::Sender<String>,
    shutdown: CancellationToken,
    accept_task: Option<JoinHandle<()>>,
}

impl LiveReloadServer {
    /// Bind `host:port` and start accepting clients
    ///
    /// Port 0 picks a free port; see [`LiveReloadServer::local_addr`].
    ///
    /// # Errors
    ///
    /// Returns `DevError::Bind` if the address cannot be bound.
    pub async fn bind(host: &str, port: u16) -> Result<Self, DevError> {
        let address = format!("{host}:{port}");
        let bind_error = |e: std::io::Error| DevError::Bind {
            address: address.clone(),
            error: e.to_string(),
        };

        let listener = TcpListener::bind((host, port)).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let (reloads, _) = broadcast::channel(BROADCAST_CAPACITY);
        let shutdown = CancellationToken::new();
        let accept_task = tokio::spawn(accept_loop(listener, reloads.clone(), shutdown.clone()));

        tracing::info!("Live reload server listening on ws://{local_addr}");
        Ok(Self {
            local_addr,
            reloads,
            shutdown,
            accept_task: Some(accept_task),
        })
    }

    /// Bound address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Clients that completed their handshake and are still connected
    pub fn connected_clients(&self) -> usize {
        self.reloads.receiver_count()
    }

    /// Send the reload token to every connected client
    ///
    /// Returns the number of clients the message was queued for.
    pub fn broadcast_reload(&self) -> usize {
        let delivered = self
            .reloads
            .send(defaults::RELOAD_TOKEN.to_string())
            .unwrap_or(0);
        tracing::debug!("Reload sent to {delivered} client(s)");
        delivered
    }

    /// Stop accepting clients and close every connection
    ///
    /// # Errors
    ///
    /// Returns `DevError::Server` if the accept task panicked.
    pub async fn close(&mut self) -> Result<(), DevError> {
        self.shutdown.cancel();
        let Some(task) = self.accept_task.take() else {
            return Ok(());
        };
        task.await.map_err(|e| DevError::Server {
            error: e.to_string(),
        })?;
        tracing::debug!("Live reload server on {} closed", self.local_addr);
        Ok(())
    }
}

impl Drop for LiveReloadServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop(
    listener: TcpListener,
    reloads: broadcast::Sender<String>,
    shutdown: CancellationToken,
) {
    let mut clients = JoinSet::new();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!("Live reload connection from {peer}");
                    clients.spawn(serve_client(stream, reloads.clone(), shutdown.clone()));
                }
                Err(e) => tracing::warn!("Failed to accept live reload connection: {e}"),
            },
            Some(finished) = clients.join_next(), if !clients.is_empty() => {
                if let Err(e) = finished {
                    tracing::warn!("Live reload client task failed: {e}");
                }
            }
        }
    }

    drop(listener);
    let drained = tokio::time::timeout(CLIENT_CLOSE_TIMEOUT, async {
        while clients.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::debug!("Aborting {} unresponsive live reload client(s)", clients.len());
        clients.abort_all();
    }
}

async fn serve_client(
    stream: TcpStream,
    reloads: broadcast::Sender<String>,
    shutdown: CancellationToken,
) {
    let mut socket = tokio::select! {
        () = shutdown.cancelled() => return,
        handshake = tokio_tungstenite::accept_async(stream) => match handshake {
            Ok(socket) => socket,
            Err(e) => {
                tracing::debug!("Live reload handshake failed: {e}");
                return;
            }
        },
    };

    let mut receiver = reloads.subscribe();
    drop(reloads);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => {
                if let Err(e) = socket.close(None).await {
                    tracing::debug!("Failed to close live reload client: {e}");
                }
                break;
            }
            message = receiver.recv() => match message {
                Ok(token) => {
                    if let Err(e) = socket.send(Message::text(token)).await {
                        tracing::debug!("Live reload client went away: {e}");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Live reload client lagged by {skipped} message(s)");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("Live reload client error: {e}");
                    break;
                }
            },
        }
    }
}
