//! WebSocket live-reload server.
//!
//! Browser-side clients connect and wait; after each build the server
//! broadcasts one reload frame to every open connection. Client-to-server
//! traffic carries no meaning beyond connection lifecycle.
//!
//! ## Protocol
//!
//! ```json
//! {"action": "reload", "changedFiles": ["popup.js"]}
//! ```

mod registry;


use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::ReloadError;
use crate::protocol::ReloadNotification;
use crate::tracker::ChangeSet;

pub use registry::ConnectionState;
use registry::ConnectionRegistry;

/// Default port for the reload server.
pub const DEFAULT_PORT: u16 = 35729;

/// Default host for the reload server.
pub const DEFAULT_HOST: &str = "localhost";

/// Owns the listener for one watch session. Starting twice is a no-op.
#[derive(Debug, Default)]
pub struct ReloadServer {
    handle: Option<ReloadHandle>,
}

impl ReloadServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `host:port` and spawns the accept loop.
    ///
    /// Returns the existing handle if the server is already running.
    pub async fn start(&mut self, host: &str, port: u16) -> Result<ReloadHandle, ReloadError> {
        if let Some(handle) = &self.handle {
            debug!("reload server already running on {}", handle.local_addr());
            return Ok(handle.clone());
        }

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| ReloadError::Bind {
                addr: format!("{}:{}", host, port),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ReloadError::Bind {
            addr: format!("{}:{}", host, port),
            source,
        })?;

        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let handle = ReloadHandle {
            shared: Arc::new(Shared {
                local_addr,
                registry: ConnectionRegistry::default(),
                shutdown: shutdown_tx,
            }),
        };

        info!("reload server listening on ws://{}", local_addr);
        tokio::spawn(accept_loop(listener, handle.clone()));

        self.handle = Some(handle.clone());
        Ok(handle)
    }

    pub fn handle(&self) -> Option<&ReloadHandle> {
        self.handle.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

#[derive(Debug)]
struct Shared {
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
    shutdown: broadcast::Sender<()>,
}

/// Cloneable handle to a running reload server.
#[derive(Debug, Clone)]
pub struct ReloadHandle {
    shared: Arc<Shared>,
}

impl ReloadHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.shared.local_addr
    }

    /// Number of connections currently open.
    pub fn connection_count(&self) -> usize {
        self.shared.registry.open_count()
    }

    /// Sends `notification` to every open connection. Returns the number of
    /// connections it was queued on.
    pub fn broadcast(&self, notification: &ReloadNotification) -> usize {
        match notification.to_json() {
            Ok(text) => self.shared.registry.broadcast(&text),
            Err(e) => {
                warn!("could not encode reload notification: {}", e);
                0
            }
        }
    }

    /// Broadcasts a reload for `changes`.
    pub fn notify(&self, changes: ChangeSet) -> usize {
        info!("reloading extension ({} changed files)", changes.len());
        let delivered = self.broadcast(&ReloadNotification::new(changes));
        debug!("reload sent to {} clients", delivered);
        delivered
    }

    /// Stops accepting and closes every connection.
    pub fn shutdown(&self) {
        let _ = self.shared.shutdown.send(());
    }
}

async fn accept_loop(listener: TcpListener, handle: ReloadHandle) {
    let mut shutdown_rx = handle.shared.shutdown.subscribe();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        debug!("new connection from {}", peer_addr);
                        tokio::spawn(handle_connection(stream, peer_addr, handle.clone()));
                    }
                    Err(e) => {
                        warn!("accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("reload server shut down");
                break;
            }
        }
    }
}

/// Handle a single client connection.
async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, handle: ReloadHandle) {
    let mut shutdown_rx = handle.shared.shutdown.subscribe();

    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", peer_addr, e);
            return;
        }
    };

    let (mut write, mut read) = ws_stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let registry = &handle.shared.registry;
    let id = registry.register(peer_addr, outbound_tx);

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => {
                let Some(msg) = outgoing else { break };
                if let Err(e) = write.send(msg).await {
                    warn!("send error for {}: {}", peer_addr, e);
                    break;
                }
            }
            msg_opt = read.next() => {
                match msg_opt {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(msg)) => {
                        debug!("ignoring client frame from {}: {:?}", peer_addr, msg);
                    }
                    Some(Err(e)) => {
                        debug!("receive error for {}: {}", peer_addr, e);
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                registry.mark_closing(id);
                let _ = write.send(Message::Close(None)).await;
                break;
            }
        }
    }

    registry.mark_closing(id);
    registry.remove(id);
    debug!("connection closed: {}", peer_addr);
}
