//! Registry of live client connections.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Lifecycle of a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closing,
}

#[derive(Debug)]
struct Connection {
    peer: SocketAddr,
    state: ConnectionState,
    outbound: mpsc::UnboundedSender<Message>,
}

/// Connections keyed by id. Each connection owns an outbound queue drained
/// by its task; broadcasting only enqueues.
#[derive(Debug, Default)]
pub(crate) struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<HashMap<u64, Connection>>,
}

impl ConnectionRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<u64, Connection>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn register(
        &self,
        peer: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(
            id,
            Connection {
                peer,
                state: ConnectionState::Open,
                outbound,
            },
        );
        id
    }

    pub(crate) fn mark_closing(&self, id: u64) {
        if let Some(conn) = self.lock().get_mut(&id) {
            conn.state = ConnectionState::Closing;
        }
    }

    pub(crate) fn remove(&self, id: u64) {
        self.lock().remove(&id);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.lock()
            .values()
            .filter(|c| c.state == ConnectionState::Open)
            .count()
    }

    /// Queues `text` on every open connection and returns how many accepted it.
    pub(crate) fn broadcast(&self, text: &str) -> usize {
        let connections = self.lock();
        let mut delivered = 0;
        for conn in connections.values() {
            if conn.state != ConnectionState::Open {
                continue;
            }
            if conn.outbound.send(Message::Text(text.to_string())).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(peer = %conn.peer, "skipping connection with closed queue");
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40000))
    }

    #[test]
    fn test_broadcast_skips_closing() {
        let registry = ConnectionRegistry::default();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(peer(), tx_a);
        let b = registry.register(peer(), tx_b);
        assert_ne!(a, b);

        registry.mark_closing(b);
        assert_eq!(registry.open_count(), 1);
        assert_eq!(registry.broadcast("hi"), 1);

        assert_eq!(rx_a.try_recv().unwrap(), Message::Text("hi".to_string()));
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_skips_dropped_receiver() {
        let registry = ConnectionRegistry::default();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.register(peer(), tx);
        drop(rx);
        assert_eq!(registry.broadcast("hi"), 0);
    }

    #[test]
    fn test_remove() {
        let registry = ConnectionRegistry::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(peer(), tx);
        registry.remove(id);
        assert_eq!(registry.open_count(), 0);
        assert_eq!(registry.broadcast("hi"), 0);
    }
}
