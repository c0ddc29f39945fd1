use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::debug;

use crate::error::TransportError;
use crate::transport::Transport;

type Registry = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<Vec<u8>>>>>;

/// A shared loopback medium connecting any number of [`InMemoryTransport`]s
/// in the same process. Used by integration tests to exercise the session
/// engine and role layers without real sockets.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBus {
    registry: Registry,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport for `node_id` attached to this bus.
    pub fn transport(&self, node_id: impl Into<String>) -> InMemoryTransport {
        let node_id = node_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.lock().unwrap().insert(node_id.clone(), tx);
        InMemoryTransport {
            node_id,
            registry: self.registry.clone(),
            inbox: AsyncMutex::new(rx),
        }
    }
}

/// One node's attachment point to an [`InMemoryBus`]. `send` fans a frame
/// out to every other attached transport; self is always excluded, which is
/// this transport's entire deduplication story (there is exactly one copy
/// of the medium, so nothing else needs deduplicating).
///
/// `inbox` uses a [`tokio::sync::Mutex`] rather than `std::sync::Mutex`: the
/// lock is held across the `.await` in `recv_timeout`, and a std guard held
/// across an await point would make the returned future non-`Send`.
pub struct InMemoryTransport {
    node_id: String,
    registry: Registry,
    inbox: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl Transport for InMemoryTransport {
    async fn start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.registry.lock().unwrap().remove(&self.node_id);
        Ok(())
    }

    async fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        let mut inbox = self.inbox.lock().await;
        tokio::time::timeout(timeout, inbox.recv()).await.ok().flatten()
    }

    async fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let registry = self.registry.lock().unwrap();
        for (peer_id, tx) in registry.iter() {
            if *peer_id == self.node_id {
                continue;
            }
            if tx.send(bytes.clone()).is_err() {
                debug!(peer_id, "in-memory peer dropped its receiver");
            }
        }
        Ok(())
    }
}
