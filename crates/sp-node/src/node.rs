use std::sync::Arc;

use sp_ledger::Ledger;
use sp_peer::PeerTable;
use sp_session::{Engine, RoleHandler};
use sp_transport::Transport;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;

/// Everything a running node needs: the session engine (handshake/heartbeat/
/// dispatch state machine) plus the shutdown switch that every spawned task
/// observes.
///
/// `Node` itself is role-agnostic — it owns the shared `Engine<T>` but not a
/// particular `RoleHandler`. [`Node::spawn_core_tasks`] is generic over the
/// role so the same `Node` can be driven as a full node, miner, or SPV node
/// depending on what the caller constructs (see `sp-node/src/main.rs`).
pub struct Node<T: Transport> {
    pub engine: Arc<Engine<T>>,
    shutdown_tx: watch::Sender<bool>,
}

impl<T: Transport + 'static> Node<T> {
    /// Build a node around an already-bound `transport`. `identifier` is the
    /// `"<address>:<name>"` string this node announces itself as.
    pub fn new(identifier: String, ledger: Ledger, transport: T) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = Arc::new(Engine::new(
            identifier,
            Arc::new(Mutex::new(ledger)),
            Arc::new(RwLock::new(PeerTable::new())),
            Arc::new(transport),
            shutdown_rx,
        ));
        Self { engine, shutdown_tx }
    }

    /// Spawn the handshake retry loop, heartbeat broadcaster, idle-peer
    /// sweep, and receive loop as independent tasks, all driven by the same
    /// shutdown signal. Returns the join handles so the caller can await a
    /// clean shutdown.
    pub fn spawn_core_tasks<R>(&self, role: Arc<R>) -> Vec<JoinHandle<()>>
    where
        R: RoleHandler<T> + 'static,
    {
        let mut handles = Vec::with_capacity(4);

        let engine = self.engine.clone();
        handles.push(tokio::spawn(async move { engine.handshake_loop().await }));

        let engine = self.engine.clone();
        handles.push(tokio::spawn(async move { engine.heartbeat_loop().await }));

        let engine = self.engine.clone();
        handles.push(tokio::spawn(async move { engine.sweep_loop().await }));

        let engine = self.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.receive_loop(role.as_ref()).await
        }));

        handles
    }

    /// Flip the shutdown switch observed by every spawned loop. Idempotent:
    /// sending `true` when it is already `true` is a harmless no-op.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn identifier(&self) -> &str {
        &self.engine.identifier
    }

    /// Queue a transaction from this node's own identifier, for the
    /// front-end's "add a transaction?" prompt (see `main.rs`).
    pub async fn queue_transaction(
        &self,
        recipient: String,
        amount: f64,
    ) -> Result<usize, crate::error::NodeError> {
        let sender = self.identifier().to_string();
        let mut ledger = self.engine.ledger.lock().await;
        Ok(ledger.add_transaction(sender, recipient, amount, "0".into())?)
    }

    /// A fresh receiver on this node's shutdown switch, for tasks spawned
    /// outside [`Node::spawn_core_tasks`] (e.g. the mining loop, which needs
    /// its own `watch::Receiver` handle).
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}
