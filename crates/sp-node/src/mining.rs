use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use sp_session::{AddBlockPayload, Engine, Envelope};
use sp_transport::Transport;
use sp_validator::valid_proof;

use crate::role::MinerRole;

/// How often the mining loop checks `ready`/`synced` while it has nothing
/// to do.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Proof attempts between cooperative yields to the async runtime. The
/// search itself has no suspension points per the scheduling model; this
/// only keeps the executor responsive to other tasks on the same thread.
const YIELD_EVERY: u64 = 4096;

/// Coinbase reward paid to the miner that finds a block's proof.
const BLOCK_REWARD: f64 = 50.0;

/// (1) read `last_block`, (2) search for a proof, (3) insert a coinbase
/// transaction, (4) assemble the block via the Ledger, (5) broadcast
/// `addblock`. Runs until shutdown; mines opportunistically whenever
/// `ready && synced`, regardless of pending user transactions.
pub async fn mining_loop<T: Transport>(
    engine: Arc<Engine<T>>,
    role: Arc<MinerRole>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            return;
        }

        if !(engine.is_ready() && engine.is_synced()) {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        }

        let target_index = engine.ledger.lock().await.last_block().header.index;
        let previous_hash = {
            let ledger = engine.ledger.lock().await;
            sp_validator::hash(&ledger.last_block().header)
        };

        let mut proof = 0u64;
        let found = loop {
            if *shutdown.borrow() {
                return;
            }
            if engine.ledger.lock().await.last_block().header.index != target_index {
                // Someone else's block already extended the chain; restart.
                break None;
            }
            if valid_proof(&previous_hash, proof) {
                break Some(proof);
            }
            proof += 1;
            if proof % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        };

        let Some(proof) = found else { continue };

        let mut ledger = engine.ledger.lock().await;
        if ledger.last_block().header.index != target_index {
            continue;
        }

        if let Err(e) =
            ledger.verify_and_add_transaction("0".into(), engine.identifier.clone(), BLOCK_REWARD, "0".into())
        {
            warn!(error = %e, "failed to mint coinbase transaction");
            continue;
        }

        let block = match ledger.add_block(proof, previous_hash.clone()) {
            Ok(block) => block.clone(),
            Err(e) => {
                warn!(error = %e, "failed to assemble mined block");
                continue;
            }
        };
        let tx_info = ledger.tx_info().clone();
        let height = ledger.chain().len() as u64;
        drop(ledger);

        info!(index = block.header.index, %previous_hash, "mined block");

        let payload = AddBlockPayload { block, tx_info, height };
        match Envelope::new("addblock", &engine.identifier).with_payload(&payload) {
            Ok(envelope) => {
                if let Err(e) = engine.broadcast("addblock", envelope).await {
                    warn!(error = %e, "failed to broadcast addblock");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode addblock"),
        }

        let _ = &role;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use sp_ledger::Ledger;
    use sp_peer::PeerTable;
    use sp_transport::InMemoryBus;
    use tokio::sync::{watch, Mutex, RwLock};

    use super::*;

    #[tokio::test]
    async fn mining_loop_appends_a_valid_block_once_ready_and_synced() {
        let bus = InMemoryBus::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = Arc::new(Engine::new(
            "miner:1".into(),
            Arc::new(Mutex::new(Ledger::new())),
            Arc::new(RwLock::new(PeerTable::new())),
            Arc::new(bus.transport("miner")),
            shutdown_rx.clone(),
        ));
        engine.set_ready(true);
        engine.set_synced(true);

        let role = Arc::new(crate::role::MinerRole::default());
        let handle = tokio::spawn(mining_loop(engine.clone(), role, shutdown_rx));

        tokio::time::sleep(Duration::from_secs(2)).await;
        shutdown_tx.send(true).unwrap();
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;

        assert!(engine.ledger.lock().await.chain().len() >= 2);
    }
}
