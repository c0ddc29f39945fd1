use tracing::debug;

use sp_session::{AddBlockPayload, AddTxPayload, ChainPayload, Engine, Envelope, HeadersPayload, RoleHandler};
use sp_transport::Transport;
use sp_validator::{valid_chain, valid_headers, Block, Header};

/// Wrap a bare header in a body-less block so header-only (SPV) chains can
/// be stored and validated through the same `Ledger`/`valid_chain` path a
/// full node uses. `valid_chain` never inspects the body beyond the
/// merkle_root already baked into the header, so this is lossless for
/// validation purposes.
fn header_only_block(header: Header) -> Block {
    Block { header, body: Vec::new() }
}

async fn respond_getdata<T: Transport>(engine: &Engine<T>, requester: &str) {
    let (chain, tx_info) = {
        let ledger = engine.ledger.lock().await;
        (ledger.chain().to_vec(), ledger.tx_info().clone())
    };
    let payload = ChainPayload { chain, tx_info };
    match Envelope::new("chain", &engine.identifier)
        .targeted(requester)
        .with_payload(&payload)
    {
        Ok(envelope) => {
            let _ = engine.send_to(requester, envelope).await;
        }
        Err(e) => debug!(error = %e, "failed to build chain response"),
    }
}

async fn respond_getheaders<T: Transport>(engine: &Engine<T>, requester: &str) {
    let (headers, tx_info) = {
        let ledger = engine.ledger.lock().await;
        let headers = ledger.chain().iter().map(|b| b.header.clone()).collect();
        (headers, ledger.tx_info().clone())
    };
    let payload = HeadersPayload { headers, tx_info };
    match Envelope::new("headers", &engine.identifier)
        .targeted(requester)
        .with_payload(&payload)
    {
        Ok(envelope) => {
            let _ = engine.send_to(requester, envelope).await;
        }
        Err(e) => debug!(error = %e, "failed to build headers response"),
    }
}

async fn handle_chain_response<T: Transport, R: RoleHandler<T>>(
    engine: &Engine<T>,
    envelope: &Envelope,
    role: &R,
) {
    let payload: ChainPayload = match envelope.payload() {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "dropping malformed chain payload");
            return;
        }
    };

    engine
        .peers
        .write()
        .await
        .set_height(&envelope.identifier, payload.chain.len() as u64);

    if valid_chain(&payload.chain) {
        let mut ledger = engine.ledger.lock().await;
        ledger.replace_chain(payload.chain);
        ledger.merge_tx_info(&payload.tx_info);
        drop(ledger);
        engine.set_synced(true);
    } else {
        engine.run_conflict_resolution(role).await;
    }
}

async fn handle_headers_response<T: Transport, R: RoleHandler<T>>(
    engine: &Engine<T>,
    envelope: &Envelope,
    role: &R,
) {
    let payload: HeadersPayload = match envelope.payload() {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "dropping malformed headers payload");
            return;
        }
    };

    engine
        .peers
        .write()
        .await
        .set_height(&envelope.identifier, payload.headers.len() as u64);

    if valid_headers(&payload.headers) {
        let blocks = payload.headers.into_iter().map(header_only_block).collect();
        let mut ledger = engine.ledger.lock().await;
        ledger.replace_chain(blocks);
        ledger.merge_tx_info(&payload.tx_info);
        drop(ledger);
        engine.set_synced(true);
    } else {
        engine.run_conflict_resolution(role).await;
    }
}

/// `addblock` handling shared by every role: try the new block on top of a
/// copy of the chain, commit on success, fall back to conflict resolution
/// on failure. `keep_body` is `false` for SPV, which only ever stores the
/// header half of the announced block.
async fn handle_addblock<T: Transport, R: RoleHandler<T>>(
    engine: &Engine<T>,
    envelope: &Envelope,
    role: &R,
    keep_body: bool,
) {
    let payload: AddBlockPayload = match envelope.payload() {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "dropping malformed addblock payload");
            return;
        }
    };

    engine
        .peers
        .write()
        .await
        .set_height(&envelope.identifier, payload.height);

    let candidate_block = if keep_body {
        payload.block.clone()
    } else {
        header_only_block(payload.block.header.clone())
    };

    let mut ledger = engine.ledger.lock().await;
    let mut candidate_chain = ledger.chain().to_vec();
    candidate_chain.push(candidate_block);

    if valid_chain(&candidate_chain) {
        ledger.replace_chain(candidate_chain);
        ledger.merge_tx_info(&payload.tx_info);
        drop(ledger);
        engine.set_synced(true);
    } else {
        drop(ledger);
        engine.run_conflict_resolution(role).await;
    }
}

async fn handle_addtx<T: Transport>(engine: &Engine<T>, envelope: &Envelope) {
    let payload: AddTxPayload = match envelope.payload() {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "dropping malformed addtx payload");
            return;
        }
    };

    let mut ledger = engine.ledger.lock().await;
    if let Err(e) = ledger.verify_and_add_transaction(
        payload.sender,
        payload.recipient,
        payload.amount,
        payload.previous_hash,
    ) {
        debug!(error = %e, "dropping invalid transaction");
    }
}

/// Validates and relays the chain and pending transactions, serving peers'
/// `getdata`/`getheaders` requests and applying miners' `addblock`
/// broadcasts. Conflict resolution asks the best peer for `getdata`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullNodeRole;

impl<T: Transport> RoleHandler<T> for FullNodeRole {
    async fn send_sync_request(&self, engine: &Engine<T>, target: &str) {
        let request = Envelope::new("getdata", &engine.identifier).targeted(target);
        let _ = engine.send_to(target, request).await;
    }

    async fn handle_role_message(&self, engine: &Engine<T>, envelope: &Envelope) {
        match envelope.kind.as_str() {
            "getdata" => respond_getdata(engine, &envelope.identifier).await,
            "chain" => handle_chain_response(engine, envelope, self).await,
            "getheaders" => respond_getheaders(engine, &envelope.identifier).await,
            "headers" => handle_headers_response(engine, envelope, self).await,
            "addblock" => handle_addblock(engine, envelope, self, true).await,
            kind => debug!(kind, "full node ignoring unrecognised message type"),
        }
    }
}

/// A [`FullNodeRole`] that also admits `addtx` broadcasts into its pending
/// pool. The mining loop itself lives in [`crate::mining`], driven from
/// outside the message-dispatch path.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinerRole {
    full: FullNodeRole,
}

impl<T: Transport> RoleHandler<T> for MinerRole {
    async fn send_sync_request(&self, engine: &Engine<T>, target: &str) {
        self.full.send_sync_request(engine, target).await;
    }

    async fn handle_role_message(&self, engine: &Engine<T>, envelope: &Envelope) {
        if envelope.kind == "addtx" {
            handle_addtx(engine, envelope).await;
        } else {
            RoleHandler::<T>::handle_role_message(&self.full, engine, envelope).await;
        }
    }
}

/// Header-only node. Conflict resolution requests `getheaders` instead of
/// `getdata`; it stores received headers as its chain and never requests or
/// keeps transaction bodies. `merkleblock` is acknowledged but not acted on
/// — a full Merkle-inclusion verification against the stored header's
/// `merkle_root` is future work, not implemented here.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpvRole;

impl<T: Transport> RoleHandler<T> for SpvRole {
    async fn send_sync_request(&self, engine: &Engine<T>, target: &str) {
        let request = Envelope::new("getheaders", &engine.identifier).targeted(target);
        let _ = engine.send_to(target, request).await;
    }

    async fn handle_role_message(&self, engine: &Engine<T>, envelope: &Envelope) {
        match envelope.kind.as_str() {
            "headers" => handle_headers_response(engine, envelope, self).await,
            "addblock" => handle_addblock(engine, envelope, self, false).await,
            "merkleblock" => debug!("merkleblock acknowledged (verification not implemented)"),
            kind => debug!(kind, "spv node ignoring unrecognised message type"),
        }
    }
}
