use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sp_validator::{Block, Header};

/// Payload of a `version` message: the sender's claimed chain length.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionPayload {
    pub height: u64,
}

/// Payload of a `chain` response (and, with `chain` swapped for `headers`,
/// of a `headers` response — see [`HeadersPayload`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainPayload {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub tx_info: HashMap<String, Value>,
}

/// Payload of a `headers` response, the SPV/`getheaders` counterpart of
/// [`ChainPayload`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadersPayload {
    pub headers: Vec<Header>,
    #[serde(default)]
    pub tx_info: HashMap<String, Value>,
}

/// Payload of a miner's `addblock` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBlockPayload {
    pub block: Block,
    #[serde(default)]
    pub tx_info: HashMap<String, Value>,
    pub height: u64,
}

/// Payload of an `addtx` broadcast. Carries no `timestamp`: the receiving
/// miner always stamps its own when it admits the transaction, so the
/// wire representation never includes one to begin with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTxPayload {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub previous_hash: String,
}
