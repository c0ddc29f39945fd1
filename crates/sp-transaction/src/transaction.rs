use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::TransactionError;

/// Sentinel sender/previous_hash used by the genesis and coinbase transactions.
pub const COINBASE_SENTINEL: &str = "0";

/// A single unsigned record linking a sender to a recipient for some amount.
///
/// Transactions are not cryptographically signed in this design (no wallet or
/// key management is in scope); `previous_hash` links a transaction to a
/// prior one in a conceptual per-account chain and doubles as the admission
/// check's double-spend proxy (see [`crate::TransactionError`] callers in
/// `sp-ledger`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Peer identifier of the sender, or `"0"` for a coinbase reward.
    pub sender: String,

    /// Peer identifier of the recipient.
    pub recipient: String,

    /// Amount transferred. Not validated against any balance — this system
    /// does not track UTXOs or account balances.
    pub amount: f64,

    /// Links to a prior transaction's identity; `"0"` for genesis/coinbase.
    pub previous_hash: String,

    /// Unix timestamp (seconds) when this transaction was created.
    pub timestamp: i64,
}

impl Transaction {
    /// Construct a transaction stamped with the current time.
    pub fn new(sender: String, recipient: String, amount: f64, previous_hash: String) -> Self {
        Self {
            sender,
            recipient,
            amount,
            previous_hash,
            timestamp: Utc::now().timestamp(),
        }
    }

    /// True when `sender` is the coinbase sentinel `"0"`.
    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENTINEL
    }

    /// SHA-256 digest of the canonical (field-order-stable) JSON
    /// serialisation of this transaction. Used as a Merkle leaf.
    pub fn hash(&self) -> Result<[u8; 32], TransactionError> {
        let bytes = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&bytes).into())
    }

    /// Hex-encoded hash, useful for display and logging.
    pub fn hash_hex(&self) -> Result<String, TransactionError> {
        Ok(hex::encode(self.hash()?))
    }
}
