use serde::{Deserialize, Serialize};
use sp_transaction::Transaction;

use crate::header::Header;

/// A header paired with its ordered transaction body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub body: Vec<Transaction>,
}

impl Block {
    /// The fixed genesis block: empty body, the canonical genesis header.
    pub fn genesis() -> Self {
        Self {
            header: Header::genesis(),
            body: Vec::new(),
        }
    }

    /// Hex-encoded hash of this block's header (bodies are not part of the
    /// hash preimage directly — they are committed via `merkle_root`).
    pub fn hash_hex(&self) -> String {
        self.header.hash_hex()
    }
}
