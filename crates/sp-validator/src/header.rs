use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Fixed Unix timestamp baked into the genesis block so every node in the
/// network starts from byte-identical history.
pub const GENESIS_TIMESTAMP: i64 = 1_700_000_000;

/// Fixed proof carried by the genesis block. It is never checked against
/// `valid_proof` — the genesis block is accepted by construction, not by
/// proof-of-work (see [`crate::validate::valid_chain`]).
pub const GENESIS_PROOF: u64 = 100;

/// Sentinel previous-hash for the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// The header of a [`crate::block::Block`].
///
/// Field order is significant: [`Header::canonical_json`] serialises fields
/// in declaration order, and that byte string is what [`crate::validate::hash`]
/// digests. Reordering fields changes every hash in the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Non-negative, monotonically increasing block height starting at 0.
    pub index: u64,

    /// Hex-encoded hash of the parent header, or `"0"` for genesis.
    pub previous_hash: String,

    /// Seconds since the Unix epoch when this header was built.
    pub timestamp: i64,

    /// Hex-encoded Merkle root over the block body's transactions, or the
    /// empty-body sentinel when the body has no transactions.
    pub merkle_root: String,

    /// Proof-of-work nonce satisfying `valid_proof(previous_hash, proof)`.
    pub proof: u64,
}

impl Header {
    /// The fixed genesis header all nodes must agree on.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            timestamp: GENESIS_TIMESTAMP,
            merkle_root: hex::encode(sp_merkle::EMPTY_ROOT),
            proof: GENESIS_PROOF,
        }
    }

    /// Canonical byte serialisation used as the hash preimage: stable field
    /// order, no pretty-printing, UTF-8 JSON.
    pub fn canonical_json(&self) -> Vec<u8> {
        // `Header` derives `Serialize` with fields in declaration order and
        // no custom field attributes, so `serde_json` always emits them in
        // that order — this is what makes the hash deterministic across
        // processes without reaching for a `BTreeMap`.
        serde_json::to_vec(self).expect("Header serialises infallibly")
    }

    /// Hex-encoded SHA-256 digest of [`Self::canonical_json`].
    pub fn hash_hex(&self) -> String {
        hex::encode(Sha256::digest(self.canonical_json()))
    }
}
