use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sp_transaction::Transaction;
use sp_validator::{Block, Header};

use crate::error::LedgerError;

/// The mutable ledger: the chain plus everything needed to grow it.
///
/// `tx_info` is treated as opaque associative data: merged on sync, never
/// diffed (see [`Ledger::merge_tx_info`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    chain: Vec<Block>,
    pending_transactions: Vec<Transaction>,
    tx_info: HashMap<String, Value>,

    /// `previous_hash` values of every transaction ever accepted through
    /// [`Ledger::verify_and_add_transaction`]. Used as the double-spend
    /// proxy; not part of the public data model, so it is excluded from
    /// (de)serialisation.
    #[serde(skip, default)]
    accepted_previous_hashes: HashSet<String>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// A fresh ledger containing only the canonical genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
            pending_transactions: Vec::new(),
            tx_info: HashMap::new(),
            accepted_previous_hashes: HashSet::new(),
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn tx_info(&self) -> &HashMap<String, Value> {
        &self.tx_info
    }

    /// The most recently appended block.
    pub fn last_block(&self) -> &Block {
        // A Ledger always holds at least the genesis block.
        self.chain.last().expect("chain always has a genesis block")
    }

    /// Append an unvalidated transaction (beyond requiring a non-empty
    /// recipient) to the pending pool. Returns the index of the block that
    /// will eventually contain it.
    pub fn add_transaction(
        &mut self,
        sender: String,
        recipient: String,
        amount: f64,
        previous_hash: String,
    ) -> Result<usize, LedgerError> {
        if recipient.is_empty() {
            return Err(LedgerError::EmptyRecipient);
        }
        let tx = Transaction::new(sender, recipient, amount, previous_hash);
        self.pending_transactions.push(tx);
        Ok(self.chain.len())
    }

    /// Like [`Ledger::add_transaction`] but rejects a `previous_hash` that
    /// already belongs to an accepted transaction (a double-spend proxy),
    /// unless `sender == "0"` (coinbase). On success the transaction's hash
    /// is recorded in `tx_info`.
    pub fn verify_and_add_transaction(
        &mut self,
        sender: String,
        recipient: String,
        amount: f64,
        previous_hash: String,
    ) -> Result<usize, LedgerError> {
        if recipient.is_empty() {
            return Err(LedgerError::EmptyRecipient);
        }

        let is_coinbase = sender == sp_transaction::COINBASE_SENTINEL;
        if !is_coinbase && self.accepted_previous_hashes.contains(&previous_hash) {
            return Err(LedgerError::InvalidTransaction(previous_hash));
        }

        let tx = Transaction::new(sender, recipient, amount, previous_hash.clone());
        let tx_id = tx.hash_hex()?;

        self.pending_transactions.push(tx);
        if !is_coinbase {
            self.accepted_previous_hashes.insert(previous_hash);
        }
        self.tx_info.insert(tx_id, Value::Bool(true));

        Ok(self.chain.len())
    }

    /// Seal the current pending pool into a new block carrying `proof` and
    /// `previous_hash`, append it to the chain, and empty the pending pool.
    pub fn add_block(&mut self, proof: u64, previous_hash: String) -> Result<&Block, LedgerError> {
        let index = self.chain.len() as u64;
        let body = std::mem::take(&mut self.pending_transactions);
        let merkle_root = hex::encode(sp_merkle::merkle_root(&body)?);

        let block = Block {
            header: Header {
                index,
                previous_hash,
                timestamp: Utc::now().timestamp(),
                merkle_root,
                proof,
            },
            body,
        };

        self.chain.push(block);
        Ok(self.chain.last().unwrap())
    }

    /// Replace the chain wholesale (conflict resolution). Caller is
    /// responsible for having validated `new_chain` first
    /// (see `sp_validator::valid_chain`); this keeps the replacement itself
    /// a single atomic assignment so observers never see a partial chain.
    pub fn replace_chain(&mut self, new_chain: Vec<Block>) {
        self.chain = new_chain;
    }

    /// Merge another node's `tx_info` into ours. Associative and commutative
    /// for non-conflicting keys; conflicting keys favour `other`.
    pub fn merge_tx_info(&mut self, other: &HashMap<String, Value>) {
        for (k, v) in other {
            self.tx_info.insert(k.clone(), v.clone());
        }
    }
}
