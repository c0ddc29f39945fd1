use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sp_validator::Block;

use crate::ledger::Ledger;

/// On-disk shape: just the chain, per the wire format nodes also use to
/// answer a `getchain` request. Pending transactions and `tx_info` are
/// runtime state, not persisted.
#[derive(Debug, Serialize, Deserialize)]
struct ChainFile {
    chain: Vec<Block>,
}

impl Ledger {
    /// Load a ledger from `path`. A missing file is not an error: it means
    /// this node has never persisted before, so a fresh genesis-only ledger
    /// is returned.
    pub fn load_from_file(path: impl AsRef<Path>) -> io::Result<Ledger> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Ledger::new()),
            Err(e) => return Err(e),
        };

        let file: ChainFile = serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut ledger = Ledger::new();
        ledger.replace_chain(file.chain);
        Ok(ledger)
    }

    /// Persist the chain to `path` as `{"chain": [...]}`. Pending
    /// transactions and `tx_info` are dropped; a restart resumes from the
    /// last sealed block.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = ChainFile {
            chain: self.chain().to_vec(),
        };
        let bytes = serde_json::to_vec_pretty(&file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_a_missing_file_yields_fresh_genesis_ledger() {
        let dir = std::env::temp_dir().join("sp-ledger-test-missing-file");
        let _ = fs::remove_file(&dir);
        let ledger = Ledger::load_from_file(&dir).unwrap();
        assert_eq!(ledger.chain().len(), 1);
    }

    #[test]
    fn save_then_load_round_trips_the_chain() {
        let mut ledger = Ledger::new();
        let prev_hash = sp_validator::hash(&ledger.last_block().header);
        ledger.add_block(0, prev_hash).unwrap();

        let path = std::env::temp_dir().join(format!(
            "sp-ledger-test-roundtrip-{}.json",
            ledger.chain().len()
        ));
        ledger.save_to_file(&path).unwrap();

        let loaded = Ledger::load_from_file(&path).unwrap();
        assert_eq!(loaded.chain(), ledger.chain());

        fs::remove_file(&path).unwrap();
    }
}
