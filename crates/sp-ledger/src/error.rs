use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("recipient must not be empty")]
    EmptyRecipient,

    #[error("transaction double-spends previous_hash {0:?}")]
    InvalidTransaction(String),

    #[error("merkle error: {0}")]
    Merkle(#[from] sp_merkle::MerkleError),

    #[error("transaction error: {0}")]
    Transaction(#[from] sp_transaction::TransactionError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence json error: {0}")]
    Json(#[from] serde_json::Error),
}
