use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("recipient must not be empty")]
    EmptyRecipient,
}
