use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] sp_ledger::LedgerError),

    #[error("transport error: {0}")]
    Transport(#[from] sp_transport::TransportError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
