use thiserror::Error;

/// Error kinds the session engine can encounter while processing inbound
/// traffic. None of these ever propagate out of the receive loop — they are
/// recovered locally (dropped, or retried against another peer) per the
/// drop/log policy documented on each variant.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Unparseable envelope or payload. Dropped silently; logged at `debug`.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// `target` set and not equal to this node's identifier. Dropped
    /// silently, without logging.
    #[error("misaddressed message")]
    MisaddressedMessage,

    /// A chain or header sequence failed validation.
    #[error("invalid chain or header sequence")]
    InvalidChain,

    /// A transaction was malformed or collided with an already-accepted one.
    #[error("invalid transaction")]
    InvalidTransaction,
}
