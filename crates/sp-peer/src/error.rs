use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("peer table is empty")]
    NoPeers,
}
