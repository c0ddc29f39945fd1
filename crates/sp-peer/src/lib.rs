pub mod error;
pub mod peer;

pub use error::PeerError;
pub use peer::{Peer, PeerTable, IDLE_THRESHOLD_SECS};
