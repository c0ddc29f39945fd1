pub mod engine;
pub mod envelope;
pub mod error;
pub mod payload;

pub use engine::{
    Engine, RoleHandler, HANDSHAKE_RETRY_INTERVAL, HEARTBEAT_INTERVAL, RECV_POLL_TIMEOUT,
    SWEEP_INTERVAL,
};
pub use envelope::Envelope;
pub use error::SessionError;
pub use payload::{AddBlockPayload, AddTxPayload, ChainPayload, HeadersPayload, VersionPayload};
