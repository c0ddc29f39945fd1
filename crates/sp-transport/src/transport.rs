use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// What the session engine needs from the network, and nothing more: a
/// lifecycle, an inbound queue of byte frames, and a deduplicated broadcast
/// `send`. The core never addresses peers by network address — routing is
/// carried entirely in the envelope's `target` field, one layer up.
///
/// Methods spell out `-> impl Future<Output = _> + Send` rather than using
/// bare `async fn`: every caller is generic over a concrete `T: Transport`
/// (never boxed as `dyn Transport`), so pulling in `async-trait` for vtable
/// dispatch would be the wrong tool — but the futures still need to be
/// `Send` since the receive loop runs inside a spawned task.
pub trait Transport: Send + Sync {
    /// Bring the transport up. Idempotent.
    fn start(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Tear the transport down. Idempotent.
    fn stop(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait up to `timeout` for the next inbound frame. `None` on timeout.
    fn recv_timeout(&self, timeout: Duration) -> impl Future<Output = Option<Vec<u8>>> + Send;

    /// Broadcast `bytes` to every peer reachable on the local segment.
    /// Implementations deduplicate at this layer: a frame already seen
    /// (by any transport sharing the same medium) is not redelivered.
    fn send(&self, bytes: Vec<u8>) -> impl Future<Output = Result<(), TransportError>> + Send;
}
