use std::collections::HashMap;

use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};

use crate::error::PeerError;

/// Idle threshold in seconds: a peer is evicted once `last_send - last_recv`
/// strictly exceeds this many seconds.
pub const IDLE_THRESHOLD_SECS: i64 = 1800;

/// A single known peer's liveness bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Timestamp of the last inbound message from this peer.
    pub last_recv: i64,
    /// Timestamp of the last outbound message to this peer, or `0` if none
    /// has been sent yet.
    pub last_send: i64,
    /// Claimed chain length, as reported by the peer's last `version` (or
    /// `chain`/`headers` response).
    pub height: u64,
}

/// The set of known peers, keyed by identifier (`"<address>:<name>"`).
///
/// All methods that depend on wall-clock time take `now` explicitly rather
/// than reading the clock themselves, so the 1800 s eviction boundary can be
/// tested exactly; callers pass `Utc::now().timestamp()`.
#[derive(Debug, Clone, Default)]
pub struct PeerTable {
    peers: HashMap<String, Peer>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self {
            peers: HashMap::new(),
        }
    }

    /// Register `identifier` with the given claimed `height`. Returns `true`
    /// if this is a new entry, `false` if the peer was already known
    /// (registration is idempotent: the existing entry is left untouched).
    pub fn register(&mut self, identifier: &str, height: u64, now: i64) -> bool {
        if self.peers.contains_key(identifier) {
            return false;
        }
        self.peers.insert(
            identifier.to_string(),
            Peer {
                last_recv: now,
                last_send: 0,
                height,
            },
        );
        true
    }

    /// Update `last_send` for a known peer. No-op if the peer is unknown.
    pub fn touch_send(&mut self, identifier: &str, now: i64) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.last_send = now;
        }
    }

    /// Update `last_send` for every known peer at once. Used after a
    /// broadcast, which reaches the whole table rather than one target.
    pub fn touch_send_all(&mut self, now: i64) {
        for peer in self.peers.values_mut() {
            peer.last_send = now;
        }
    }

    /// Update `last_recv` for a known peer. No-op if the peer is unknown.
    pub fn touch_recv(&mut self, identifier: &str, now: i64) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.last_recv = now;
        }
    }

    /// Overwrite the claimed height for a known peer. No-op if unknown.
    pub fn set_height(&mut self, identifier: &str, height: u64) {
        if let Some(peer) = self.peers.get_mut(identifier) {
            peer.height = height;
        }
    }

    /// Remove every peer for which `last_send - last_recv > 1800`. A peer
    /// that has never been sent to (`last_send == 0`) is never evicted by
    /// this rule, regardless of how stale `last_recv` is — `last_send == 0`
    /// would otherwise underflow the condition into a false idle reading.
    pub fn sweep(&mut self) {
        self.peers.retain(|_, peer| {
            if peer.last_send == 0 {
                return true;
            }
            peer.last_send - peer.last_recv <= IDLE_THRESHOLD_SECS
        });
    }

    /// A uniformly chosen identifier from the known peer set.
    pub fn random_peer(&self) -> Result<&str, PeerError> {
        let mut rng = rand::thread_rng();
        self.peers
            .keys()
            .choose(&mut rng)
            .map(String::as_str)
            .ok_or(PeerError::NoPeers)
    }

    /// The peer with the greatest claimed `height` strictly exceeding
    /// `local_height`, if any. Used by conflict resolution.
    pub fn best_peer_above(&self, local_height: u64) -> Option<(&str, Peer)> {
        self.peers
            .iter()
            .filter(|(_, peer)| peer.height > local_height)
            .max_by_key(|(_, peer)| peer.height)
            .map(|(id, peer)| (id.as_str(), *peer))
    }

    pub fn get(&self, identifier: &str) -> Option<&Peer> {
        self.peers.get(identifier)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut table = PeerTable::new();
        assert!(table.register("1.2.3.4:a", 1, 0));
        assert!(!table.register("1.2.3.4:a", 5, 10));
        assert_eq!(table.get("1.2.3.4:a").unwrap().height, 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn registering_sets_last_recv_now_and_last_send_zero() {
        let mut table = PeerTable::new();
        table.register("a", 1, 42);
        let peer = table.get("a").unwrap();
        assert_eq!(peer.last_recv, 42);
        assert_eq!(peer.last_send, 0);
    }

    #[test]
    fn touch_send_all_updates_every_known_peer() {
        let mut table = PeerTable::new();
        table.register("a", 1, 0);
        table.register("b", 2, 0);
        table.touch_send_all(7);
        assert_eq!(table.get("a").unwrap().last_send, 7);
        assert_eq!(table.get("b").unwrap().last_send, 7);
    }

    #[test]
    fn peer_never_sent_to_is_never_evicted() {
        let mut table = PeerTable::new();
        table.register("a", 1, 0);
        table.sweep();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn idle_exactly_at_threshold_is_not_evicted() {
        let mut table = PeerTable::new();
        table.register("a", 1, 0);
        table.touch_send("a", IDLE_THRESHOLD_SECS);
        table.sweep();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn idle_one_second_past_threshold_is_evicted() {
        let mut table = PeerTable::new();
        table.register("a", 1, 0);
        table.touch_send("a", IDLE_THRESHOLD_SECS + 1);
        table.sweep();
        assert!(table.is_empty());
    }

    #[test]
    fn random_peer_on_empty_table_errors() {
        let table = PeerTable::new();
        assert!(matches!(table.random_peer(), Err(PeerError::NoPeers)));
    }

    #[test]
    fn random_peer_returns_a_known_identifier() {
        let mut table = PeerTable::new();
        table.register("a", 1, 0);
        table.register("b", 2, 0);
        let chosen = table.random_peer().unwrap();
        assert!(chosen == "a" || chosen == "b");
    }

    #[test]
    fn best_peer_above_picks_strictly_taller_peer() {
        let mut table = PeerTable::new();
        table.register("short", 3, 0);
        table.register("tall", 9, 0);
        let (id, peer) = table.best_peer_above(5).unwrap();
        assert_eq!(id, "tall");
        assert_eq!(peer.height, 9);
    }

    #[test]
    fn best_peer_above_is_none_when_no_peer_is_taller() {
        let mut table = PeerTable::new();
        table.register("short", 3, 0);
        assert!(table.best_peer_above(5).is_none());
    }
}
