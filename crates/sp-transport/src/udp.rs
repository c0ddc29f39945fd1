use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::Transport;

/// How long a frame's digest is remembered for deduplication purposes.
const DEDUP_WINDOW: Duration = Duration::from_secs(60);

const MAX_DATAGRAM: usize = 64 * 1024;

/// A real-socket reference transport. Peers are addressed directly by
/// `SocketAddr` rather than via subnet broadcast or multicast — a
/// deliberately minimal stand-in for whatever discovery mechanism a real
/// deployment would use, since peer discovery itself is out of scope here.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peers: Mutex<Vec<SocketAddr>>,
    inbound_tx: mpsc::UnboundedSender<Vec<u8>>,
    // tokio::sync::Mutex, not std: the guard is held across the `.await` in
    // recv_timeout, which a std guard can't survive in a Send future.
    inbound_rx: AsyncMutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    recv_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).await?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Ok(Self {
            socket: Arc::new(socket),
            peers: Mutex::new(Vec::new()),
            inbound_tx,
            inbound_rx: AsyncMutex::new(inbound_rx),
            recv_task: Mutex::new(None),
        })
    }

    /// Register a peer address to fan broadcasts out to.
    pub fn add_peer(&self, addr: SocketAddr) {
        let mut peers = self.peers.lock().unwrap();
        if !peers.contains(&addr) {
            peers.push(addr);
        }
    }
}

impl Transport for UdpTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let mut guard = self.recv_task.lock().unwrap();
        if guard.is_some() {
            return Ok(());
        }
        let socket = self.socket.clone();
        let tx = self.inbound_tx.clone();
        let seen = Arc::new(Mutex::new(HashMap::<[u8; 32], Instant>::new()));
        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => {
                        let frame = buf[..len].to_vec();
                        let digest = Sha256::digest(&frame).into();
                        let now = Instant::now();
                        let mut seen = seen.lock().unwrap();
                        seen.retain(|_, seen_at| now.duration_since(*seen_at) < DEDUP_WINDOW);
                        if seen.insert(digest, now).is_none() {
                            drop(seen);
                            if tx.send(frame).is_err() {
                                break;
                            }
                        } else {
                            debug!(?from, "dropped duplicate inbound frame");
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "udp recv_from failed");
                        break;
                    }
                }
            }
        });
        *guard = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        if let Some(handle) = self.recv_task.lock().unwrap().take() {
            handle.abort();
        }
        Ok(())
    }

    async fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        let mut rx = self.inbound_rx.lock().await;
        tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
    }

    async fn send(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        let peers = self.peers.lock().unwrap().clone();
        for peer in peers {
            self.socket.send_to(&bytes, peer).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn two_bound_sockets_exchange_a_frame() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b_addr = b.socket.local_addr().unwrap();
        a.add_peer(b_addr);

        b.start().await.unwrap();
        a.send(b"ping".to_vec()).await.unwrap();

        let received = b.recv_timeout(Duration::from_millis(500)).await;
        assert_eq!(received, Some(b"ping".to_vec()));

        b.stop().await.unwrap();
    }

    #[tokio::test]
    async fn sending_the_same_frame_twice_is_deduplicated() {
        let a = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let b_addr = b.socket.local_addr().unwrap();
        a.add_peer(b_addr);

        b.start().await.unwrap();
        a.send(b"ping".to_vec()).await.unwrap();
        a.send(b"ping".to_vec()).await.unwrap();

        let first = b.recv_timeout(Duration::from_millis(500)).await;
        assert_eq!(first, Some(b"ping".to_vec()));
        let second = b.recv_timeout(Duration::from_millis(200)).await;
        assert_eq!(second, None);

        b.stop().await.unwrap();
    }
}
