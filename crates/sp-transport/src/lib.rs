pub mod error;
pub mod in_memory;
pub mod transport;
pub mod udp;

pub use error::TransportError;
pub use in_memory::{InMemoryBus, InMemoryTransport};
pub use transport::Transport;
pub use udp::UdpTransport;
