pub mod config;
pub mod error;
pub mod mining;
pub mod mode;
pub mod node;
pub mod role;

pub use config::{random_node_name, NodeConfig};
pub use error::NodeError;
pub use mining::mining_loop;
pub use mode::NodeRole;
pub use node::Node;
pub use role::{FullNodeRole, MinerRole, SpvRole};
