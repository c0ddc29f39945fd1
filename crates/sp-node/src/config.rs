use crate::mode::NodeRole;

/// Full configuration for a node daemon.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// This node's name component of its `"<address>:<name>"` identifier.
    pub name: String,

    /// UDP port this node binds to.
    pub port: u16,

    /// Chain persistence file. `None` means run without persistence.
    pub file: Option<std::path::PathBuf>,

    /// Which role this node plays.
    pub role: NodeRole,

    /// Suppress log output to stderr.
    pub quiet: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: random_node_name(),
            port: 5000,
            file: None,
            role: NodeRole::default(),
            quiet: false,
        }
    }
}

/// `node-<4 random hex chars>`, used when `-n` is not given.
pub fn random_node_name() -> String {
    use rand::Rng;
    let suffix: u16 = rand::thread_rng().gen();
    format!("node-{suffix:04x}")
}
