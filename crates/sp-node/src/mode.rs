use clap::ValueEnum;

/// Which role a node plays on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NodeRole {
    /// Validates and relays the chain and pending transactions; does not mine.
    #[default]
    FullNode,

    /// A full node that additionally runs the proof-of-work mining loop.
    Miner,

    /// Header-only: stores no transaction bodies, syncs via `getheaders`.
    Spv,
}
