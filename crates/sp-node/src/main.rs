use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sp_ledger::Ledger;
use sp_node::{mining_loop, random_node_name, FullNodeRole, MinerRole, Node, NodeConfig, NodeRole, SpvRole};
use sp_transport::UdpTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Peer-to-peer ledger node daemon.
#[derive(Parser, Debug)]
#[command(name = "sp-node", version, about = "Peer-to-peer ledger node")]
struct Cli {
    /// Node name; combined with the bound address to form this node's
    /// identifier. Defaults to `node-<random>`.
    #[arg(short, long)]
    name: Option<String>,

    /// UDP port to bind.
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Chain persistence file. Missing file starts from fresh genesis.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Which role this node plays.
    #[arg(long, value_enum, default_value = "full-node")]
    role: NodeRole,

    /// Known peer address to seed the transport with (repeatable). Peer
    /// *identifiers* are still only ever learned by receiving `version`
    /// messages — this only gives the out-of-scope UDP transport somewhere
    /// to send the first datagram (see `sp_transport::UdpTransport`).
    #[arg(long = "peer")]
    peers: Vec<SocketAddr>,

    /// Suppress log output to stderr.
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_filter = if cli.quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::from_default_env().add_directive("sp_node=info".parse()?)
    };
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let config = NodeConfig {
        name: cli.name.unwrap_or_else(random_node_name),
        port: cli.port,
        file: cli.file,
        role: cli.role,
        quiet: cli.quiet,
    };

    let bind_addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let transport = UdpTransport::bind(bind_addr).await?;
    for peer in &cli.peers {
        transport.add_peer(*peer);
    }
    transport.start().await?;

    let identifier = format!("{bind_addr}:{}", config.name);
    info!(identifier = %identifier, role = ?config.role, "starting node");

    let ledger = match &config.file {
        Some(path) => Ledger::load_from_file(path)?,
        None => Ledger::new(),
    };

    let node = Arc::new(Node::new(identifier, ledger, transport));

    let mut handles = match config.role {
        NodeRole::FullNode => node.spawn_core_tasks(Arc::new(FullNodeRole)),
        NodeRole::Miner => {
            let role = Arc::new(MinerRole::default());
            let mut handles = node.spawn_core_tasks(role.clone());
            handles.push(tokio::spawn(mining_loop(
                node.engine.clone(),
                role,
                node.shutdown_rx(),
            )));
            handles
        }
        NodeRole::Spv => node.spawn_core_tasks(Arc::new(SpvRole)),
    };

    handles.push(tokio::spawn(interactive_loop(node.clone())));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    node.shutdown();

    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    if let Some(path) = &config.file {
        let ledger = node.engine.ledger.lock().await;
        if let Err(e) = ledger.save_to_file(path) {
            warn!(error = %e, "failed to persist chain on shutdown");
        } else {
            info!(path = %path.display(), "chain persisted");
        }
    }

    Ok(())
}

/// Minimal line-oriented front-end: prompts for transactions on stdin and
/// admits them into the pending pool. Mirrors the front-end contract this
/// core expects (see `spec.md` §6) without implementing the full
/// interactive UI, which is out of scope.
async fn interactive_loop(node: Arc<Node<UdpTransport>>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("add a transaction? (y/n) ");
        use std::io::Write;
        let _ = std::io::stdout().flush();

        let answer = match lines.next_line().await {
            Ok(Some(line)) => line,
            _ => return,
        };
        if answer.trim() != "y" {
            continue;
        }

        print!("recipient: ");
        let _ = std::io::stdout().flush();
        let recipient = match lines.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            _ => return,
        };

        print!("amount: ");
        let _ = std::io::stdout().flush();
        let amount: f64 = match lines.next_line().await {
            Ok(Some(line)) => line.trim().parse().unwrap_or(0.0),
            _ => return,
        };

        match node.queue_transaction(recipient, amount).await {
            Ok(idx) => info!(block = idx, "transaction queued"),
            Err(e) => warn!(error = %e, "transaction rejected"),
        }
    }
}
