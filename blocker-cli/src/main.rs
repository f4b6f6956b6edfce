use std::path::PathBuf;

use anyhow::Result;
use blocker_config::NodeConfig;
use blocker_crypto::PrivateKey;
use blocker_node::{init_logging, run_node};
use clap::{Parser, Subcommand};
use tokio::runtime::Runtime;

#[derive(Parser)]
#[command(name = "blocker", version, about = "blocker P2P node CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config file
    Init {
        #[arg(long, default_value = "config/blocker.toml")]
        config: PathBuf,
    },
    /// Start a node
    Node {
        #[command(subcommand)]
        cmd: NodeCmd,
    },
}

#[derive(Subcommand)]
enum NodeCmd {
    Start {
        #[arg(long, default_value = "config/blocker.toml")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { config } => init_config(config)?,
        Commands::Node { cmd } => match cmd {
            NodeCmd::Start { config } => {
                init_logging();
                let cfg = NodeConfig::load(&config)?;
                let private_key = cfg
                    .private_key
                    .as_deref()
                    .map(PrivateKey::from_hex)
                    .transpose()?;
                let node_cfg = blocker_node::NodeConfig {
                    listen_addr: cfg.listen_addr,
                    bootstrap_nodes: cfg.bootstrap_nodes,
                    private_key,
                };
                let rt = Runtime::new()?;
                rt.block_on(run_node(node_cfg))?;
            }
        },
    }
    Ok(())
}

fn init_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        println!("Config already exists at {path:?}");
        return Ok(());
    }
    let cfg = NodeConfig::example();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, toml::to_string_pretty(&cfg)?)?;
    println!("Wrote config to {path:?}");
    Ok(())
}
