use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A node's startup configuration, loaded from a TOML file and overlaid
/// with `BLOCKER__`-prefixed environment variables (e.g.
/// `BLOCKER__LISTEN_ADDR`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub listen_addr: String,
    pub bootstrap_nodes: Vec<String>,
    /// Hex-encoded 32-byte seed. Present only on nodes that seal blocks.
    pub private_key: Option<String>,
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("BLOCKER").separator("__"));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn example() -> Self {
        Self {
            listen_addr: "0.0.0.0:3000".into(),
            bootstrap_nodes: vec![],
            private_key: None,
        }
    }
}
