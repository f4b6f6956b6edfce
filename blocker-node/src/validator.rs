use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use blocker_chain::ChainError;
use blocker_envelope::sign_block;
use blocker_proto::Block;
use tracing::{error, info};

use crate::service::Node;

/// Cadence at which a validating node seals whatever is in its mempool into
/// a new block, empty or not.
pub const BLOCK_TIME: Duration = Duration::from_secs(5);

/// Runs until a fatal error occurs. Only meaningful for a node configured
/// with a private key; callers should not spawn this otherwise. A corrupted
/// store (`ChainError::InternalStateCorrupt`) is the only failure treated as
/// fatal; every other rejection is logged and the loop keeps ticking.
pub async fn run(node: Arc<Node>) -> Result<()> {
    let key = node
        .private_key
        .clone()
        .ok_or_else(|| anyhow!("validator loop started without a private key"))?;
    let mut ticker = tokio::time::interval(BLOCK_TIME);
    loop {
        ticker.tick().await;
        let transactions = node.mempool.clear();
        let height = node.chain.height();
        let prev = match node.chain.get_block_by_height(height) {
            Ok(block) => block,
            Err(err) => {
                error!(%err, "validator could not read chain tip");
                continue;
            }
        };
        let header = blocker_chain::next_block_header(&prev.header.clone().unwrap_or_default());
        let mut block = Block {
            header: Some(header),
            public_key: vec![],
            signature: vec![],
            transactions,
        };
        sign_block(&key, &mut block);
        let tx_count = block.transactions.len();
        match node.chain.add_block(block) {
            Ok(()) => info!(height = node.chain.height(), transactions = tx_count, "sealed block"),
            Err(ChainError::InternalStateCorrupt(msg)) => {
                return Err(anyhow!("validator hit corrupted chain state: {msg}"));
            }
            Err(err) => error!(%err, "failed to seal block"),
        }
    }
}
