//! Node orchestration: the gRPC service, peer set, and validator loop that
//! together make a `Chain` participate in the network.

mod peer_set;
mod service;
mod validator;

pub use peer_set::PeerSet;
pub use service::{Node, NODE_VERSION};
pub use validator::{run as run_validator, BLOCK_TIME};

use std::sync::Arc;

use anyhow::Result;
use blocker_chain::Chain;
use blocker_mempool::Mempool;
use blocker_proto::NodeServer;
use blocker_store::{MemoryBlockStore, MemoryTxStore, MemoryUtxoStore};
use tonic::transport::Server;
use tracing::info;

pub struct NodeConfig {
    pub listen_addr: String,
    pub bootstrap_nodes: Vec<String>,
    pub private_key: Option<blocker_crypto::PrivateKey>,
}

/// Builds a fresh chain and mempool and wraps them in a `Node`, without
/// binding or bootstrapping. Exposed so callers (including multi-node
/// integration tests) can start serving before choosing when to bootstrap.
pub fn new_node(listen_addr: String, private_key: Option<blocker_crypto::PrivateKey>) -> Arc<Node> {
    let chain = Arc::new(Chain::new(
        Arc::new(MemoryBlockStore::new()),
        Arc::new(MemoryTxStore::new()),
        Arc::new(MemoryUtxoStore::new()),
    ));
    let mempool = Arc::new(Mempool::new());
    Arc::new(Node::new(listen_addr, private_key, chain, mempool))
}

/// Binds `node.listen_addr` and serves the gRPC `Node` service until the
/// server stops.
pub async fn serve(node: Arc<Node>) -> Result<()> {
    let addr = node.listen_addr.parse()?;
    info!(%addr, "node listening");
    Server::builder()
        .add_service(NodeServer::new(NodeInner(node)))
        .serve(addr)
        .await?;
    Ok(())
}

/// Builds a node, starts serving in the background, bootstraps against
/// `cfg.bootstrap_nodes`, spawns the validator loop if `cfg.private_key` is
/// set, then blocks on the server task.
pub async fn run_node(cfg: NodeConfig) -> Result<()> {
    let node = new_node(cfg.listen_addr, cfg.private_key);
    let server_task = tokio::spawn(serve(node.clone()));

    if !cfg.bootstrap_nodes.is_empty() {
        node.bootstrap_network(&cfg.bootstrap_nodes).await?;
    }

    if node.private_key.is_some() {
        let validator_node = node.clone();
        let validator_task = tokio::spawn(async move { run_validator(validator_node).await });
        tokio::select! {
            result = server_task => return result?,
            result = validator_task => return result?,
        }
    }

    server_task.await??;
    Ok(())
}

/// Thin wrapper so the gRPC server can hold an `Arc<Node>`. The trait impl
/// lives here rather than on `Node` itself so `handshake` can clone the
/// `Arc` into a detached follow-up task instead of awaiting it inline.
struct NodeInner(Arc<Node>);

#[tonic::async_trait]
impl blocker_proto::Node for NodeInner {
    async fn handshake(
        &self,
        request: tonic::Request<blocker_proto::Version>,
    ) -> Result<tonic::Response<blocker_proto::Version>, tonic::Status> {
        let their = request.into_inner();
        info!(peer = %their.listen_addr, height = their.height, "received handshake");

        if self.0.can_connect_with(&their.listen_addr) {
            match service::connect(&their.listen_addr).await {
                Ok(client) => {
                    self.0.peers.add(client, their.clone());
                    // Follow up on addresses they told us about, not their
                    // own address: that peer is already connected above,
                    // and re-dialing it here is what used to deadlock two
                    // nodes handshaking each other at the same time.
                    let node = self.0.clone();
                    let their_peers = their.peer_list.clone();
                    tokio::spawn(async move {
                        if let Err(err) = node.bootstrap_network(&their_peers).await {
                            tracing::warn!(error = %err, "transitive bootstrap failed");
                        }
                    });
                }
                Err(err) => {
                    tracing::warn!(peer = %their.listen_addr, error = %err, "failed to connect back to handshake peer");
                }
            }
        }
        Ok(tonic::Response::new(self.0.local_version()))
    }

    async fn handle_tx(
        &self,
        request: tonic::Request<blocker_proto::Transaction>,
    ) -> Result<tonic::Response<blocker_proto::Ack>, tonic::Status> {
        let tx = request.into_inner();
        if self.0.mempool.add(tx.clone()) {
            self.0.broadcast(tx).await;
        }
        Ok(tonic::Response::new(blocker_proto::Ack {}))
    }
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
