use std::sync::Arc;

use blocker_chain::Chain;
use blocker_crypto::PrivateKey;
use blocker_mempool::Mempool;
use blocker_proto::NodeClient;
use blocker_proto::{Transaction, Version};
use tonic::transport::{Channel, Endpoint};
use tonic::Request;
use tracing::info;

use crate::peer_set::PeerSet;

pub const NODE_VERSION: &str = "blocker-0.1";

/// A running node: its chain, mempool, connected peers, and (if it seals
/// blocks) the key it signs them with.
pub struct Node {
    pub listen_addr: String,
    pub private_key: Option<PrivateKey>,
    pub chain: Arc<Chain>,
    pub mempool: Arc<Mempool>,
    pub peers: Arc<PeerSet>,
}

impl Node {
    pub fn new(listen_addr: String, private_key: Option<PrivateKey>, chain: Arc<Chain>, mempool: Arc<Mempool>) -> Self {
        Self {
            listen_addr,
            private_key,
            chain,
            mempool,
            peers: Arc::new(PeerSet::new()),
        }
    }

    pub(crate) fn local_version(&self) -> Version {
        Version {
            version: NODE_VERSION.to_string(),
            height: self.chain.height(),
            listen_addr: self.listen_addr.clone(),
            peer_list: self.peers.addresses(),
        }
    }

    /// Dials every address in `addrs` that isn't already a peer and isn't
    /// this node, handshakes, and follows any newly learned addresses the
    /// same way until no new peers are discovered.
    pub async fn bootstrap_network(&self, addrs: &[String]) -> anyhow::Result<()> {
        let mut queue: Vec<String> = addrs.to_vec();
        while let Some(addr) = queue.pop() {
            if !self.can_connect_with(&addr) {
                continue;
            }
            match self.dial_and_handshake(&addr).await {
                Ok(their_version) => {
                    info!(peer = %addr, height = their_version.height, "handshake complete");
                    queue.extend(their_version.peer_list);
                }
                Err(err) => {
                    tracing::warn!(peer = %addr, error = %err, "failed to connect to peer");
                }
            }
        }
        Ok(())
    }

    pub fn can_connect_with(&self, addr: &str) -> bool {
        addr != self.listen_addr && !self.peers.contains_addr(addr)
    }

    async fn dial_and_handshake(&self, addr: &str) -> anyhow::Result<Version> {
        let mut client = connect(addr).await?;
        let response = client
            .handshake(Request::new(self.local_version()))
            .await?
            .into_inner();
        self.peers.add(client, response.clone());
        Ok(response)
    }

    /// Sends `tx` to every connected peer. Failures are logged and otherwise
    /// ignored; gossip is best-effort.
    pub async fn broadcast(&self, tx: Transaction) {
        for mut client in self.peers.clients() {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(err) = client.handle_tx(Request::new(tx)).await {
                    tracing::warn!(error = %err, "broadcast to peer failed");
                }
            });
        }
    }
}

pub(crate) async fn connect(addr: &str) -> anyhow::Result<NodeClient<Channel>> {
    let endpoint = Endpoint::from_shared(format!("http://{addr}"))?;
    let channel = endpoint.connect().await?;
    Ok(NodeClient::new(channel))
}
