use blocker_proto::{NodeClient, Version};
use parking_lot::RwLock;
use tonic::transport::Channel;

/// Connected peers and the handshake record each one last reported.
/// A linear scan is fine at node-network scale; a slice of peers avoids
/// reaching for a map keyed by something a peer could spoof.
#[derive(Default)]
pub struct PeerSet {
    peers: RwLock<Vec<(NodeClient<Channel>, Version)>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `version`'s peer unless one with the same `listen_addr` is
    /// already present. The check and the insert happen under the same
    /// write lock so two concurrent adds for the same address (an inbound
    /// handshake racing an outbound bootstrap dial, say) can't both win.
    /// Returns whether the peer was newly added.
    pub fn add(&self, client: NodeClient<Channel>, version: Version) -> bool {
        let mut peers = self.peers.write();
        if peers.iter().any(|(_, v)| v.listen_addr == version.listen_addr) {
            return false;
        }
        peers.push((client, version));
        true
    }

    pub fn contains_addr(&self, addr: &str) -> bool {
        self.peers
            .read()
            .iter()
            .any(|(_, v)| v.listen_addr == addr)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.peers.read().iter().map(|(_, v)| v.listen_addr.clone()).collect()
    }

    pub fn clients(&self) -> Vec<NodeClient<Channel>> {
        self.peers.read().iter().map(|(c, _)| c.clone()).collect()
    }
}
