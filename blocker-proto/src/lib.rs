//! Wire schema for the node, generated from `proto/node.proto` by
//! `tonic-build`. The generated protobuf encoding doubles as the
//! canonical byte encoding used for hashing (see `blocker-envelope`).

pub mod proto {
    tonic::include_proto!("blocker");
}

pub use proto::{Ack, Block, Header, Transaction, TxInput, TxOutput, Version};
pub use proto::node_client::NodeClient;
pub use proto::node_server::{Node, NodeServer};

/// Re-exported so downstream crates can call `.encode_to_vec()` on the
/// generated types without depending on `prost` directly.
pub use prost::Message;
