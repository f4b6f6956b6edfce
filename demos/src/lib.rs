//! Empty crate root; this member exists to host `tests/` integration
//! scenarios that span multiple `blocker-*` crates, such as multi-node
//! bootstrap and gossip.
