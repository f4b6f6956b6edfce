//! The pending-transaction pool a node gossips and draws from when sealing
//! a block. Keyed by transaction hash so a retransmitted
//! transaction is a no-op rather than a duplicate entry.

use blocker_envelope::hash_transaction;
use blocker_proto::Transaction;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct Mempool {
    txs: RwLock<HashMap<String, Transaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `tx` if its hash isn't already present. Returns `true` if the
    /// transaction was newly added, `false` if it was already known. Check
    /// and insert happen under one write lock so concurrent callers can't
    /// both observe "not present" and both add it.
    pub fn add(&self, tx: Transaction) -> bool {
        let key = hex::encode(hash_transaction(&tx));
        let mut txs = self.txs.write();
        if txs.contains_key(&key) {
            return false;
        }
        txs.insert(key, tx);
        true
    }

    pub fn has(&self, hash_hex: &str) -> bool {
        self.txs.read().contains_key(hash_hex)
    }

    pub fn len(&self) -> usize {
        self.txs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.read().is_empty()
    }

    /// Drains and returns every pending transaction, leaving the pool empty.
    /// Called by the validator loop when it seals a block.
    pub fn clear(&self) -> Vec<Transaction> {
        std::mem::take(&mut *self.txs.write())
            .into_values()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocker_crypto::PrivateKey;
    use blocker_proto::{TxInput, TxOutput};

    fn sample_tx(amount: u64) -> Transaction {
        let owner = PrivateKey::generate();
        Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: vec![1u8; 32],
                prev_out_index: 0,
                pub_key: owner.public_key().to_bytes().to_vec(),
                signature: vec![],
            }],
            outputs: vec![TxOutput {
                amount,
                address: owner.public_key().address().to_vec(),
            }],
        }
    }

    #[test]
    fn adding_the_same_transaction_twice_is_a_no_op() {
        let pool = Mempool::new();
        let tx = sample_tx(10);
        assert!(pool.add(tx.clone()));
        assert!(!pool.add(tx));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn distinct_transactions_both_land_in_the_pool() {
        let pool = Mempool::new();
        assert!(pool.add(sample_tx(1)));
        assert!(pool.add(sample_tx(2)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn clear_drains_the_pool() {
        let pool = Mempool::new();
        pool.add(sample_tx(1));
        pool.add(sample_tx(2));
        let drained = pool.clear();
        assert_eq!(drained.len(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn has_reports_membership_by_hash() {
        let pool = Mempool::new();
        let tx = sample_tx(5);
        let key = hex::encode(hash_transaction(&tx));
        assert!(!pool.has(&key));
        pool.add(tx);
        assert!(pool.has(&key));
    }
}
