//! Storage interfaces and in-memory implementations for blocks,
//! transactions, and UTXOs. Each store owns its own lock; the
//! chain never holds more than one store's lock at a time.

use blocker_envelope::{hash_block, hash_transaction};
use blocker_proto::{Block, Transaction};
use parking_lot::RwLock;
use std::collections::HashMap;

/// An unspent (or since-spent) transaction output, keyed by
/// [`utxo_key`] in the UTXO store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub tx_hash: String,
    pub out_index: u32,
    pub amount: u64,
    pub spent: bool,
}

/// `"{tx_hash_hex}_{out_index}"`, the UTXO store's key format.
pub fn utxo_key(tx_hash_hex: &str, out_index: u32) -> String {
    format!("{tx_hash_hex}_{out_index}")
}

pub trait BlockStore: Send + Sync {
    fn put(&self, block: Block);
    fn get(&self, hex_hash: &str) -> Option<Block>;
}

pub trait TxStore: Send + Sync {
    fn put(&self, tx: Transaction);
    fn get(&self, hex_hash: &str) -> Option<Transaction>;
}

pub trait UtxoStore: Send + Sync {
    fn put(&self, utxo: Utxo);
    fn get(&self, key: &str) -> Option<Utxo>;
}

#[derive(Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<String, Block>>,
}

impl MemoryBlockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: Block) {
        let key = hex::encode(hash_block(&block));
        self.blocks.write().insert(key, block);
    }

    fn get(&self, hex_hash: &str) -> Option<Block> {
        self.blocks.read().get(hex_hash).cloned()
    }
}

#[derive(Default)]
pub struct MemoryTxStore {
    txs: RwLock<HashMap<String, Transaction>>,
}

impl MemoryTxStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TxStore for MemoryTxStore {
    fn put(&self, tx: Transaction) {
        let key = hex::encode(hash_transaction(&tx));
        self.txs.write().insert(key, tx);
    }

    fn get(&self, hex_hash: &str) -> Option<Transaction> {
        self.txs.read().get(hex_hash).cloned()
    }
}

#[derive(Default)]
pub struct MemoryUtxoStore {
    utxos: RwLock<HashMap<String, Utxo>>,
}

impl MemoryUtxoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UtxoStore for MemoryUtxoStore {
    fn put(&self, utxo: Utxo) {
        let key = utxo_key(&utxo.tx_hash, utxo.out_index);
        self.utxos.write().insert(key, utxo);
    }

    fn get(&self, key: &str) -> Option<Utxo> {
        self.utxos.read().get(key).cloned()
    }
}
