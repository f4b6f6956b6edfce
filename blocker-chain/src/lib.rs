//! The chain state machine: header list, genesis construction, block and
//! transaction validation, and state application against the UTXO set.

mod header_list;

use blocker_crypto::PrivateKey;
use blocker_envelope::{hash_block, hash_header, hash_transaction, sign_block, verify_block, verify_merkle_root, verify_transaction};
use blocker_proto::{Block, Header, Transaction, TxOutput};
use blocker_store::{utxo_key, BlockStore, TxStore, Utxo, UtxoStore};
use header_list::HeaderList;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Fixed seed for the genesis signer. Must stay a compile-time constant so
/// every node derives the same genesis block.
const GENESIS_SEED_HEX: &str =
    "b72a9caf5a5c5e6b88ee6f25f053d07b43ddc263a034e2b8e7175e558c18a6ed";
const GENESIS_REWARD: u64 = 123;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("bad block signature")]
    BadBlockSignature,
    #[error("bad previous hash")]
    BadPrevHash,
    #[error("bad transaction signature")]
    BadTxSignature,
    #[error("unknown utxo")]
    UnknownUtxo,
    #[error("double spend")]
    DoubleSpend,
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("not found")]
    NotFound,
    #[error("height {requested} out of range (tip is {tip})")]
    OutOfRange { requested: i32, tip: i32 },
    #[error("internal state corrupt: {0}")]
    InternalStateCorrupt(String),
}

pub struct Chain {
    headers: RwLock<HeaderList>,
    write_lock: Mutex<()>,
    block_store: Arc<dyn BlockStore>,
    tx_store: Arc<dyn TxStore>,
    utxo_store: Arc<dyn UtxoStore>,
}

impl Chain {
    /// Builds the genesis block from the fixed seed and applies it,
    /// bypassing validation.
    pub fn new(
        block_store: Arc<dyn BlockStore>,
        tx_store: Arc<dyn TxStore>,
        utxo_store: Arc<dyn UtxoStore>,
    ) -> Self {
        let chain = Self {
            headers: RwLock::new(HeaderList::new()),
            write_lock: Mutex::new(()),
            block_store,
            tx_store,
            utxo_store,
        };
        let genesis = genesis_block();
        chain
            .apply_block(&genesis)
            .expect("genesis block is a fixed constant and always applies");
        chain
    }

    pub fn height(&self) -> i32 {
        self.headers.read().height()
    }

    /// Validates `block` against the current tip and, on success, applies
    /// it. Single-writer: concurrent callers serialize on an internal lock.
    pub fn add_block(&self, block: Block) -> Result<(), ChainError> {
        let _guard = self.write_lock.lock();
        self.validate_block(&block)?;
        self.apply_block(&block)
    }

    pub fn validate_block(&self, block: &Block) -> Result<(), ChainError> {
        if !verify_block(block) || !verify_merkle_root(block) {
            return Err(ChainError::BadBlockSignature);
        }
        let current = self.get_block_by_height(self.height())?;
        let current_hash = hash_block(&current);
        let prev_hash = block
            .header
            .as_ref()
            .map(|h| h.prev_hash.clone())
            .unwrap_or_default();
        if current_hash.as_slice() != prev_hash.as_slice() {
            return Err(ChainError::BadPrevHash);
        }
        for tx in &block.transactions {
            self.validate_transaction(tx)?;
        }
        Ok(())
    }

    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), ChainError> {
        match verify_transaction(tx) {
            Ok(true) => {}
            _ => return Err(ChainError::BadTxSignature),
        }
        let mut sum_inputs: u64 = 0;
        for input in &tx.inputs {
            let key = utxo_key(&hex::encode(&input.prev_tx_hash), input.prev_out_index);
            let utxo = self.utxo_store.get(&key).ok_or(ChainError::UnknownUtxo)?;
            if utxo.spent {
                return Err(ChainError::DoubleSpend);
            }
            sum_inputs = sum_inputs.saturating_add(utxo.amount);
        }
        let sum_outputs: u64 = tx.outputs.iter().map(|o| o.amount).sum();
        if sum_inputs < sum_outputs {
            return Err(ChainError::InsufficientBalance);
        }
        Ok(())
    }

    fn apply_block(&self, block: &Block) -> Result<(), ChainError> {
        let header = block
            .header
            .clone()
            .ok_or_else(|| ChainError::InternalStateCorrupt("block has no header".into()))?;
        self.headers.write().add(header);

        for tx in &block.transactions {
            self.tx_store.put(tx.clone());
            let tx_hash_hex = hex::encode(hash_transaction(tx));
            for (out_index, output) in tx.outputs.iter().enumerate() {
                self.utxo_store.put(Utxo {
                    tx_hash: tx_hash_hex.clone(),
                    out_index: out_index as u32,
                    amount: output.amount,
                    spent: false,
                });
            }
            for input in &tx.inputs {
                let key = utxo_key(&hex::encode(&input.prev_tx_hash), input.prev_out_index);
                let mut utxo = self.utxo_store.get(&key).ok_or_else(|| {
                    ChainError::InternalStateCorrupt(format!("missing utxo for input {key}"))
                })?;
                utxo.spent = true;
                self.utxo_store.put(utxo);
            }
        }

        self.block_store.put(block.clone());
        Ok(())
    }

    pub fn get_block_by_hash(&self, hash: &[u8]) -> Result<Block, ChainError> {
        self.block_store
            .get(&hex::encode(hash))
            .ok_or(ChainError::NotFound)
    }

    pub fn get_block_by_height(&self, height: i32) -> Result<Block, ChainError> {
        let tip = self.height();
        if height > tip {
            return Err(ChainError::OutOfRange {
                requested: height,
                tip,
            });
        }
        let header = {
            let headers = self.headers.read();
            headers.get(height).cloned()
        }
        .ok_or(ChainError::NotFound)?;
        self.get_block_by_hash(&hash_header(&header))
    }
}

fn genesis_block() -> Block {
    let key = PrivateKey::from_hex(GENESIS_SEED_HEX).expect("genesis seed is a valid 32-byte hex constant");
    let address = key.public_key().address();
    let tx = Transaction {
        version: 1,
        inputs: vec![],
        outputs: vec![TxOutput {
            amount: GENESIS_REWARD,
            address: address.to_vec(),
        }],
    };
    let mut block = Block {
        header: Some(Header {
            version: 1,
            height: 0,
            prev_hash: vec![0u8; 32],
            root_hash: vec![],
            timestamp: now_secs(),
        }),
        public_key: vec![],
        signature: vec![],
        transactions: vec![tx],
    };
    sign_block(&key, &mut block);
    block
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Builds the header for a block extending `prev`. The caller sets
/// `transactions` and calls [`blocker_envelope::sign_block`], which fills in
/// `root_hash` before signing.
pub fn next_block_header(prev: &Header) -> Header {
    Header {
        version: 1,
        height: prev.height + 1,
        prev_hash: hash_header(prev).to_vec(),
        root_hash: vec![],
        timestamp: now_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocker_envelope::sign_transaction;
    use blocker_proto::TxInput;
    use blocker_store::{MemoryBlockStore, MemoryTxStore, MemoryUtxoStore};

    fn fresh_chain() -> Chain {
        Chain::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(MemoryTxStore::new()),
            Arc::new(MemoryUtxoStore::new()),
        )
    }

    fn signed_block(prev_header: &Header, transactions: Vec<Transaction>, key: &PrivateKey) -> Block {
        let header = next_block_header(prev_header);
        let mut block = Block {
            header: Some(header),
            public_key: vec![],
            signature: vec![],
            transactions,
        };
        sign_block(key, &mut block);
        block
    }

    #[test]
    fn genesis_chain_has_height_zero_and_123_to_seed_address() {
        let chain = fresh_chain();
        assert_eq!(chain.height(), 0);
        let genesis = chain.get_block_by_height(0).unwrap();
        assert_eq!(genesis.transactions.len(), 1);
        let key = PrivateKey::from_hex(GENESIS_SEED_HEX).unwrap();
        let expected_addr = key.public_key().address().to_vec();
        assert_eq!(genesis.transactions[0].outputs[0].amount, GENESIS_REWARD);
        assert_eq!(genesis.transactions[0].outputs[0].address, expected_addr);
    }

    #[test]
    fn appending_one_hundred_blocks_is_monotonic_and_inclusive() {
        let chain = fresh_chain();
        for i in 1..=100i32 {
            let tip_header = chain.get_block_by_height(chain.height()).unwrap().header.unwrap();
            let key = PrivateKey::generate();
            let block = signed_block(&tip_header, vec![], &key);
            chain.add_block(block.clone()).unwrap();
            assert_eq!(chain.height(), i);
            assert_eq!(chain.get_block_by_hash(&hash_block(&block)).unwrap(), block);
            assert_eq!(chain.get_block_by_height(i).unwrap(), block);
        }
    }

    #[test]
    fn valid_spend_creates_unspent_outputs_and_marks_input_spent() {
        let chain = fresh_chain();
        let genesis = chain.get_block_by_height(0).unwrap();
        let genesis_tx = &genesis.transactions[0];
        let genesis_tx_hash = hex::encode(hash_transaction(genesis_tx));

        let sender = PrivateKey::from_hex(GENESIS_SEED_HEX).unwrap();
        let receiver = PrivateKey::generate();

        let mut spend = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: hex::decode(&genesis_tx_hash).unwrap(),
                prev_out_index: 0,
                pub_key: sender.public_key().to_bytes().to_vec(),
                signature: vec![],
            }],
            outputs: vec![
                TxOutput {
                    amount: 100,
                    address: receiver.public_key().address().to_vec(),
                },
                TxOutput {
                    amount: 23,
                    address: sender.public_key().address().to_vec(),
                },
            ],
        };
        let sig = sign_transaction(&sender, &spend);
        spend.inputs[0].signature = sig.to_bytes().to_vec();

        let proposer = PrivateKey::generate();
        let block = signed_block(&genesis.header.clone().unwrap(), vec![spend.clone()], &proposer);
        chain.add_block(block).unwrap();

        let spend_hash = hex::encode(hash_transaction(&spend));
        assert_eq!(chain.height(), 1);

        // A follow-up spend of output 0 only validates if it is still unspent.
        let mut follow_up = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: hex::decode(&spend_hash).unwrap(),
                prev_out_index: 0,
                pub_key: receiver.public_key().to_bytes().to_vec(),
                signature: vec![],
            }],
            outputs: vec![TxOutput {
                amount: 100,
                address: receiver.public_key().address().to_vec(),
            }],
        };
        let sig2 = sign_transaction(&receiver, &follow_up);
        follow_up.inputs[0].signature = sig2.to_bytes().to_vec();
        chain.validate_transaction(&follow_up).expect("output 0 should be unspent");
    }

    #[test]
    fn insufficient_balance_is_rejected() {
        let chain = fresh_chain();
        let genesis = chain.get_block_by_height(0).unwrap();
        let genesis_tx = &genesis.transactions[0];
        let genesis_tx_hash = hex::encode(hash_transaction(genesis_tx));

        let sender = PrivateKey::from_hex(GENESIS_SEED_HEX).unwrap();
        let mut spend = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_tx_hash: hex::decode(&genesis_tx_hash).unwrap(),
                prev_out_index: 0,
                pub_key: sender.public_key().to_bytes().to_vec(),
                signature: vec![],
            }],
            outputs: vec![TxOutput {
                amount: 124,
                address: sender.public_key().address().to_vec(),
            }],
        };
        let sig = sign_transaction(&sender, &spend);
        spend.inputs[0].signature = sig.to_bytes().to_vec();

        let proposer = PrivateKey::generate();
        let block = signed_block(&genesis.header.clone().unwrap(), vec![spend], &proposer);
        assert_eq!(chain.add_block(block).unwrap_err(), ChainError::InsufficientBalance);
    }

    #[test]
    fn reorg_to_a_non_tip_ancestor_is_rejected() {
        let chain = fresh_chain();
        let genesis_header = chain.get_block_by_height(0).unwrap().header.unwrap();
        let key = PrivateKey::generate();
        let first = signed_block(&genesis_header, vec![], &key);
        chain.add_block(first.clone()).unwrap();

        // A second block also claiming genesis as its parent is stale once height is 1.
        let stale = signed_block(&genesis_header, vec![], &PrivateKey::generate());
        assert_eq!(chain.add_block(stale).unwrap_err(), ChainError::BadPrevHash);
    }
}
