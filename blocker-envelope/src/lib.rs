//! Signing and verification envelope for blocks and transactions: hashing,
//! the Merkle root over a block's transactions, and the blank-then-rehash
//! protocol transaction inputs use to sign without depending on their own
//! signature bytes.

use blocker_crypto::{sha256, PrivateKey, PublicKey, Signature};
use blocker_proto::{Block, Header, Message as _, Transaction};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("transaction input has no signature to verify")]
    MissingSignature,
}

/// SHA-256 of the header's canonical (protobuf) encoding.
pub fn hash_header(header: &Header) -> [u8; 32] {
    sha256(&header.encode_to_vec())
}

/// SHA-256 of the block's header encoding; the signature covers this hash.
pub fn hash_block(block: &Block) -> [u8; 32] {
    hash_header(&block.header.clone().unwrap_or_default())
}

/// SHA-256 of the transaction's canonical encoding, signatures included.
pub fn hash_transaction(tx: &Transaction) -> [u8; 32] {
    sha256(&tx.encode_to_vec())
}

/// Binary Merkle tree over transaction hashes; `None` for zero transactions.
/// An odd node at a level is paired with itself, matching the common
/// Merkle-tree convention used across the example repos this was grounded on.
pub fn merkle_root(transactions: &[Transaction]) -> Option<[u8; 32]> {
    if transactions.is_empty() {
        return None;
    }
    let mut level: Vec<[u8; 32]> = transactions.iter().map(hash_transaction).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            let mut buf = Vec::with_capacity(64);
            buf.extend_from_slice(&pair[0]);
            buf.extend_from_slice(pair.get(1).unwrap_or(&pair[0]));
            next.push(sha256(&buf));
        }
        level = next;
    }
    Some(level[0])
}

/// Sets `header.root_hash` (if the block has transactions) and signs the
/// resulting header hash with `key`, writing `public_key`/`signature`.
pub fn sign_block(key: &PrivateKey, block: &mut Block) {
    if !block.transactions.is_empty() {
        if let Some(root) = merkle_root(&block.transactions) {
            if let Some(header) = block.header.as_mut() {
                header.root_hash = root.to_vec();
            }
        }
    }
    let hash = hash_block(block);
    let sig = key.sign(&hash);
    block.public_key = key.public_key().to_bytes().to_vec();
    block.signature = sig.to_bytes().to_vec();
}

/// Checks `public_key`/`signature` length and the Ed25519 signature over
/// the header hash. Does not re-check `header.root_hash` against the
/// transaction list — callers that need that guarantee should additionally
/// call [`verify_merkle_root`].
pub fn verify_block(block: &Block) -> bool {
    let pk = match PublicKey::from_bytes(&block.public_key) {
        Ok(pk) => pk,
        Err(_) => return false,
    };
    let sig = match Signature::from_bytes(&block.signature) {
        Ok(sig) => sig,
        Err(_) => return false,
    };
    sig.verify(&pk, &hash_block(block))
}

/// Re-derives the Merkle root from `block.transactions` and compares it to
/// `block.header.root_hash`. A block with no transactions always passes;
/// the field is not checked in that case.
pub fn verify_merkle_root(block: &Block) -> bool {
    match merkle_root(&block.transactions) {
        None => true,
        Some(root) => block
            .header
            .as_ref()
            .map(|h| h.root_hash == root.to_vec())
            .unwrap_or(false),
    }
}

/// Returns `sign(hash_transaction(tx))`. The caller writes the resulting
/// signature into the input(s) it authorizes.
pub fn sign_transaction(key: &PrivateKey, tx: &Transaction) -> Signature {
    key.sign(&hash_transaction(tx))
}

/// Verifies every input's signature using the blank-then-rehash protocol:
/// for each input, its signature is cleared, the transaction is rehashed,
/// the signature is checked against that hash, then restored before moving
/// to the next input.
pub fn verify_transaction(tx: &Transaction) -> Result<bool, EnvelopeError> {
    let mut scratch = tx.clone();
    for i in 0..scratch.inputs.len() {
        let sig_bytes = scratch.inputs[i].signature.clone();
        if sig_bytes.is_empty() {
            return Err(EnvelopeError::MissingSignature);
        }
        let sig = match Signature::from_bytes(&sig_bytes) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };
        let pk = match PublicKey::from_bytes(&scratch.inputs[i].pub_key) {
            Ok(pk) => pk,
            Err(_) => return Ok(false),
        };
        scratch.inputs[i].signature = Vec::new();
        let hash = hash_transaction(&scratch);
        let ok = sig.verify(&pk, &hash);
        scratch.inputs[i].signature = sig_bytes;
        if !ok {
            return Ok(false);
        }
    }
    Ok(true)
}
