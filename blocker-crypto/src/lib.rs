//! Ed25519 key material, signatures, and address derivation for the node.
//!
//! Fixed-length keys/signatures/addresses: a private key that signs, a
//! public key that derives an address from its trailing bytes, and a
//! signature that verifies.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const SIGNATURE_LEN: usize = 64;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const PRIVATE_KEY_LEN: usize = 64;
pub const ADDRESS_LEN: usize = 20;
pub const SEED_LEN: usize = 32;

pub type Address = [u8; ADDRESS_LEN];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid seed length: expected {SEED_LEN} bytes, got {0}")]
    InvalidSeedLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("invalid public key length: expected {PUBLIC_KEY_LEN} bytes, got {0}")]
    InvalidPublicKeyLength(usize),
    #[error("invalid signature length: expected {SIGNATURE_LEN} bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("invalid address length: expected {ADDRESS_LEN} bytes, got {0}")]
    InvalidAddressLength(usize),
}

#[derive(Clone, Debug)]
pub struct PrivateKey {
    signing: SigningKey,
}

impl PrivateKey {
    /// Draws 32 random bytes from a CSPRNG and expands them into a key pair.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        Self { signing }
    }

    /// Deterministic derivation from a 32-byte seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SEED_LEN] = seed
            .try_into()
            .map_err(|_| CryptoError::InvalidSeedLength(seed.len()))?;
        Ok(Self {
            signing: SigningKey::from_bytes(&arr),
        })
    }

    /// Hex-decodes `s` and derives via [`PrivateKey::from_seed`].
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        Self::from_seed(&bytes)
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        let sig = self.signing.sign(msg);
        Signature(sig.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key())
    }

    /// The 64-byte seed||public-key encoding used by Go's `crypto/ed25519.PrivateKey`.
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        self.signing.to_keypair_bytes()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; PUBLIC_KEY_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKeyLength(bytes.len()))?;
        let verifying = VerifyingKey::from_bytes(&arr)
            .map_err(|_| CryptoError::InvalidPublicKeyLength(bytes.len()))?;
        Ok(Self(verifying))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.to_bytes()
    }

    /// Last 20 bytes of the 32-byte public key.
    pub fn address(&self) -> Address {
        let bytes = self.0.to_bytes();
        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(&bytes[PUBLIC_KEY_LEN - ADDRESS_LEN..]);
        addr
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        self.0
    }

    pub fn verify(&self, pk: &PublicKey, msg: &[u8]) -> bool {
        let sig = ed25519_dalek::Signature::from_bytes(&self.0);
        pk.0.verify(msg, &sig).is_ok()
    }
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

pub fn address_from_hex(s: &str) -> Result<Address, CryptoError> {
    let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidAddressLength(bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_round_trip_is_deterministic() {
        let seed = [7u8; SEED_LEN];
        let addr1 = PrivateKey::from_seed(&seed).unwrap().public_key().address();
        let addr2 = PrivateKey::from_seed(&seed).unwrap().public_key().address();
        assert_eq!(addr1, addr2);
        assert_eq!(addr1.len(), ADDRESS_LEN);
    }

    #[test]
    fn rejects_wrong_length_seed() {
        let err = PrivateKey::from_seed(&[0u8; 31]).unwrap_err();
        assert_eq!(err, CryptoError::InvalidSeedLength(31));
    }

    #[test]
    fn rejects_bad_hex() {
        let err = PrivateKey::from_hex("not-hex").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidHex(_)));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let key = PrivateKey::generate();
        let msg = b"a transaction body";
        let sig = key.sign(msg);
        assert!(sig.verify(&key.public_key(), msg));
    }

    #[test]
    fn verification_fails_for_wrong_message_or_key() {
        let key = PrivateKey::generate();
        let other = PrivateKey::generate();
        let msg = b"message";
        let sig = key.sign(msg);
        assert!(!sig.verify(&key.public_key(), b"different message"));
        assert!(!sig.verify(&other.public_key(), msg));
    }

    #[test]
    fn known_seed_derives_known_address() {
        let seed = hex::decode(
            "d9822b1297a81035af59e88f40cc26d12d9ed77314d2c0ebac1b83f12d34d36c",
        )
        .unwrap();
        let addr = PrivateKey::from_seed(&seed).unwrap().public_key().address();
        assert_eq!(address_to_hex(&addr), "156577acbd7ebc143352a1dcf4098db5d2fa1b31");
    }

    #[test]
    fn address_hex_round_trips() {
        let addr = PrivateKey::generate().public_key().address();
        let s = address_to_hex(&addr);
        assert_eq!(address_from_hex(&s).unwrap(), addr);
    }
}
