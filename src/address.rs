//! secp256k1 key pairs, public-key hashes and checksummed addresses

use crate::constants::DEFAULT_NETWORK_ID;
use crate::conversions::{bytes_to_hex, encode_base58_bytes, hex_to_bytes, pk_hash, pk_hash_address, sha256};
use crate::error::AddressError;
use crate::types::Hash160;
use secp256k1::{ecdsa::Signature, Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;

/// A key pair, or a bare public key when only verification is needed
#[derive(Clone, PartialEq, Eq)]
pub struct Address {
    private_key: Option<SecretKey>,
    public_key: PublicKey,
}

impl Address {
    /// Fresh random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (private_key, public_key) = secp.generate_keypair(&mut secp256k1::rand::thread_rng());
        Self {
            private_key: Some(private_key),
            public_key,
        }
    }

    /// Rebuild a key pair from a hex private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, AddressError> {
        let bytes = hex_to_bytes(private_key_hex)
            .map_err(|e| AddressError::InvalidPrivateKey(e.to_string()))?;
        let private_key = SecretKey::from_slice(&bytes)
            .map_err(|e| AddressError::InvalidPrivateKey(e.to_string()))?;
        let secp = Secp256k1::new();
        Ok(Self {
            public_key: PublicKey::from_secret_key(&secp, &private_key),
            private_key: Some(private_key),
        })
    }

    /// Verification-only address from a hex SEC1 public key
    pub fn from_public_key(public_key_hex: &str) -> Result<Self, AddressError> {
        let bytes = hex_to_bytes(public_key_hex)
            .map_err(|e| AddressError::InvalidPublicKey(e.to_string()))?;
        Self::from_public_key_bytes(&bytes)
    }

    pub fn from_public_key_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let public_key = PublicKey::from_slice(bytes)
            .map_err(|e| AddressError::InvalidPublicKey(e.to_string()))?;
        Ok(Self {
            private_key: None,
            public_key,
        })
    }

    /// Uncompressed 65-byte SEC1 encoding
    pub fn public_key(&self) -> [u8; 65] {
        self.public_key.serialize_uncompressed()
    }

    pub fn public_key_hex(&self) -> String {
        bytes_to_hex(&self.public_key())
    }

    pub fn private_key_hex(&self) -> Option<String> {
        self.private_key.map(|key| bytes_to_hex(&key.secret_bytes()))
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    pub fn public_key_hash(&self) -> Hash160 {
        pk_hash(&self.public_key())
    }

    /// network_id || hash160(public key) || checksum
    pub fn public_address(&self, network_id: u8) -> Vec<u8> {
        pk_hash_address(&self.public_key(), network_id)
    }

    /// Base58 rendering of the default-network address
    pub fn public_address_base58(&self) -> String {
        encode_base58_bytes(&self.public_address(DEFAULT_NETWORK_ID))
    }

    /// DER-encoded ECDSA signature over SHA-256(message)
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, AddressError> {
        let private_key = self.private_key.as_ref().ok_or(AddressError::MissingPrivateKey)?;
        let secp = Secp256k1::new();
        let digest = Message::from_digest(sha256(message));
        Ok(secp.sign_ecdsa(&digest, private_key).serialize_der().to_vec())
    }

    /// A mismatched or malformed signature is `false`, never an error
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let signature = match Signature::from_der(signature) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let secp = Secp256k1::verification_only();
        let digest = Message::from_digest(sha256(message));
        secp.verify_ecdsa(&digest, &signature, &self.public_key).is_ok()
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Address")
            .field("public_key", &self.public_key_hex())
            .field("has_private_key", &self.has_private_key())
            .finish()
    }
}
