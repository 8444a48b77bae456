//! In-memory Ed25519 signer.
//!
//! Holds the private key in process memory and is therefore only suitable
//! for development and tests. Production deployments use a custody backend.

use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use bakergate_protocol::base58::{self, Curve};
use bakergate_protocol::{hash, Key};

use crate::{Signer, SignerError};

pub struct InMemorySigner {
    signing_key: SigningKey,
    public_key_hash: String,
}

impl InMemorySigner {
    /// Build a signer from a raw 32-byte seed. The address is derived from
    /// the public key, not taken on trust from configuration.
    pub fn from_seed(seed: Zeroizing<[u8; 32]>) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let digest = hash::public_key_hash(signing_key.verifying_key().as_bytes());
        let public_key_hash = base58::encode(Curve::Ed25519.public_key_hash_prefix(), &digest);
        Self {
            signing_key,
            public_key_hash,
        }
    }

    /// Generate a fresh random key.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        let digest = hash::public_key_hash(signing_key.verifying_key().as_bytes());
        let public_key_hash = base58::encode(Curve::Ed25519.public_key_hash_prefix(), &digest);
        Self {
            signing_key,
            public_key_hash,
        }
    }

    pub fn public_key_hash(&self) -> &str {
        &self.public_key_hash
    }

    /// base58check form of the public key, as published on key lookup.
    pub fn public_key(&self) -> String {
        base58::encode(
            Curve::Ed25519.public_key_prefix(),
            self.signing_key.verifying_key().as_bytes(),
        )
    }

    /// The key descriptor under which this signer registers with a server.
    pub fn key(&self) -> Key {
        Key {
            name: "in-memory".to_string(),
            public_key_hash: self.public_key_hash.clone(),
            public_key: self.public_key(),
            curve: Curve::Ed25519,
        }
    }
}

impl std::fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("public_key_hash", &self.public_key_hash)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for InMemorySigner {
    async fn sign(&self, message: &[u8], key: &Key) -> Result<Vec<u8>, SignerError> {
        if key.public_key_hash != self.public_key_hash {
            return Err(SignerError::UnknownKey(key.public_key_hash.clone()));
        }
        // Ed25519 hashes internally; the raw message is the right input.
        Ok(self.signing_key.sign(message).to_bytes().to_vec())
    }
}
