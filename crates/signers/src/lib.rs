//! Key-custody backends.
//!
//! Every backend implements the one-method [`Signer`] capability; the
//! gateway never sees key material, only signature bytes. Backends decide
//! for themselves whether they consume the raw operation bytes (Ed25519
//! signs the message directly) or a Blake2b-256 digest of them (the KMS
//! asymmetric-sign path).

use async_trait::async_trait;
use thiserror::Error;

use bakergate_protocol::Key;

pub mod memory;

#[cfg(feature = "gcp")]
mod der;
#[cfg(feature = "gcp")]
pub mod gcp;

/// Errors surfaced by a signing backend. The gateway logs these and maps
/// them to an opaque 500 for the client.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The requested key is not held by this backend.
    #[error("key '{0}' is not held by this signer")]
    UnknownKey(String),
    /// The backend refused or failed the signing call.
    #[error("signing backend failed: {0}")]
    Backend(String),
    /// The backend answered with bytes that are not a usable signature.
    #[error("backend returned a malformed signature: {0}")]
    MalformedSignature(String),
}

/// The signing capability.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `message` — the raw operation bytes, magic byte included —
    /// under the key described by `key`. Returns the raw 64-byte signature.
    ///
    /// Cancelling the calling task cancels the backend call; no state is
    /// shared with the policy layer from here down.
    async fn sign(&self, message: &[u8], key: &Key) -> Result<Vec<u8>, SignerError>;
}
