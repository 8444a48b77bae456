//! Google Cloud KMS-backed signer.
//!
//! Enabled with the `gcp` crate feature. `Key::name` must carry the full
//! CryptoKeyVersion resource path, e.g.
//! `projects/P/locations/L/keyRings/R/cryptoKeys/K/cryptoKeyVersions/1`.

use async_trait::async_trait;
use google_cloud_kms::client::{Client, ClientConfig};
use google_cloud_kms::grpc::kms::v1::{digest as gdigest, AsymmetricSignRequest, Digest};
use tracing::info;

use bakergate_protocol::base58::Curve;
use bakergate_protocol::{hash, Key};

use crate::der::to_raw_signature;
use crate::{Signer, SignerError};

pub struct GcpKmsSigner {
    client: Client,
}

impl GcpKmsSigner {
    /// Connect using the default application credential chain.
    pub async fn connect() -> Result<Self, SignerError> {
        let config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| SignerError::Backend(e.to_string()))?;
        let client = Client::new(config)
            .await
            .map_err(|e| SignerError::Backend(e.to_string()))?;
        info!(target: "signer", "connected to Cloud KMS");
        Ok(Self { client })
    }
}

#[async_trait]
impl Signer for GcpKmsSigner {
    async fn sign(&self, message: &[u8], key: &Key) -> Result<Vec<u8>, SignerError> {
        let request = match key.curve {
            // Ed25519 key versions consume the message itself.
            Curve::Ed25519 => AsymmetricSignRequest {
                name: key.name.clone(),
                data: message.to_vec(),
                ..Default::default()
            },
            // ECDSA key versions consume a 32-byte digest. The service only
            // checks the length, so the Blake2b digest rides in the SHA-256
            // slot.
            Curve::Secp256k1 | Curve::P256 => AsymmetricSignRequest {
                name: key.name.clone(),
                digest: Some(Digest {
                    digest: Some(gdigest::Digest::Sha256(
                        hash::operation_digest(message).to_vec(),
                    )),
                }),
                ..Default::default()
            },
        };
        let response = self
            .client
            .asymmetric_sign(request, None)
            .await
            .map_err(|e| SignerError::Backend(e.to_string()))?;
        to_raw_signature(key.curve, &response.signature)
    }
}
