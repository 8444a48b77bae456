//! Startup configuration for `bakergated`.
//!
//! A single JSON file selects the custody backend, registers the key list
//! and fixes the policy. Everything here is read once; nothing is reloaded
//! at runtime.
//!
//! ```json
//! {
//!   "backend": { "type": "memory", "seed_env_var": "BAKERGATE_SEED" },
//!   "keys": [],
//!   "policy": { "enable_endorsement": true, "enable_block": true }
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use num_bigint::BigUint;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

use bakergate_policy::Policy;
use bakergate_protocol::{Key, ProtocolError};
use bakergate_signers::memory::InMemorySigner;
use bakergate_signers::Signer;

use crate::Gateway;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate key '{0}' in configuration")]
    DuplicateKey(String),
    #[error("no keys configured for this backend")]
    NoKeys,
    #[error(transparent)]
    BadAddress(#[from] ProtocolError),
    #[error("memory backend needs a seed, either inline or via an env var")]
    MissingSeed,
    #[error("invalid seed: {0}")]
    BadSeed(String),
    #[error("backend '{0}' is not compiled into this build")]
    BackendDisabled(&'static str),
    #[error("backend initialization failed: {0}")]
    Backend(String),
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    /// Key descriptors served by this instance. May be empty for the memory
    /// backend, which derives its own.
    #[serde(default)]
    pub keys: Vec<Key>,
    #[serde(default)]
    pub policy: PolicySection,
}

/// Which custody backend holds the private keys.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Plaintext Ed25519 seed held in process memory. Development only.
    Memory {
        #[serde(default)]
        seed_hex: Option<String>,
        #[serde(default)]
        seed_env_var: Option<String>,
    },
    /// Google Cloud KMS asymmetric keys; `Key::name` carries the resource
    /// path.
    Gcp,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PolicySection {
    pub enable_tx: bool,
    pub enable_endorsement: bool,
    pub enable_block: bool,
    pub enable_generic_nontx: bool,
    pub tx_whitelist_addresses: Vec<String>,
    pub tx_daily_max: Option<u64>,
}

impl PolicySection {
    fn into_policy(self) -> Policy {
        Policy {
            enable_tx: self.enable_tx,
            enable_endorsement: self.enable_endorsement,
            enable_block: self.enable_block,
            enable_generic_nontx: self.enable_generic_nontx,
            tx_whitelist_addresses: self.tx_whitelist_addresses,
            tx_daily_max: self.tx_daily_max.map(BigUint::from),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Assemble the server state: custody backend plus key list.
    pub async fn build(self) -> Result<Gateway, ConfigError> {
        let policy = self.policy.into_policy();
        let (signer, keys): (Arc<dyn Signer>, Vec<Key>) = match self.backend {
            BackendConfig::Memory {
                seed_hex,
                seed_env_var,
            } => {
                let signer = memory_signer(seed_hex, seed_env_var)?;
                warn!(target: "gateway", "using the in-memory signer — not for production");
                let keys = if self.keys.is_empty() {
                    vec![signer.key()]
                } else {
                    self.keys
                };
                (Arc::new(signer), keys)
            }
            #[cfg(feature = "gcp")]
            BackendConfig::Gcp => {
                if self.keys.is_empty() {
                    return Err(ConfigError::NoKeys);
                }
                let signer = bakergate_signers::gcp::GcpKmsSigner::connect()
                    .await
                    .map_err(|e| ConfigError::Backend(e.to_string()))?;
                (Arc::new(signer), self.keys)
            }
            #[cfg(not(feature = "gcp"))]
            BackendConfig::Gcp => return Err(ConfigError::BackendDisabled("gcp")),
        };
        Gateway::new(keys, policy, signer)
    }
}

fn memory_signer(
    seed_hex: Option<String>,
    seed_env_var: Option<String>,
) -> Result<InMemorySigner, ConfigError> {
    let seed_hex = match (seed_hex, seed_env_var) {
        (Some(inline), _) => Zeroizing::new(inline),
        (None, Some(var)) => {
            Zeroizing::new(std::env::var(&var).map_err(|_| ConfigError::MissingSeed)?)
        }
        (None, None) => return Err(ConfigError::MissingSeed),
    };
    let decoded = Zeroizing::new(
        hex::decode(seed_hex.trim()).map_err(|e| ConfigError::BadSeed(e.to_string()))?,
    );
    if decoded.len() != 32 {
        return Err(ConfigError::BadSeed(format!(
            "{} bytes, expected 32",
            decoded.len()
        )));
    }
    let mut seed = Zeroizing::new([0u8; 32]);
    seed.copy_from_slice(&decoded);
    Ok(InMemorySigner::from_seed(seed))
}
