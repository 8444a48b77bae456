use serde::{Deserialize, Serialize};

use crate::base58::Curve;

/// A signing key as the server sees it. The private material stays behind
/// the backend; this descriptor is everything the request pipeline needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    /// Opaque backend handle (KMS resource path, token label, …).
    pub name: String,
    /// base58check address, unique within a server.
    pub public_key_hash: String,
    /// base58check public key, returned to clients on GET.
    pub public_key: String,
    /// Curve of the underlying key; selects wire tags and prefixes.
    pub curve: Curve,
}
