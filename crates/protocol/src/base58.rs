//! Base58check encoding for addresses, public keys and signatures.
//!
//! The encoded form is `base58(prefix ‖ payload ‖ checksum)` where the
//! checksum is the first four bytes of `SHA256(SHA256(prefix ‖ payload))`,
//! over the Bitcoin alphabet. The prefix constants below are the single
//! source of truth for the curve ↔ prefix coupling; nothing else in the
//! workspace carries literal prefix bytes.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ProtocolError;

/// Typed base58check prefixes.
pub mod prefix {
    /// `tz1` — Ed25519 public key hash.
    pub const ED25519_PUBLIC_KEY_HASH: &[u8] = &[0x06, 0xa1, 0x9f];
    /// `tz2` — Secp256k1 public key hash.
    pub const SECP256K1_PUBLIC_KEY_HASH: &[u8] = &[0x06, 0xa1, 0xa1];
    /// `tz3` — P-256 public key hash.
    pub const P256_PUBLIC_KEY_HASH: &[u8] = &[0x06, 0xa1, 0xa4];
    /// `KT1` — originated contract hash.
    pub const ORIGINATED_CONTRACT_HASH: &[u8] = &[0x02, 0x5a, 0x79];

    /// `edpk` — Ed25519 public key.
    pub const ED25519_PUBLIC_KEY: &[u8] = &[0x0d, 0x0f, 0x25, 0xd9];
    /// `sppk` — Secp256k1 public key.
    pub const SECP256K1_PUBLIC_KEY: &[u8] = &[0x03, 0xfe, 0xe2, 0x56];
    /// `p2pk` — P-256 public key.
    pub const P256_PUBLIC_KEY: &[u8] = &[0x03, 0xb2, 0x8b, 0x7f];

    /// `edsig` — Ed25519 signature.
    pub const ED25519_SIGNATURE: &[u8] = &[0x09, 0xf5, 0xcd, 0x86, 0x12];
    /// `spsig1` — Secp256k1 signature.
    pub const SECP256K1_SIGNATURE: &[u8] = &[0x0d, 0x73, 0x65, 0x13, 0x3f];
    /// `p2sig` — P-256 signature.
    pub const P256_SIGNATURE: &[u8] = &[0x36, 0xf0, 0x2c, 0x34];
}

/// Length of the public key hash carried inside an address.
pub const PKH_LEN: usize = 20;
/// Length of an address's on-wire slot: a one-byte tag plus the hash.
pub const WIRE_PKH_LEN: usize = 21;

/// The signature curves the gateway can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Ed25519,
    Secp256k1,
    P256,
}

impl Curve {
    /// Prefix for the base58check form of this curve's public key hashes.
    pub fn public_key_hash_prefix(self) -> &'static [u8] {
        match self {
            Curve::Ed25519 => prefix::ED25519_PUBLIC_KEY_HASH,
            Curve::Secp256k1 => prefix::SECP256K1_PUBLIC_KEY_HASH,
            Curve::P256 => prefix::P256_PUBLIC_KEY_HASH,
        }
    }

    /// Prefix for the base58check form of this curve's public keys.
    pub fn public_key_prefix(self) -> &'static [u8] {
        match self {
            Curve::Ed25519 => prefix::ED25519_PUBLIC_KEY,
            Curve::Secp256k1 => prefix::SECP256K1_PUBLIC_KEY,
            Curve::P256 => prefix::P256_PUBLIC_KEY,
        }
    }

    /// Prefix for the base58check form of this curve's signatures.
    pub fn signature_prefix(self) -> &'static [u8] {
        match self {
            Curve::Ed25519 => prefix::ED25519_SIGNATURE,
            Curve::Secp256k1 => prefix::SECP256K1_SIGNATURE,
            Curve::P256 => prefix::P256_SIGNATURE,
        }
    }

    /// One-byte tag used for this curve in 21-byte on-wire address slots.
    pub fn wire_tag(self) -> u8 {
        match self {
            Curve::Ed25519 => 0x00,
            Curve::Secp256k1 => 0x01,
            Curve::P256 => 0x02,
        }
    }
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let inner = Sha256::digest(data);
    let outer = Sha256::digest(inner);
    let mut out = [0u8; 4];
    out.copy_from_slice(&outer[..4]);
    out
}

/// Encode `prefix ‖ payload` with its checksum.
pub fn encode(prefix: &[u8], payload: &[u8]) -> String {
    let mut data = Vec::with_capacity(prefix.len() + payload.len() + 4);
    data.extend_from_slice(prefix);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum(&data));
    bs58::encode(data).into_string()
}

/// Decode a base58check string, validating both the expected prefix and the
/// checksum. Returns the bare payload.
pub fn decode(prefix: &[u8], encoded: &str) -> Result<Vec<u8>, ProtocolError> {
    let data = bs58::decode(encoded)
        .into_vec()
        .map_err(|_| ProtocolError::BadAddress(encoded.to_string()))?;
    if data.len() < prefix.len() + 4 || !data.starts_with(prefix) {
        return Err(ProtocolError::BadAddress(encoded.to_string()));
    }
    let (body, tail) = data.split_at(data.len() - 4);
    if checksum(body) != tail {
        return Err(ProtocolError::BadAddress(encoded.to_string()));
    }
    Ok(body[prefix.len()..].to_vec())
}

/// Convert an address string into the 21-byte slot it occupies on the wire.
///
/// Implicit accounts carry `curve_tag ‖ hash`; originated contracts carry
/// `hash ‖ 0x00` (the leading contract tag of the destination slot is
/// consumed by the operation parser, leaving the hash and its padding byte).
pub fn address_to_wire(address: &str) -> Result<Vec<u8>, ProtocolError> {
    for curve in [Curve::Ed25519, Curve::Secp256k1, Curve::P256] {
        if let Ok(hash) = decode(curve.public_key_hash_prefix(), address) {
            if hash.len() != PKH_LEN {
                return Err(ProtocolError::BadAddress(address.to_string()));
            }
            let mut wire = Vec::with_capacity(WIRE_PKH_LEN);
            wire.push(curve.wire_tag());
            wire.extend_from_slice(&hash);
            return Ok(wire);
        }
    }
    if let Ok(hash) = decode(prefix::ORIGINATED_CONTRACT_HASH, address) {
        if hash.len() != PKH_LEN {
            return Err(ProtocolError::BadAddress(address.to_string()));
        }
        let mut wire = Vec::with_capacity(WIRE_PKH_LEN);
        wire.extend_from_slice(&hash);
        wire.push(0x00);
        return Ok(wire);
    }
    Err(ProtocolError::BadAddress(address.to_string()))
}
