//! Blake2b digests used by the gateway.

use blake2::digest::consts::{U20, U32};
use blake2::{Blake2b, Digest};

/// 20-byte Blake2b digest of a raw public key; the payload of an address.
pub fn public_key_hash(public_key: &[u8]) -> [u8; 20] {
    let digest = Blake2b::<U20>::digest(public_key);
    digest.into()
}

/// 32-byte Blake2b digest of the operation bytes, consumed by signing
/// backends that expect a prehashed message.
pub fn operation_digest(operation: &[u8]) -> [u8; 32] {
    let digest = Blake2b::<U32>::digest(operation);
    digest.into()
}
