//! Signature normalization for custody backends.

use bakergate_protocol::base58::Curve;

use crate::SignerError;

/// Length of the raw `R ‖ S` (or Ed25519) signature the ledger expects.
pub(crate) const RAW_SIGNATURE_LEN: usize = 64;

/// Convert a backend signature into the fixed 64-byte form.
///
/// ECDSA backends answer ASN.1 DER; the conversion strips the wrapper and
/// left-pads each scalar to 32 bytes. Ed25519 backends already answer raw
/// bytes. Anything that does not come out at exactly 64 bytes is refused.
pub(crate) fn to_raw_signature(curve: Curve, bytes: &[u8]) -> Result<Vec<u8>, SignerError> {
    let raw = match curve {
        Curve::Ed25519 => bytes.to_vec(),
        Curve::Secp256k1 => k256::ecdsa::Signature::from_der(bytes)
            .map_err(|e| SignerError::MalformedSignature(e.to_string()))?
            .to_bytes()
            .to_vec(),
        Curve::P256 => p256::ecdsa::Signature::from_der(bytes)
            .map_err(|e| SignerError::MalformedSignature(e.to_string()))?
            .to_bytes()
            .to_vec(),
    };
    if raw.len() != RAW_SIGNATURE_LEN {
        return Err(SignerError::MalformedSignature(format!(
            "{} bytes, expected {RAW_SIGNATURE_LEN}",
            raw.len()
        )));
    }
    Ok(raw)
}
