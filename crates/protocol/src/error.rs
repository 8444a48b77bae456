use thiserror::Error;

/// Errors produced while decoding request payloads or address strings.
///
/// All of these are client errors: the gateway refuses the request without
/// contacting a signing backend.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The request body was empty after unquoting.
    #[error("empty operation payload")]
    EmptyPayload,
    /// The leading magic byte is not a recognized payload family.
    #[error("unrecognized magic byte 0x{0:02x}")]
    UnknownMagicByte(u8),
    /// The body was not a double-quoted hex string.
    #[error("request body is not a quoted hex string")]
    BadQuoting,
    /// The quoted body contained invalid hex.
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    /// An address string failed base58check validation.
    #[error("bad address: {0}")]
    BadAddress(String),
    /// A block or endorsement payload is too short to carry the named field.
    #[error("payload too short to carry {0}")]
    Truncated(&'static str),
    /// A transaction payload whose fields cannot be laid out as declared.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(&'static str),
}
