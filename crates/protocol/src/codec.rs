//! The ledger's request framing: operation bytes travel as a JSON string
//! whose value is the hex of the payload, e.g. `"03ab01…"`.

use crate::error::ProtocolError;

/// Strip the surrounding ASCII double quotes and decode the hex inside.
pub fn parse_quoted_hex(body: &str) -> Result<Vec<u8>, ProtocolError> {
    let inner = body
        .trim()
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or(ProtocolError::BadQuoting)?;
    let bytes = hex::decode(inner)?;
    if bytes.is_empty() {
        return Err(ProtocolError::EmptyPayload);
    }
    Ok(bytes)
}
