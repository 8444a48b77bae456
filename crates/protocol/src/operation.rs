//! The signable payload families and their watermark-relevant fields.

use crate::error::ProtocolError;

/// Magic byte of a block signing payload.
pub const MAGIC_BLOCK: u8 = 0x01;
/// Magic byte of an endorsement signing payload.
pub const MAGIC_ENDORSEMENT: u8 = 0x02;
/// Magic byte of a generic operation payload.
pub const MAGIC_GENERIC: u8 = 0x03;

/// Payload family selected by the leading magic byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicByte {
    Block,
    Endorsement,
    Generic,
}

/// Chain id and (level, round) coordinates of a block or endorsement.
///
/// This is the unit the watermark store orders on. The wire families carried
/// here do not encode a round, so it defaults to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPosition {
    pub chain_id: [u8; 4],
    pub level: u32,
    pub round: u32,
}

/// A decoded signing request payload: the magic byte plus the raw bytes.
///
/// Field-level parsing of generic operations lives in
/// [`crate::generic::GenericOperation`], which borrows from this value.
#[derive(Debug, Clone)]
pub struct Operation {
    bytes: Vec<u8>,
}

impl Operation {
    /// Wrap a decoded payload, refusing empty input and unknown families.
    pub fn parse(bytes: Vec<u8>) -> Result<Self, ProtocolError> {
        match bytes.first() {
            None => Err(ProtocolError::EmptyPayload),
            Some(&MAGIC_BLOCK | &MAGIC_ENDORSEMENT | &MAGIC_GENERIC) => Ok(Self { bytes }),
            Some(&other) => Err(ProtocolError::UnknownMagicByte(other)),
        }
    }

    pub fn magic_byte(&self) -> MagicByte {
        // parse() admits exactly these three values.
        match self.bytes[0] {
            MAGIC_BLOCK => MagicByte::Block,
            MAGIC_ENDORSEMENT => MagicByte::Endorsement,
            _ => MagicByte::Generic,
        }
    }

    /// The full payload, magic byte included. Offsets used by the generic
    /// parser are absolute into this slice.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Watermark coordinates of a block or endorsement payload.
    ///
    /// Both families open with `magic ‖ chain_id`. A block continues with its
    /// header, which leads with the big-endian level; an endorsement carries
    /// its level in the final four bytes. Generic operations have no
    /// position and yield `None`.
    pub fn chain_position(&self) -> Result<Option<ChainPosition>, ProtocolError> {
        let level_bytes: [u8; 4] = match self.magic_byte() {
            MagicByte::Generic => return Ok(None),
            MagicByte::Block => self
                .bytes
                .get(5..9)
                .ok_or(ProtocolError::Truncated("block level"))?
                .try_into()
                .unwrap(),
            MagicByte::Endorsement => {
                if self.bytes.len() < 9 {
                    return Err(ProtocolError::Truncated("endorsement level"));
                }
                self.bytes[self.bytes.len() - 4..].try_into().unwrap()
            }
        };
        let chain_id: [u8; 4] = self
            .bytes
            .get(1..5)
            .ok_or(ProtocolError::Truncated("chain id"))?
            .try_into()
            .unwrap();
        Ok(Some(ChainPosition {
            chain_id,
            level: u32::from_be_bytes(level_bytes),
            round: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endorsement(chain_id: [u8; 4], level: u32) -> Vec<u8> {
        let mut bytes = vec![MAGIC_ENDORSEMENT];
        bytes.extend_from_slice(&chain_id);
        bytes.extend_from_slice(&[0u8; 32]); // branch
        bytes.push(0x00); // tag
        bytes.extend_from_slice(&level.to_be_bytes());
        bytes
    }

    #[test]
    fn magic_byte_classification() {
        assert_eq!(
            Operation::parse(vec![0x01, 0xaa]).unwrap().magic_byte(),
            MagicByte::Block
        );
        assert_eq!(
            Operation::parse(vec![0x02, 0xaa]).unwrap().magic_byte(),
            MagicByte::Endorsement
        );
        assert_eq!(
            Operation::parse(vec![0x03, 0xaa]).unwrap().magic_byte(),
            MagicByte::Generic
        );
    }

    #[test]
    fn unknown_magic_byte_is_refused() {
        assert!(matches!(
            Operation::parse(vec![0x04]),
            Err(ProtocolError::UnknownMagicByte(0x04))
        ));
        assert!(matches!(
            Operation::parse(vec![]),
            Err(ProtocolError::EmptyPayload)
        ));
    }

    #[test]
    fn endorsement_position() {
        let op = Operation::parse(endorsement([0x7a, 0x06, 0xa7, 0x70], 259_938)).unwrap();
        let pos = op.chain_position().unwrap().unwrap();
        assert_eq!(pos.chain_id, [0x7a, 0x06, 0xa7, 0x70]);
        assert_eq!(pos.level, 259_938);
        assert_eq!(pos.round, 0);
    }

    #[test]
    fn block_position() {
        // magic ‖ chain_id ‖ header, header leading with the level.
        let mut bytes = vec![MAGIC_BLOCK, 0x7a, 0x06, 0xa7, 0x70];
        bytes.extend_from_slice(&259_939u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 16]); // rest of the header, irrelevant here
        let op = Operation::parse(bytes).unwrap();
        let pos = op.chain_position().unwrap().unwrap();
        assert_eq!(pos.level, 259_939);
    }

    #[test]
    fn truncated_consensus_payload_is_an_error() {
        let op = Operation::parse(vec![MAGIC_ENDORSEMENT, 0x01, 0x02]).unwrap();
        assert!(op.chain_position().is_err());
        let op = Operation::parse(vec![MAGIC_BLOCK, 0x01, 0x02, 0x03, 0x04, 0x05]).unwrap();
        assert!(op.chain_position().is_err());
    }

    #[test]
    fn generic_payload_has_no_position() {
        let op = Operation::parse(vec![MAGIC_GENERIC, 0xff, 0xff]).unwrap();
        assert!(op.chain_position().unwrap().is_none());
    }
}
