//! Field-level parser for generic operations.
//!
//! A generic payload is `magic ‖ branch(32) ‖ kind ‖ body`. The parser only
//! understands the fields the signing policy consults; everything else is
//! opaque. Transactions are laid out as a 21-byte source slot, five
//! variable-length naturals (fee, counter, gas limit, storage limit, amount),
//! a 22-byte destination slot and a trailing parameters flag.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::operation::{MagicByte, Operation};

/// Absolute offset of the kind byte within the payload.
const KIND_OFFSET: usize = 33;
/// Absolute range of the transaction source slot.
const SOURCE_START: usize = 34;
const SOURCE_END: usize = 55;
/// Absolute offset where the transaction naturals begin.
const FIELDS_START: usize = 55;
/// Continuation-byte bound for a single natural. Valid operations stay far
/// below this; anything longer is hostile input.
const MAX_NATURAL_BYTES: usize = 32;

/// Kind of a generic operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    SeedNonceRevelation,
    DoubleEndorsement,
    ActivateAccount,
    Proposal,
    Ballot,
    Reveal,
    Transaction,
    Delegation,
    Unknown,
}

impl OpKind {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0x01 => OpKind::SeedNonceRevelation,
            0x02 => OpKind::DoubleEndorsement,
            0x04 => OpKind::ActivateAccount,
            0x05 => OpKind::Proposal,
            0x06 => OpKind::Ballot,
            0x6b => OpKind::Reveal,
            0x6c => OpKind::Transaction,
            0x6e => OpKind::Delegation,
            _ => OpKind::Unknown,
        }
    }
}

/// Decode a variable-length natural starting at `start`.
///
/// The encoding is little-endian base-128: each byte contributes its low
/// seven bits, a set high bit continues into the next byte. Returns the value
/// together with the index of the first byte after it. Running off the end of
/// the buffer is recoverable: the missing tail contributes zero and the
/// caller's offset bookkeeping fails closed.
pub fn read_natural(bytes: &[u8], start: usize) -> (BigUint, usize) {
    let mut value = BigUint::zero();
    let mut index = start;
    let mut shift = 0u64;
    loop {
        if index - start >= MAX_NATURAL_BYTES {
            tracing::warn!("natural exceeds {MAX_NATURAL_BYTES} bytes, refusing the rest");
            break;
        }
        let Some(&byte) = bytes.get(index) else {
            tracing::warn!("ran into end of payload while reading a natural");
            break;
        };
        index += 1;
        value += BigUint::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            break;
        }
    }
    (value, index)
}

/// Canonical encoding of a natural: the inverse of [`read_natural`], never
/// emitting a redundant leading continuation byte.
pub fn write_natural(value: &BigUint) -> Vec<u8> {
    let mut digits = value.to_radix_le(128);
    let last = digits.len() - 1;
    for digit in &mut digits[..last] {
        *digit |= 0x80;
    }
    digits
}

/// View over an operation whose magic byte is `generic`.
///
/// Borrows the request payload; accessors for a non-transaction kind return
/// neutral empty values, so callers check [`GenericOperation::kind`] first.
#[derive(Debug, Clone, Copy)]
pub struct GenericOperation<'a> {
    bytes: &'a [u8],
}

impl<'a> GenericOperation<'a> {
    /// Returns `None` unless the operation is of the generic family.
    pub fn new(op: &'a Operation) -> Option<Self> {
        (op.magic_byte() == MagicByte::Generic).then(|| Self { bytes: op.bytes() })
    }

    /// The operation kind. Payloads too short to carry a kind byte are
    /// `Unknown` and fall to the policy's catch-all gate.
    pub fn kind(&self) -> OpKind {
        match self.bytes.get(KIND_OFFSET) {
            Some(&tag) => OpKind::from_tag(tag),
            None => OpKind::Unknown,
        }
    }

    /// On-wire source slot of a transaction: curve tag plus 20-byte hash.
    pub fn source(&self) -> &'a [u8] {
        if self.kind() != OpKind::Transaction {
            return &[];
        }
        self.bytes.get(SOURCE_START..SOURCE_END).unwrap_or(&[])
    }

    pub fn fee(&self) -> BigUint {
        self.transaction_field(0)
    }

    pub fn counter(&self) -> BigUint {
        self.transaction_field(1)
    }

    pub fn gas_limit(&self) -> BigUint {
        self.transaction_field(2)
    }

    pub fn storage_limit(&self) -> BigUint {
        self.transaction_field(3)
    }

    pub fn amount(&self) -> BigUint {
        self.transaction_field(4)
    }

    /// On-wire destination slot of a transaction.
    ///
    /// The slot's leading contract tag is skipped; what remains is the
    /// 21-byte form produced by [`crate::base58::address_to_wire`]. Returns
    /// empty when the layout does not line up or when a parameters block is
    /// present, since parameter parsing is not implemented and the operation
    /// must not be signed.
    pub fn destination(&self) -> &'a [u8] {
        if self.kind() != OpKind::Transaction {
            return &[];
        }
        let mut index = FIELDS_START;
        for _ in 0..5 {
            (_, index) = read_natural(self.bytes, index);
        }
        let start = index + 1;
        let end = index + 22;
        if end != self.bytes.len() - 1 {
            tracing::warn!(
                "destination slot does not end at the parameters flag, refusing to guess"
            );
            return &[];
        }
        if self.bytes[self.bytes.len() - 1] != 0x00 {
            tracing::warn!("parameters present but parameter parsing is not implemented");
            return &[];
        }
        &self.bytes[start..end]
    }

    /// Everything a transaction can spend: `fee + amount + gas + storage`.
    pub fn total_value(&self) -> BigUint {
        if self.kind() != OpKind::Transaction {
            return BigUint::zero();
        }
        self.fee() + self.amount() + self.gas_limit() + self.storage_limit()
    }

    fn transaction_field(&self, field: usize) -> BigUint {
        if self.kind() != OpKind::Transaction {
            return BigUint::zero();
        }
        let mut index = FIELDS_START;
        let mut value = BigUint::zero();
        for _ in 0..=field {
            (value, index) = read_natural(self.bytes, index);
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base58::address_to_wire;
    use proptest::prelude::*;

    fn nat(hex_bytes: &str) -> u64 {
        let bytes = hex::decode(hex_bytes).unwrap();
        let (value, _) = read_natural(&bytes, 0);
        let digits = value.to_u64_digits();
        match digits.len() {
            0 => 0,
            1 => digits[0],
            _ => panic!("value exceeds u64"),
        }
    }

    #[test]
    fn natural_reference_vectors() {
        assert_eq!(nat("8001"), 128);
        assert_eq!(nat("ff7f"), 16383);
        assert_eq!(nat("808001"), 16384);
        assert_eq!(nat("818001"), 16385);
        assert_eq!(nat("ffff01"), 32767);
        assert_eq!(nat("808002"), 32768);
        assert_eq!(nat("818002"), 32769);
        assert_eq!(nat("ff8002"), 32895);
        assert_eq!(nat("808102"), 32896);
        assert_eq!(nat("ffff03"), 65535);
        assert_eq!(nat("808004"), 65536);
    }

    #[test]
    fn natural_stops_at_continuation_end() {
        let bytes = hex::decode("8001ff").unwrap();
        let (value, next) = read_natural(&bytes, 0);
        assert_eq!(value, BigUint::from(128u32));
        assert_eq!(next, 2);
    }

    #[test]
    fn natural_off_the_end_is_zero() {
        let (value, next) = read_natural(&[], 0);
        assert!(value.is_zero());
        assert_eq!(next, 0);
        // A dangling continuation byte contributes what it has and stops.
        let (value, next) = read_natural(&[0x80], 0);
        assert!(value.is_zero());
        assert_eq!(next, 1);
    }

    #[test]
    fn natural_length_bound_holds() {
        let hostile = vec![0xff; 64];
        let (_, next) = read_natural(&hostile, 0);
        assert_eq!(next, MAX_NATURAL_BYTES);
    }

    #[test]
    fn write_natural_is_canonical() {
        assert_eq!(write_natural(&BigUint::zero()), vec![0x00]);
        assert_eq!(write_natural(&BigUint::from(128u32)), vec![0x80, 0x01]);
        assert_eq!(
            write_natural(&BigUint::from(65536u32)),
            vec![0x80, 0x80, 0x04]
        );
    }

    proptest! {
        #[test]
        fn natural_roundtrip(n in any::<u128>()) {
            let value = BigUint::from(n);
            let encoded = write_natural(&value);
            // Canonical: the final byte never continues, and is only zero for
            // the zero value itself.
            prop_assert_eq!(encoded.last().unwrap() & 0x80, 0);
            prop_assert!(*encoded.last().unwrap() != 0 || n == 0);
            let (decoded, next) = read_natural(&encoded, 0);
            prop_assert_eq!(decoded, value);
            prop_assert_eq!(next, encoded.len());
        }
    }

    struct TransactionVector {
        name: &'static str,
        payload: &'static str,
        source: &'static str,
        fee: u64,
        counter: u64,
        gas_limit: u64,
        storage_limit: u64,
        amount: u64,
        destination: &'static str,
    }

    // Captured from dry-run transfers on a test network.
    const TRANSACTION_VECTORS: &[TransactionVector] = &[
        TransactionVector {
            name: "small values",
            payload: "030c4886e771509274c81d97195d0c6c13a9d96287e7d2ed3b086e0e509a1ade0f6c0154f5d8f71ce18f9f05bb885a4120e64c667bc1b4010203040500008c947bf65254cf1a813eb8c6d3f980a89751e2af00",
            source: "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m",
            fee: 1,
            counter: 2,
            gas_limit: 3,
            storage_limit: 4,
            amount: 5,
            destination: "tz1YTMAqhU9icfuDG6FQDdsgWQB4izbSfNSf",
        },
        TransactionVector {
            name: "large values",
            payload: "0337761ccb2efac1301653f5f9dd70f29f41145142bd0c7f5a94621cb6b556ef2f6c0154f5d8f71ce18f9f05bb885a4120e64c667bc1b47f80018101ffff038080040001b42958e42271f454f914da474650d580dc9a63ae00",
            source: "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m",
            fee: 127,
            counter: 128,
            gas_limit: 129,
            storage_limit: 65535,
            amount: 65536,
            destination: "tz2QjqpipTjio1q6qsy9wvQcrah33Mx8PWEv",
        },
        TransactionVector {
            name: "zero values",
            payload: "0368225c9f1857643c6da85eb32ddba298c71a977a05a9b96c2d380097089ab26a6c0154f5d8f71ce18f9f05bb885a4120e64c667bc1b464040200000002a88430950b81e860bc6d7cec866864e46a66781900",
            source: "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m",
            fee: 100,
            counter: 4,
            gas_limit: 2,
            storage_limit: 0,
            amount: 0,
            destination: "tz3bh5VbXnLMyHGUMfhRKYzVXQE1axzTm9FN",
        },
        TransactionVector {
            name: "tz1 source",
            payload: "0329f9e567a875b52e1b03751d38b19b6bf182c1ec95efe5ed7598f9c16b2cbf386c008c947bf65254cf1a813eb8c6d3f980a89751e2af830ace69bc509502c0843d0002a88430950b81e860bc6d7cec866864e46a66781900",
            source: "tz1YTMAqhU9icfuDG6FQDdsgWQB4izbSfNSf",
            fee: 1283,
            counter: 13518,
            gas_limit: 10300,
            storage_limit: 277,
            amount: 1000000,
            destination: "tz3bh5VbXnLMyHGUMfhRKYzVXQE1axzTm9FN",
        },
        TransactionVector {
            name: "contract destination",
            payload: "0331b45e6df3bb6931e65ab542cc5c5a953f959156fddffc1d554d4b60159cc05b6c0154f5d8f71ce18f9f05bb885a4120e64c667bc1b4f809ca69d84f00c0843d016e7c23cc06c7b0743256f65e34d5b0f7c91e4eb20000",
            source: "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m",
            fee: 1272,
            counter: 13514,
            gas_limit: 10200,
            storage_limit: 0,
            amount: 1000000,
            destination: "KT1JexcFezMnUAaWmvUGY99jwTA4jcKiUgFp",
        },
    ];

    fn generic(payload: &str) -> Operation {
        Operation::parse(hex::decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn transaction_vectors_parse() {
        for vector in TRANSACTION_VECTORS {
            let op = generic(vector.payload);
            let tx = GenericOperation::new(&op).unwrap();
            assert_eq!(tx.kind(), OpKind::Transaction, "{}", vector.name);
            assert_eq!(
                tx.source(),
                address_to_wire(vector.source).unwrap(),
                "{} source",
                vector.name
            );
            assert_eq!(tx.fee(), BigUint::from(vector.fee), "{} fee", vector.name);
            assert_eq!(
                tx.counter(),
                BigUint::from(vector.counter),
                "{} counter",
                vector.name
            );
            assert_eq!(
                tx.gas_limit(),
                BigUint::from(vector.gas_limit),
                "{} gas limit",
                vector.name
            );
            assert_eq!(
                tx.storage_limit(),
                BigUint::from(vector.storage_limit),
                "{} storage limit",
                vector.name
            );
            assert_eq!(
                tx.amount(),
                BigUint::from(vector.amount),
                "{} amount",
                vector.name
            );
            assert_eq!(
                tx.destination(),
                address_to_wire(vector.destination).unwrap(),
                "{} destination",
                vector.name
            );
            assert_eq!(
                tx.total_value(),
                BigUint::from(
                    vector.fee + vector.amount + vector.gas_limit + vector.storage_limit
                ),
                "{} total value",
                vector.name
            );
        }
    }

    #[test]
    fn proposal_and_ballot_kinds() {
        let op = generic("03ce69c5713dac3537254e7be59759cf59c15abd530d10501ccf9028a5786314cf05008fb5cea62d147c696afd9a93dbce962f4c8a9c910000000a00000020ab22e46e7872aa13e366e455bb4f5dbede856ab0864e1da7e122554579ee71f8");
        assert_eq!(GenericOperation::new(&op).unwrap().kind(), OpKind::Proposal);

        let op = generic("03ce69c5713dac3537254e7be59759cf59c15abd530d10501ccf9028a5786314cf0600531ab5764a29f77c5d40b80a5da45c84468f08a10000000bab22e46e7872aa13e366e455bb4f5dbede856ab0864e1da7e122554579ee71f800");
        assert_eq!(GenericOperation::new(&op).unwrap().kind(), OpKind::Ballot);
    }

    #[test]
    fn short_payload_kind_is_unknown() {
        // Too short to carry a kind byte at all.
        let op = Operation::parse(vec![0x03; 33]).unwrap();
        assert_eq!(GenericOperation::new(&op).unwrap().kind(), OpKind::Unknown);
        // Long enough, but the tag is not a known kind.
        let mut bytes = vec![0x03; 33];
        bytes.push(0x7f);
        let op = Operation::parse(bytes).unwrap();
        assert_eq!(GenericOperation::new(&op).unwrap().kind(), OpKind::Unknown);
    }

    #[test]
    fn non_transaction_accessors_are_neutral() {
        let op = generic("03ce69c5713dac3537254e7be59759cf59c15abd530d10501ccf9028a5786314cf05008fb5cea62d147c696afd9a93dbce962f4c8a9c910000000a00000020ab22e46e7872aa13e366e455bb4f5dbede856ab0864e1da7e122554579ee71f8");
        let proposal = GenericOperation::new(&op).unwrap();
        assert!(proposal.source().is_empty());
        assert!(proposal.destination().is_empty());
        assert!(proposal.fee().is_zero());
        assert!(proposal.total_value().is_zero());
    }

    #[test]
    fn non_generic_magic_has_no_view() {
        let op = Operation::parse(vec![0x02, 0x00, 0x00]).unwrap();
        assert!(GenericOperation::new(&op).is_none());
    }

    #[test]
    fn trailing_parameters_refuse_destination() {
        // The contract-destination vector with its parameters flag forced on.
        let mut bytes = hex::decode(TRANSACTION_VECTORS[4].payload).unwrap();
        *bytes.last_mut().unwrap() = 0x01;
        let op = Operation::parse(bytes).unwrap();
        let tx = GenericOperation::new(&op).unwrap();
        assert_eq!(tx.kind(), OpKind::Transaction);
        assert!(tx.destination().is_empty());
    }

    #[test]
    fn misaligned_destination_is_refused() {
        // An extra byte between the destination slot and the flag.
        let mut bytes = hex::decode(TRANSACTION_VECTORS[0].payload).unwrap();
        let flag = bytes.pop().unwrap();
        bytes.push(0xde);
        bytes.push(flag);
        let op = Operation::parse(bytes).unwrap();
        let tx = GenericOperation::new(&op).unwrap();
        assert!(tx.destination().is_empty());
    }

    #[test]
    fn truncated_transaction_fields_read_zero() {
        // Kind byte present but the body cut off mid-fields.
        let mut bytes = hex::decode(TRANSACTION_VECTORS[0].payload).unwrap();
        bytes.truncate(57);
        let op = Operation::parse(bytes).unwrap();
        let tx = GenericOperation::new(&op).unwrap();
        assert_eq!(tx.kind(), OpKind::Transaction);
        assert!(tx.amount().is_zero());
        assert!(tx.destination().is_empty());
    }
}
