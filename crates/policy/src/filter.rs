//! The operation filter: kind gate, source whitelist, daily cap, watermark.

use std::collections::HashSet;
use std::sync::Arc;

use num_bigint::BigUint;
use thiserror::Error;

use bakergate_protocol::base58::address_to_wire;
use bakergate_protocol::generic::{GenericOperation, OpKind};
use bakergate_protocol::operation::{ChainPosition, MagicByte, Operation};
use bakergate_protocol::ProtocolError;

use crate::spend::SpendLedger;
use crate::watermark::{WatermarkKey, WatermarkKind, WatermarkStore};

/// Immutable policy snapshot, fixed at server start.
///
/// The defaults refuse everything; each class of operation must be enabled
/// explicitly.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub enable_tx: bool,
    pub enable_endorsement: bool,
    pub enable_block: bool,
    pub enable_generic_nontx: bool,
    /// base58 source addresses allowed to transact. Empty means no
    /// restriction.
    pub tx_whitelist_addresses: Vec<String>,
    /// Cumulative ceiling on transaction value per key per 24-hour window.
    pub tx_daily_max: Option<BigUint>,
}

/// A policy deny. The message names the class for operator diagnostics but
/// carries no key material and no watermark values.
#[derive(Debug, Error)]
pub enum PolicyViolation {
    #[error("signing of {0} operations is disabled")]
    KindDisabled(&'static str),
    #[error("transaction source is not whitelisted")]
    SourceNotWhitelisted,
    #[error("transaction would exceed the daily spending cap")]
    DailyCapExceeded,
    #[error("operation does not advance past the signing watermark")]
    WatermarkRegression,
}

impl PolicyViolation {
    /// Stable machine-readable code for logs and dashboards.
    pub fn code(&self) -> &'static str {
        match self {
            Self::KindDisabled(_) => "KIND_DISABLED",
            Self::SourceNotWhitelisted => "SOURCE_NOT_WHITELISTED",
            Self::DailyCapExceeded => "DAILY_CAP_EXCEEDED",
            Self::WatermarkRegression => "WATERMARK_REGRESSION",
        }
    }
}

/// Outcome of a failed authorization: either the payload could not be
/// trusted at all, or a policy rule refused it.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error(transparent)]
    Parse(#[from] ProtocolError),
    #[error(transparent)]
    Denied(#[from] PolicyViolation),
}

/// A successful authorization.
///
/// Holds the daily-cap reservation taken for a transaction. The reservation
/// is refunded when the grant is dropped — on backend failure or request
/// abandonment — unless [`Grant::commit`] is called once the signature is in
/// hand.
#[derive(Debug, Default)]
pub struct Grant {
    reservation: Option<Reservation>,
}

impl Grant {
    /// Keep the cap charge; the signature was produced.
    pub fn commit(mut self) {
        if let Some(reservation) = &mut self.reservation {
            reservation.armed = false;
        }
    }
}

#[derive(Debug)]
struct Reservation {
    ledger: Arc<SpendLedger>,
    public_key_hash: String,
    amount: BigUint,
    armed: bool,
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed {
            self.ledger.refund(&self.public_key_hash, &self.amount);
        }
    }
}

/// Evaluates the policy against parsed operations. Shared across requests;
/// all interior state is synchronized.
#[derive(Debug)]
pub struct PolicyEngine {
    policy: Policy,
    /// Whitelist addresses in their on-wire form, for comparison against the
    /// parsed source slot.
    whitelist: HashSet<Vec<u8>>,
    watermarks: WatermarkStore,
    ledger: Arc<SpendLedger>,
}

impl PolicyEngine {
    /// Build an engine, converting the whitelist once. A malformed whitelist
    /// address is a configuration error and refused up front.
    pub fn new(policy: Policy) -> Result<Self, ProtocolError> {
        let whitelist = policy
            .tx_whitelist_addresses
            .iter()
            .map(|address| address_to_wire(address))
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(Self {
            policy,
            whitelist,
            watermarks: WatermarkStore::new(),
            ledger: Arc::new(SpendLedger::new()),
        })
    }

    /// Run the full check sequence for one operation, failing closed on the
    /// first deny. For blocks and endorsements the watermark is advanced
    /// here, before any backend traffic.
    pub fn authorize(&self, op: &Operation, public_key_hash: &str) -> Result<Grant, PolicyError> {
        match (op.magic_byte(), op.chain_position()?) {
            (MagicByte::Block, Some(position)) => self.authorize_consensus(
                self.policy.enable_block,
                WatermarkKind::Block,
                "block",
                position,
                public_key_hash,
            ),
            (MagicByte::Endorsement, Some(position)) => self.authorize_consensus(
                self.policy.enable_endorsement,
                WatermarkKind::Endorsement,
                "endorsement",
                position,
                public_key_hash,
            ),
            _ => self.authorize_generic(op, public_key_hash),
        }
    }

    fn authorize_consensus(
        &self,
        enabled: bool,
        kind: WatermarkKind,
        kind_name: &'static str,
        position: ChainPosition,
        public_key_hash: &str,
    ) -> Result<Grant, PolicyError> {
        if !enabled {
            return Err(PolicyViolation::KindDisabled(kind_name).into());
        }
        let key = WatermarkKey {
            chain_id: position.chain_id,
            public_key_hash: public_key_hash.to_string(),
            kind,
        };
        if !self
            .watermarks
            .check_and_advance(key, position.level, position.round)
        {
            return Err(PolicyViolation::WatermarkRegression.into());
        }
        Ok(Grant::default())
    }

    fn authorize_generic(
        &self,
        op: &Operation,
        public_key_hash: &str,
    ) -> Result<Grant, PolicyError> {
        let Some(generic) = GenericOperation::new(op) else {
            return Err(PolicyViolation::KindDisabled("unknown").into());
        };
        match generic.kind() {
            OpKind::Transaction => {
                // An unparseable destination means unexpected parameters or a
                // misaligned layout; the operation cannot be understood, let
                // alone signed.
                if generic.destination().is_empty() {
                    return Err(
                        ProtocolError::MalformedTransaction("unparseable destination").into(),
                    );
                }
                if !self.policy.enable_tx {
                    return Err(PolicyViolation::KindDisabled("transaction").into());
                }
                if !self.whitelist.is_empty() && !self.whitelist.contains(generic.source()) {
                    return Err(PolicyViolation::SourceNotWhitelisted.into());
                }
                if let Some(cap) = &self.policy.tx_daily_max {
                    let total = generic.total_value();
                    if !self.ledger.try_reserve(public_key_hash, &total, cap) {
                        return Err(PolicyViolation::DailyCapExceeded.into());
                    }
                    return Ok(Grant {
                        reservation: Some(Reservation {
                            ledger: Arc::clone(&self.ledger),
                            public_key_hash: public_key_hash.to_string(),
                            amount: total,
                            armed: true,
                        }),
                    });
                }
                Ok(Grant::default())
            }
            OpKind::Unknown => Err(PolicyViolation::KindDisabled("unknown").into()),
            _ => {
                if self.policy.enable_generic_nontx {
                    Ok(Grant::default())
                } else {
                    Err(PolicyViolation::KindDisabled("generic").into())
                }
            }
        }
    }
}
