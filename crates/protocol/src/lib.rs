//! Wire formats shared by the bakergate signing gateway.
//!
//! This crate covers everything that crosses the gateway's trust boundary in
//! serialized form:
//! * `base58` — base58check addresses, public keys and signatures, plus the
//!   curve prefix table.
//! * `codec` — the ledger's quoted-hex request framing.
//! * `hash` — Blake2b digests for address derivation and pre-signing.
//! * `operation` / `generic` — the signable payload families and the
//!   field-level parser for generic operations.
//! * `key` — the key descriptor the server publishes and signs under.

pub mod base58;
pub mod codec;
mod error;
pub mod generic;
pub mod hash;
mod key;
pub mod operation;

pub use error::ProtocolError;
pub use key::Key;
