//! The signing policy: decides whether a parsed operation may be handed to a
//! backend.
//!
//! Three pieces compose here:
//! * `watermark` — the per-key, per-chain high-watermark store that forbids
//!   signing a block or endorsement at a position already signed.
//! * `spend` — the per-key daily spending ledger backing the cumulative
//!   transaction cap.
//! * `filter` — the [`PolicyEngine`] that runs the kind gate, source
//!   whitelist, cap and watermark checks in order, failing closed.

pub mod filter;
pub mod spend;
pub mod watermark;

pub use filter::{Grant, Policy, PolicyEngine, PolicyError, PolicyViolation};
