//! Session watermark store.
//!
//! Records, per (chain, key, kind), the highest `(level, round)` the server
//! has agreed to sign. The record is advanced *before* the backend is
//! invoked: a crash between the advance and the backend response leaves the
//! watermark conservatively high, preferring a missed signature over a
//! double signature. Entries live for the lifetime of the process and are
//! never deleted.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// The payload families subject to watermarking. Everything else bypasses
/// the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatermarkKind {
    Block,
    Endorsement,
}

/// Identity of one watermark entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatermarkKey {
    pub chain_id: [u8; 4],
    pub public_key_hash: String,
    pub kind: WatermarkKind,
}

/// In-memory watermark store with per-entry atomicity.
#[derive(Debug, Default)]
pub struct WatermarkStore {
    entries: DashMap<WatermarkKey, (u32, u32)>,
}

impl WatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically compare and advance one entry.
    ///
    /// Returns `true` and installs `(level, round)` iff it is lexicographically
    /// greater than the stored pair, or no pair is stored yet. The read,
    /// comparison and write happen under the entry's shard lock, so two
    /// concurrent calls for the same key cannot both win the same position.
    pub fn check_and_advance(&self, key: WatermarkKey, level: u32, round: u32) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(mut entry) => {
                if (level, round) > *entry.get() {
                    entry.insert((level, round));
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert((level, round));
                true
            }
        }
    }
}
