//! Per-key daily spending ledger.
//!
//! Tracks how much transaction value each key has committed to inside the
//! current 24-hour window. Capacity is taken with a reservation so the cap
//! holds under concurrent requests; a reservation is refunded when the
//! backend call fails or is abandoned.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use num_bigint::BigUint;
use num_traits::Zero;

const WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct Window {
    spent: BigUint,
    started: Instant,
}

/// Mutable daily-cap state, shared across requests.
#[derive(Debug, Default)]
pub struct SpendLedger {
    windows: DashMap<String, Window>,
}

impl SpendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge `value` against `cap` for this key, atomically.
    ///
    /// Returns `false` without charging when the addition would exceed the
    /// cap. The window restarts once 24 hours have elapsed since it opened.
    pub fn try_reserve(&self, public_key_hash: &str, value: &BigUint, cap: &BigUint) -> bool {
        self.reserve_at(public_key_hash, value, cap, Instant::now())
    }

    /// Return a previously reserved charge.
    pub fn refund(&self, public_key_hash: &str, value: &BigUint) {
        if let Some(mut window) = self.windows.get_mut(public_key_hash) {
            window.spent = if window.spent >= *value {
                &window.spent - value
            } else {
                BigUint::zero()
            };
        }
    }

    fn reserve_at(&self, public_key_hash: &str, value: &BigUint, cap: &BigUint, now: Instant) -> bool {
        let mut window = self
            .windows
            .entry(public_key_hash.to_string())
            .or_insert_with(|| Window {
                spent: BigUint::zero(),
                started: now,
            });
        if now.duration_since(window.started) >= WINDOW {
            window.spent = BigUint::zero();
            window.started = now;
        }
        if &window.spent + value > *cap {
            return false;
        }
        window.spent += value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKH: &str = "tz2G4TwEbsdFrJmApAxJ1vdQGmADnBp95n9m";

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    #[test]
    fn reserve_up_to_the_cap() {
        let ledger = SpendLedger::new();
        let cap = big(1_500_000);
        assert!(ledger.try_reserve(PKH, &big(1_013_575), &cap));
        assert!(!ledger.try_reserve(PKH, &big(1_013_575), &cap));
        // Smaller amounts still fit in the remainder.
        assert!(ledger.try_reserve(PKH, &big(486_425), &cap));
        assert!(!ledger.try_reserve(PKH, &big(1), &cap));
    }

    #[test]
    fn keys_have_independent_windows() {
        let ledger = SpendLedger::new();
        let cap = big(100);
        assert!(ledger.try_reserve("tz1a", &big(100), &cap));
        assert!(ledger.try_reserve("tz1b", &big(100), &cap));
    }

    #[test]
    fn refund_restores_capacity() {
        let ledger = SpendLedger::new();
        let cap = big(100);
        assert!(ledger.try_reserve(PKH, &big(80), &cap));
        assert!(!ledger.try_reserve(PKH, &big(40), &cap));
        ledger.refund(PKH, &big(80));
        assert!(ledger.try_reserve(PKH, &big(40), &cap));
    }

    #[test]
    fn refund_never_underflows() {
        let ledger = SpendLedger::new();
        let cap = big(100);
        assert!(ledger.try_reserve(PKH, &big(10), &cap));
        ledger.refund(PKH, &big(500));
        assert!(ledger.try_reserve(PKH, &big(100), &cap));
    }

    #[test]
    fn window_resets_after_a_day() {
        let ledger = SpendLedger::new();
        let cap = big(100);
        let opened = Instant::now();
        assert!(ledger.reserve_at(PKH, &big(100), &cap, opened));
        assert!(!ledger.reserve_at(PKH, &big(1), &cap, opened + WINDOW / 2));
        assert!(ledger.reserve_at(PKH, &big(100), &cap, opened + WINDOW));
    }
}
