//! Cooldown gate: at most one refetch per (category, query) per UTC day.
//!
//! A fingerprint of the pair is inserted into the persisted hash store
//! before the job does any network work; losing the insert race (or finding
//! the fingerprint already present) means another run already covered this
//! pair today.

use crate::store::PersistedHashes;
use chrono::{DateTime, NaiveTime, Utc};
use std::sync::Arc;

// Fixed across versions; changing either constant would silently reset
// every stored cooldown.
const FINGERPRINT_SEED: u64 = 0x9e37_79b1_85eb_ca87;
const FINGERPRINT_HEX_LEN: usize = 12;

/// Gate around the persisted hash store.
#[derive(Clone)]
pub struct CooldownGate {
    store: Arc<dyn PersistedHashes>,
}

impl CooldownGate {
    pub fn new(store: Arc<dyn PersistedHashes>) -> Self {
        Self { store }
    }

    /// Try to claim the (category, query) slot until the end of the current
    /// UTC day. Returns false when the slot is already taken.
    pub fn try_acquire(&self, category: &str, query: &str) -> bool {
        self.store.add(
            &query_fingerprint(category, query),
            end_of_utc_day(Utc::now()),
        )
    }

    /// Give the slot back so a later run may retry.
    pub fn release(&self, category: &str, query: &str) {
        self.store.delete(&query_fingerprint(category, query));
    }
}

/// Fingerprint of a (category, query) pair: a truncated fast hash of
/// `dfq:{category}:{trimmed query}`.
pub fn query_fingerprint(category: &str, query: &str) -> String {
    let key = format!("dfq:{category}:{}", query.trim());
    let mut hex = format!("{:016x}", fast_hash(key.as_bytes()));
    hex.truncate(FINGERPRINT_HEX_LEN);
    hex
}

/// End of the current UTC day. Timezone-agnostic: every deployment computes
/// the same expiry for the same instant.
pub fn end_of_utc_day(now: DateTime<Utc>) -> DateTime<Utc> {
    let next_day = now.date_naive().succ_opt().unwrap_or(now.date_naive());
    DateTime::from_naive_utc_and_offset(next_day.and_time(NaiveTime::MIN), Utc)
}

fn fast_hash(data: &[u8]) -> u64 {
    let mut hash = FINGERPRINT_SEED ^ data.len() as u64;
    for &byte in data {
        hash ^= (byte as u64).wrapping_mul(0x0100_0000_01b3);
        hash = hash.rotate_left(13).wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    hash ^ (hash >> 33)
}
