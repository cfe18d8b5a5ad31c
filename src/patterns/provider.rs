//! Pattern snapshot provider.
//!
//! Patterns are distributed out-of-band (remote config, bundled defaults).
//! The extractor reads one consistent snapshot per extraction and never
//! observes a half-applied update.

use crate::error::Result;
use crate::patterns::schema::PatternSet;
use std::sync::RwLock;

/// Source of extraction rules. Implementations must return a consistent
/// snapshot; the core reads it exactly once per extraction.
pub trait PatternProvider: Send + Sync {
    fn rules_snapshot(&self) -> PatternSet;
}

/// In-memory provider holding the latest published pattern set.
#[derive(Default)]
pub struct StaticPatterns {
    inner: RwLock<PatternSet>,
}

impl StaticPatterns {
    pub fn new(set: PatternSet) -> Self {
        Self {
            inner: RwLock::new(set),
        }
    }

    /// Build a provider from the JSON wire form of a pattern set.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(PatternSet::parse(json)?))
    }

    /// Replace the published set. In-flight extractions keep the snapshot
    /// they already read.
    pub fn update(&self, set: PatternSet) {
        *self.inner.write().expect("pattern lock poisoned") = set;
    }
}

impl PatternProvider for StaticPatterns {
    fn rules_snapshot(&self) -> PatternSet {
        self.inner.read().expect("pattern lock poisoned").clone()
    }
}
