// src/protocol/sifter.rs

//! Basis reconciliation and the raw key.

use crate::protocol::{Accumulator, DecodedTrial};
use serde::Serialize;

/// Alice's and Bob's signed key values, paired by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiftedKey {
    alice: Vec<i8>,
    bob: Vec<i8>,
}

impl SiftedKey {
    pub fn alice(&self) -> &[i8] {
        &self.alice
    }

    pub fn bob(&self) -> &[i8] {
        &self.bob
    }

    pub fn len(&self) -> usize {
        self.alice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alice.is_empty()
    }
}

/// Keeps observed results taken in a compatible basis pair and counts the
/// positions where the two keys disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySifter {
    key: SiftedKey,
    mismatch_count: usize,
}

impl KeySifter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(&self) -> &SiftedKey {
        &self.key
    }

    pub fn into_key(self) -> SiftedKey {
        self.key
    }

    pub fn sifted_key_length(&self) -> usize {
        self.key.len()
    }

    /// Disagreements are reported as found, never corrected.
    pub fn mismatch_count(&self) -> usize {
        self.mismatch_count
    }
}

impl Accumulator for KeySifter {
    fn observe(&mut self, record: &DecodedTrial) {
        if !record.trial.bases().is_compatible() {
            return;
        }
        let Some(outcome) = record.outcome() else {
            return;
        };
        let signed = outcome.signed();
        self.key.alice.push(signed.alice);
        self.key.bob.push(signed.bob);
        if signed.alice != signed.bob {
            self.mismatch_count += 1;
        }
    }

    /// Appends `other`'s key after this one, so partitions must be merged
    /// in trial order to keep the key ordered.
    fn merge(&mut self, other: Self) {
        self.key.alice.extend(other.key.alice);
        self.key.bob.extend(other.key.bob);
        self.mismatch_count += other.mismatch_count;
    }
}
