// src/protocol/chsh.rs

//! CHSH Bell-inequality test.
//!
//! For each category `(a, b)` the correlation is
//! `E = (N00 − N01 − N10 + N11) / n` and the statistic is
//! `S = E(A1,B1) − E(A1,B3) + E(A3,B1) + E(A3,B3)`.
//! Local hidden variables bound `|S| ≤ 2`; the singlet reaches `2√2`.

use crate::core::{BasisPair, E91Error, E91Result, TSIRELSON_BOUND};
use crate::protocol::{Accumulator, DecodedTrial, Outcome};
use serde::Serialize;

/// Outcome counts for one CHSH category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// Indexed by `Outcome::bucket`.
    pub buckets: [u64; 4],
    pub trials: u64,
}

impl CategoryCounts {
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.buckets[outcome.bucket()]
    }

    /// Correlation of the signed results. Guarded: an empty category is an
    /// error, never a NaN.
    pub fn expectation(&self, category: BasisPair) -> E91Result<f64> {
        if self.trials == 0 {
            return Err(E91Error::InsufficientSamples { category });
        }
        let agree = self.count(Outcome::ZeroZero) + self.count(Outcome::OneOne);
        let disagree = self.count(Outcome::ZeroOne) + self.count(Outcome::OneZero);
        Ok((agree as f64 - disagree as f64) / self.trials as f64)
    }
}

/// Counts for the four categories, in `BasisPair::CHSH` order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChshCountTable {
    categories: [CategoryCounts; 4],
}

impl ChshCountTable {
    /// Records `outcome` if `pair` is a CHSH category.
    pub fn tally(&mut self, pair: BasisPair, outcome: Outcome) {
        if let Some(slot) = pair.chsh_slot() {
            let counts = &mut self.categories[slot];
            counts.buckets[outcome.bucket()] += 1;
            counts.trials += 1;
        }
    }

    /// Counts for `pair`; `None` if it is not a CHSH category.
    pub fn category(&self, pair: BasisPair) -> Option<&CategoryCounts> {
        pair.chsh_slot().map(|slot| &self.categories[slot])
    }

    /// Trials across all four categories.
    pub fn total_trials(&self) -> u64 {
        self.categories.iter().map(|c| c.trials).sum()
    }

    fn merge(&mut self, other: &ChshCountTable) {
        for (mine, theirs) in self.categories.iter_mut().zip(other.categories.iter()) {
            for (a, b) in mine.buckets.iter_mut().zip(theirs.buckets.iter()) {
                *a += *b;
            }
            mine.trials += theirs.trials;
        }
    }
}

/// Result of the Bell test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChshStatistic {
    /// `S`
    pub value: f64,
    /// `|S − 2√2|`
    pub deviation: f64,
    /// Correlations in `BasisPair::CHSH` order.
    pub expectations: [f64; 4],
}

impl ChshStatistic {
    pub fn expectation(&self, pair: BasisPair) -> Option<f64> {
        pair.chsh_slot().map(|slot| self.expectations[slot])
    }
}

/// Accumulates the count table over the run and evaluates `S` at the end.
/// No pass/fail threshold is applied here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChshEvaluator {
    table: ChshCountTable,
}

impl ChshEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &ChshCountTable {
        &self.table
    }

    /// Fails with `InsufficientSamples` naming the first empty category.
    pub fn evaluate(&self) -> E91Result<ChshStatistic> {
        let mut expectations = [0.0; 4];
        for (slot, category) in BasisPair::CHSH.iter().enumerate() {
            expectations[slot] = self.table.categories[slot].expectation(*category)?;
        }
        let [e11, e13, e31, e33] = expectations;
        let value = e11 - e13 + e31 + e33;
        Ok(ChshStatistic {
            value,
            deviation: (value - TSIRELSON_BOUND).abs(),
            expectations,
        })
    }
}

impl Accumulator for ChshEvaluator {
    fn observe(&mut self, record: &DecodedTrial) {
        if let Some(outcome) = record.outcome() {
            self.table.tally(record.trial.bases(), outcome);
        }
    }

    fn merge(&mut self, other: Self) {
        self.table.merge(&other.table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Basis, InterceptBasis};
    use crate::protocol::{Observation, Trial};

    fn record(alice: Basis, bob: Basis, outcome: Outcome) -> DecodedTrial {
        DecodedTrial {
            trial: Trial {
                index: 0,
                alice_basis: alice,
                bob_basis: bob,
                eve_basis_a: InterceptBasis::Identity,
                eve_basis_b: InterceptBasis::Identity,
            },
            observation: Observation::Observed(outcome),
        }
    }

    /// `agree` correlated and `disagree` anticorrelated outcomes in a category.
    fn category(alice: Basis, bob: Basis, agree: usize, disagree: usize) -> Vec<DecodedTrial> {
        let mut records = Vec::new();
        for i in 0..agree {
            let outcome = if i % 2 == 0 { Outcome::ZeroZero } else { Outcome::OneOne };
            records.push(record(alice, bob, outcome));
        }
        for i in 0..disagree {
            let outcome = if i % 2 == 0 { Outcome::ZeroOne } else { Outcome::OneZero };
            records.push(record(alice, bob, outcome));
        }
        records
    }

    #[test]
    fn statistic_uses_chsh_signs() -> Result<(), E91Error> {
        let mut records = Vec::new();
        records.extend(category(Basis::B1, Basis::B1, 3, 1)); // E = 0.5
        records.extend(category(Basis::B1, Basis::B3, 1, 3)); // E = -0.5
        records.extend(category(Basis::B3, Basis::B1, 4, 0)); // E = 1
        records.extend(category(Basis::B3, Basis::B3, 2, 2)); // E = 0
        // Non-CHSH pairs are ignored.
        records.extend(category(Basis::B2, Basis::B1, 0, 5));

        let evaluator = ChshEvaluator::fold(&records);
        let stat = evaluator.evaluate()?;
        assert!((stat.value - 2.0).abs() < 1e-12, "S = {}", stat.value);
        assert!((stat.deviation - (TSIRELSON_BOUND - 2.0)).abs() < 1e-12);
        assert_eq!(stat.expectation(BasisPair::new(Basis::B1, Basis::B3)), Some(-0.5));
        assert_eq!(evaluator.table().total_trials(), 16);
        Ok(())
    }

    #[test]
    fn empty_category_is_insufficient_samples() {
        let mut records = Vec::new();
        records.extend(category(Basis::B1, Basis::B1, 1, 0));
        records.extend(category(Basis::B1, Basis::B3, 1, 0));
        records.extend(category(Basis::B3, Basis::B3, 1, 0));
        let err = ChshEvaluator::fold(&records).evaluate().unwrap_err();
        assert_eq!(
            err,
            E91Error::InsufficientSamples {
                category: BasisPair::new(Basis::B3, Basis::B1)
            }
        );
    }

    #[test]
    fn unobserved_trials_are_not_tallied() {
        let mut absent = record(Basis::B1, Basis::B1, Outcome::OneOne);
        absent.observation = Observation::Absent;
        let evaluator = ChshEvaluator::fold(&[absent]);
        assert_eq!(evaluator.table().total_trials(), 0);
    }

    #[test]
    fn merge_is_order_independent() {
        let a = category(Basis::B1, Basis::B1, 5, 2);
        let b = category(Basis::B3, Basis::B3, 1, 4);

        let mut ab = ChshEvaluator::fold(&a);
        ab.merge(ChshEvaluator::fold(&b));
        let mut ba = ChshEvaluator::fold(&b);
        ba.merge(ChshEvaluator::fold(&a));
        assert_eq!(ab, ba);

        let counts = ab.table().category(BasisPair::new(Basis::B1, Basis::B1)).unwrap();
        assert_eq!(counts.trials, 7);
        assert_eq!(counts.count(Outcome::ZeroZero) + counts.count(Outcome::OneOne), 5);
    }
}
