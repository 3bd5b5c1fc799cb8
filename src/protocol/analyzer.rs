// src/protocol/analyzer.rs

use crate::protocol::{Accumulator, DecodedTrial};

/// Counts `01`/`10` outcomes on the compatible basis pairs.
///
/// In a noiseless, unintercepted run those pairs only ever produce `00` or
/// `11`, so every count is a channel error or tampering. Kept separate from
/// the sifter's mismatch count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorAnalyzer {
    error_counter: usize,
}

impl ErrorAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_counter(&self) -> usize {
        self.error_counter
    }
}

impl Accumulator for ErrorAnalyzer {
    fn observe(&mut self, record: &DecodedTrial) {
        if !record.trial.bases().is_compatible() {
            return;
        }
        if record.outcome().is_some_and(|outcome| outcome.is_anticorrelated()) {
            self.error_counter += 1;
        }
    }

    fn merge(&mut self, other: Self) {
        self.error_counter += other.error_counter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Basis, InterceptBasis};
    use crate::protocol::{Observation, Outcome, Trial};

    fn record(alice: Basis, bob: Basis, observation: Observation) -> DecodedTrial {
        DecodedTrial {
            trial: Trial {
                index: 0,
                alice_basis: alice,
                bob_basis: bob,
                eve_basis_a: InterceptBasis::Identity,
                eve_basis_b: InterceptBasis::Identity,
            },
            observation,
        }
    }

    #[test]
    fn counts_anticorrelated_outcomes_on_compatible_pairs_only() {
        let records = [
            record(Basis::B2, Basis::B1, Observation::Observed(Outcome::ZeroOne)),
            record(Basis::B3, Basis::B2, Observation::Observed(Outcome::OneZero)),
            record(Basis::B3, Basis::B2, Observation::Observed(Outcome::OneOne)),
            record(Basis::B1, Basis::B1, Observation::Observed(Outcome::ZeroOne)),
            record(Basis::B2, Basis::B1, Observation::Malformed),
            record(Basis::B2, Basis::B1, Observation::Absent),
        ];
        assert_eq!(ErrorAnalyzer::fold(&records).error_counter(), 2);
    }

    #[test]
    fn merge_adds_counters() {
        let a = ErrorAnalyzer::fold(&[record(Basis::B2, Basis::B1, Observation::Observed(Outcome::OneZero))]);
        let mut b = ErrorAnalyzer::fold(&[record(Basis::B3, Basis::B2, Observation::Observed(Outcome::ZeroOne))]);
        b.merge(a);
        assert_eq!(b.error_counter(), 2);
    }
}
