// src/protocol/mod.rs

//! The E91 protocol and statistics engine.
//!
//! Data flows forward only: `BasisScheduler` → `TrialSpecBuilder` → oracle
//! → `OutcomeDecoder` → {`KeySifter`, `ErrorAnalyzer`, `ChshEvaluator`} →
//! `ResultReporter`. `ProtocolRunner` wires the stages together.

mod analyzer;
mod chsh;
mod decoder;
mod report;
mod runner;
mod scheduler;
mod sifter;
mod trial;

pub use analyzer::ErrorAnalyzer;
pub use chsh::{CategoryCounts, ChshCountTable, ChshEvaluator, ChshStatistic};
pub use decoder::{DecodedTrial, Observation, Outcome, OutcomeDecoder, SignedResult};
pub use report::{ProtocolReport, ResultReporter};
pub use runner::{CancelToken, ProtocolRun, ProtocolRunner, RetryPolicy};
pub use scheduler::{BasisScheduler, Trial};
pub use sifter::{KeySifter, SiftedKey};
pub use trial::{
    basis_rotation, AttackModel, InterceptHandler, Interception, TrialSpec, TrialSpecBuilder, ALICE_QUBIT, BOB_QUBIT,
};

/// A per-run aggregate over decoded trials.
///
/// Each predicate depends only on the trial's own bases and outcome, so
/// partial aggregates over disjoint partitions can be combined with
/// `merge`.
pub trait Accumulator: Default {
    /// Folds one record in.
    fn observe(&mut self, record: &DecodedTrial);

    /// Combines the aggregate of a disjoint partition into this one.
    fn merge(&mut self, other: Self);

    /// Aggregates `records` from scratch.
    fn fold<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a DecodedTrial>,
    {
        let mut acc = Self::default();
        for record in records {
            acc.observe(record);
        }
        acc
    }
}
