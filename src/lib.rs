// src/lib.rs

//! `e91` - Ekert-91 entanglement-based quantum key distribution
//!
//! Schedules measurement bases for Alice, Bob and an optional eavesdropper,
//! turns each trial into a Bell-pair circuit, submits the circuits to a
//! measurement oracle and reduces the outcomes to a sifted key, a count of
//! measurement errors and the CHSH correlation value `S`.

pub mod core;
pub mod operations;
pub mod circuits;
pub mod simulation;
pub mod oracle;
pub mod protocol;
pub mod config;
pub mod validation;

// Re-export the most common types for easier top-level use
pub use core::{Basis, BasisPair, E91Error, E91Result, InterceptBasis, Party, QubitId, CLASSICAL_BOUND, TSIRELSON_BOUND};
pub use operations::{Gate, Operation};
pub use circuits::{Circuit, CircuitBuilder};
pub use simulation::Simulator;
pub use oracle::{Histogram, MeasurementOracle, OracleError, OracleResponse, SubmitOptions};
pub use protocol::{
    Accumulator, AttackModel, BasisScheduler, CancelToken, ChshStatistic, DecodedTrial, Outcome, ProtocolReport,
    ProtocolRun, ProtocolRunner, Trial, TrialSpec, TrialSpecBuilder,
};
pub use config::E91Config;
pub use validation::{check_normalization, validate_state};

// Example 1: Ideal run without an eavesdropper
// Every compatible pair agrees and the CHSH value lands near 2√2.
/// ```
/// use e91::{E91Config, E91Error, ProtocolRunner, Simulator};
///
/// let config = E91Config { trials: 2_000, seed: 7, ..E91Config::default() };
/// let runner = ProtocolRunner::new(Simulator::with_seed(7), config)?;
/// let run = runner.run()?;
/// println!("{}", run.report);
///
/// assert_eq!(run.report.mismatch_count, 0);
/// assert_eq!(run.report.error_counter, 0);
/// assert_eq!(run.report.sifted_key_length, run.key.len());
/// let s = run.report.chsh.clone()?.value;
/// assert!(s > e91::CLASSICAL_BOUND);
/// # Ok::<(), E91Error>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Eavesdropper on every trial
// Intercept-resend destroys the entanglement, so S no longer violates the
// classical bound and the sifted key picks up mismatches.
/// ```
/// use e91::{E91Config, E91Error, ProtocolRunner, Simulator};
///
/// let config = E91Config {
///     trials: 4_000,
///     eve_enabled: true,
///     eve_probability: 1.0,
///     seed: 11,
///     ..E91Config::default()
/// };
/// let run = ProtocolRunner::new(Simulator::with_seed(11), config)?.run()?;
///
/// let s = run.report.chsh.clone()?.value;
/// assert!(s <= e91::CLASSICAL_BOUND);
/// assert!(run.report.mismatch_count > 0);
/// # Ok::<(), E91Error>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item
