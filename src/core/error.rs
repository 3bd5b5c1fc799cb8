//! Error handling logic

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::basis::BasisPair;
use crate::oracle::OracleError;

/// Result alias used throughout the crate.
pub type E91Result<T> = Result<T, E91Error>;

/// Identifier of a qubit inside a trial circuit.
/// Qubit 0 is routed to Alice, qubit 1 to Bob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QubitId(pub u64);

impl fmt::Display for QubitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q[{}]", self.0)
    }
}

/// Failures raised by the protocol engine and the reference simulator.
///
/// Decoding and statistics failures are data-derived: a bad histogram or a
/// CHSH category that never received a trial. Everything else is either a
/// configuration problem or an oracle fault.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum E91Error {
    /// A shots=1 histogram did not contain exactly one recognised outcome.
    #[error("Malformed outcome for trial {trial}: {message}")]
    MalformedOutcome {
        /// Index of the offending trial
        trial: usize,
        /// What was wrong with the histogram
        message: String,
    },

    /// A CHSH basis category received zero observed trials.
    #[error("Insufficient samples: CHSH category {category} has no observed trials")]
    InsufficientSamples {
        /// The empty category
        category: BasisPair,
    },

    /// Run parameters outside their allowed range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// InvalidConfig failure message
        message: String,
    },

    /// An operation is inconsistent with the circuit it appears in.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// InvalidOperation failure message
        message: String,
    },

    /// A qubit was referenced that the circuit never allocated.
    #[error("Reference violation ({qubit}): {message}")]
    ReferenceViolation {
        /// The unknown qubit
        qubit: QubitId,
        /// ReferenceViolation failure message
        message: String,
    },

    /// General error encountered inside the state-vector simulation.
    #[error("Simulation error: {message}")]
    SimulationError {
        /// SimulationError failure message
        message: String,
    },

    /// The measurement oracle failed and the failure could not be absorbed.
    #[error("Oracle failure: {0}")]
    Oracle(#[from] OracleError),

    /// Reading a configuration file failed.
    #[error("I/O error: {message}")]
    Io {
        /// Io failure message
        message: String,
    },

    /// A configuration document could not be parsed.
    #[error("JSON error: {message}")]
    Json {
        /// Json failure message
        message: String,
    },
}

impl From<std::io::Error> for E91Error {
    fn from(err: std::io::Error) -> Self {
        E91Error::Io { message: err.to_string() }
    }
}

impl From<serde_json::Error> for E91Error {
    fn from(err: serde_json::Error) -> Self {
        E91Error::Json { message: err.to_string() }
    }
}
