// src/protocol/decoder.rs

//! Histogram decoding and the signed-value convention.

use crate::core::{E91Error, E91Result};
use crate::oracle::Histogram;
use crate::protocol::Trial;
use log::warn;
use serde::Serialize;
use std::fmt;

/// Joint outcome of one shot: Alice's bit, then Bob's bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    ZeroZero,
    ZeroOne,
    OneZero,
    OneOne,
}

impl Outcome {
    /// Bucket order used by every count table.
    pub const ALL: [Outcome; 4] = [Outcome::ZeroZero, Outcome::ZeroOne, Outcome::OneZero, Outcome::OneOne];

    /// Parses a histogram key. Anything but the four two-bit strings is
    /// rejected.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "00" => Some(Outcome::ZeroZero),
            "01" => Some(Outcome::ZeroOne),
            "10" => Some(Outcome::OneZero),
            "11" => Some(Outcome::OneOne),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Outcome::ZeroZero => "00",
            Outcome::ZeroOne => "01",
            Outcome::OneZero => "10",
            Outcome::OneOne => "11",
        }
    }

    /// Position in `Outcome::ALL`.
    pub fn bucket(self) -> usize {
        match self {
            Outcome::ZeroZero => 0,
            Outcome::ZeroOne => 1,
            Outcome::OneZero => 2,
            Outcome::OneOne => 3,
        }
    }

    /// Bit 0 maps to -1 and bit 1 to +1 for each party. This encodes the
    /// Bell-state convention the CHSH signs depend on.
    pub fn signed(self) -> SignedResult {
        match self {
            Outcome::ZeroZero => SignedResult { alice: -1, bob: -1 },
            Outcome::ZeroOne => SignedResult { alice: -1, bob: 1 },
            Outcome::OneZero => SignedResult { alice: 1, bob: -1 },
            Outcome::OneOne => SignedResult { alice: 1, bob: 1 },
        }
    }

    /// `01` or `10`.
    pub fn is_anticorrelated(self) -> bool {
        matches!(self, Outcome::ZeroOne | Outcome::OneZero)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|{}>", self.key())
    }
}

/// Alice's and Bob's result as ±1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SignedResult {
    pub alice: i8,
    pub bob: i8,
}

/// What the run knows about one trial after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Observed(Outcome),
    /// The oracle never returned a histogram for this trial.
    Absent,
    /// The histogram did not hold exactly one recognised outcome.
    Malformed,
}

/// A trial joined with its observation; the only per-trial record the
/// aggregators consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTrial {
    pub trial: Trial,
    pub observation: Observation,
}

impl DecodedTrial {
    /// The outcome, if one was observed.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.observation {
            Observation::Observed(outcome) => Some(outcome),
            Observation::Absent | Observation::Malformed => None,
        }
    }
}

/// Decodes shots=1 histograms.
pub struct OutcomeDecoder;

impl OutcomeDecoder {
    /// The single outcome of `histogram`.
    ///
    /// Zero-count entries are ignored. No nonzero entry, several nonzero
    /// entries or an unrecognised key yield `E91Error::MalformedOutcome`.
    pub fn decode(trial: usize, histogram: &Histogram) -> E91Result<Outcome> {
        let mut populated = histogram.iter().filter(|(_, count)| **count > 0);
        let (key, _) = populated.next().ok_or_else(|| E91Error::MalformedOutcome {
            trial,
            message: "histogram has no populated outcome".to_string(),
        })?;
        let extra = populated.count();
        if extra > 0 {
            return Err(E91Error::MalformedOutcome {
                trial,
                message: format!("histogram has {} populated outcomes, expected 1", extra + 1),
            });
        }
        Outcome::from_key(key).ok_or_else(|| E91Error::MalformedOutcome {
            trial,
            message: format!("unrecognised outcome key '{}'", key),
        })
    }

    /// Joins `trial` with whatever the oracle returned for it.
    pub fn observe(trial: &Trial, histogram: Option<&Histogram>) -> DecodedTrial {
        let observation = match histogram {
            None => Observation::Absent,
            Some(histogram) => match Self::decode(trial.index, histogram) {
                Ok(outcome) => Observation::Observed(outcome),
                Err(err) => {
                    warn!("{}: {}", trial, err);
                    Observation::Malformed
                }
            },
        };
        DecodedTrial {
            trial: *trial,
            observation,
        }
    }
}
