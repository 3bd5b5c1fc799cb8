// src/protocol/report.rs

use crate::core::{E91Error, E91Result};
use crate::protocol::{ChshStatistic, ErrorAnalyzer, KeySifter};
use serde::Serialize;
use std::fmt;

/// Summary of one protocol run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolReport {
    pub trial_count: usize,
    /// Fails alone when a CHSH category is empty; the other fields are
    /// still meaningful.
    pub chsh: E91Result<ChshStatistic>,
    pub sifted_key_length: usize,
    pub mismatch_count: usize,
    pub error_counter: usize,
    /// Trials whose histogram was unusable.
    pub malformed_count: usize,
    /// Trials the oracle never resolved.
    pub absent_count: usize,
}

impl ProtocolReport {
    /// `S` rounded to three decimals, as printed.
    pub fn rounded_chsh_value(&self) -> Option<f64> {
        self.chsh.as_ref().ok().map(|stat| round3(stat.value))
    }

    pub fn rounded_chsh_deviation(&self) -> Option<f64> {
        self.chsh.as_ref().ok().map(|stat| round3(stat.deviation))
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Assembles the final report from the finished aggregates. Reads only.
pub struct ResultReporter;

impl ResultReporter {
    pub fn assemble(
        trial_count: usize,
        sifter: &KeySifter,
        errors: &ErrorAnalyzer,
        chsh: E91Result<ChshStatistic>,
        malformed_count: usize,
        absent_count: usize,
    ) -> ProtocolReport {
        ProtocolReport {
            trial_count,
            chsh,
            sifted_key_length: sifter.sifted_key_length(),
            mismatch_count: sifter.mismatch_count(),
            error_counter: errors.error_counter(),
            malformed_count,
            absent_count,
        }
    }
}

impl fmt::Display for ProtocolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chsh {
            Ok(stat) => {
                writeln!(f, "CHSH correlation value is {:.3}", stat.value)?;
                writeln!(f, "Difference from the ideal case is {:.3}", stat.deviation)?;
            }
            Err(E91Error::InsufficientSamples { category }) => {
                writeln!(f, "CHSH correlation value is unavailable: no trials measured in {}", category)?;
            }
            Err(err) => writeln!(f, "CHSH correlation value is unavailable: {}", err)?,
        }
        writeln!(f)?;
        writeln!(f, "Length of the sifted key is {}", self.sifted_key_length)?;
        writeln!(f, "Number of mismatching bits is {}", self.mismatch_count)?;
        writeln!(f)?;
        writeln!(f, "Number of errors of measurements is {}", self.error_counter)?;
        if self.malformed_count > 0 || self.absent_count > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "Warning: {} of {} trials excluded ({} malformed, {} unresolved)",
                self.malformed_count + self.absent_count,
                self.trial_count,
                self.malformed_count,
                self.absent_count
            )?;
        }
        Ok(())
    }
}
