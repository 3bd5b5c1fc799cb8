// src/oracle/mod.rs

//! The measurement oracle contract.
//!
//! An oracle prepares the entangled pair, runs each trial circuit and hands
//! back one outcome histogram per trial. The protocol engine only ever sees
//! this trait; `crate::simulation::Simulator` is the local reference
//! implementation.

use crate::protocol::TrialSpec;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Outcome bitstring (Alice's bit first) to observed count.
pub type Histogram = BTreeMap<String, u64>;

/// Execution parameters forwarded to the backend with every submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOptions {
    /// Repetitions per circuit. The protocol always uses 1.
    pub shots: u32,
    pub backend_id: String,
    pub max_credits: u32,
    /// How long the backend may queue before starting.
    pub wait_seconds: f64,
    /// Bound on the runner's wait for one submission; `0` waits indefinitely.
    pub timeout_seconds: f64,
}

/// Histograms keyed by trial index, the identity of a `TrialSpec`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OracleResponse {
    histograms: BTreeMap<usize, Histogram>,
}

impl OracleResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, trial: usize, histogram: Histogram) {
        self.histograms.insert(trial, histogram);
    }

    pub fn get(&self, trial: usize) -> Option<&Histogram> {
        self.histograms.get(&trial)
    }

    pub fn contains(&self, trial: usize) -> bool {
        self.histograms.contains_key(&trial)
    }

    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Absorbs `other`; later entries win on a duplicate index.
    pub fn merge(&mut self, other: OracleResponse) {
        self.histograms.extend(other.histograms);
    }

    pub fn into_inner(self) -> BTreeMap<usize, Histogram> {
        self.histograms
    }
}

impl FromIterator<(usize, Histogram)> for OracleResponse {
    fn from_iter<I: IntoIterator<Item = (usize, Histogram)>>(iter: I) -> Self {
        Self {
            histograms: iter.into_iter().collect(),
        }
    }
}

/// Failures a backend may report.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum OracleError {
    #[error("backend '{backend}' unavailable: {message}")]
    BackendUnavailable { backend: String, message: String },

    /// The bounded wait elapsed. Whatever finished is in `partial`.
    #[error("oracle timed out with {} of the requested trials resolved", .partial.len())]
    Timeout { partial: OracleResponse },

    #[error("quota exceeded: {message}")]
    QuotaExceeded { message: String },
}

impl OracleError {
    /// Timeouts and outages are worth another attempt; quota is not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::BackendUnavailable { .. } | OracleError::Timeout { .. })
    }
}

/// A backend able to execute E91 trial circuits.
///
/// Implementations must be shareable across the runner's worker threads.
pub trait MeasurementOracle: Send + Sync {
    /// Executes `requests` and returns one histogram per resolved trial.
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError>;
}

impl<O: MeasurementOracle + ?Sized> MeasurementOracle for &O {
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        (**self).submit(requests, options)
    }
}

impl<O: MeasurementOracle + ?Sized> MeasurementOracle for std::sync::Arc<O> {
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        (**self).submit(requests, options)
    }
}
