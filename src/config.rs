// src/config.rs

//! Run configuration.
//!
//! Defaults reproduce the reference run: 300 trials, no eavesdropper, the
//! local simulator, one shot per circuit.

use crate::core::{E91Error, E91Result};
use crate::oracle::SubmitOptions;
use crate::protocol::{BasisScheduler, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Backend id of `crate::simulation::Simulator`.
pub const LOCAL_SIMULATOR: &str = "local_qasm_simulator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct E91Config {
    /// Number of entangled pairs measured.
    pub trials: usize,
    pub eve_enabled: bool,
    /// Probability that Eve intercepts a given trial, in `[0, 1]`.
    pub eve_probability: f64,
    pub backend: String,
    /// Seed of the basis scheduler.
    pub seed: u64,
    pub shots: u32,
    pub max_credits: u32,
    pub wait_seconds: f64,
    /// Longest wait for one oracle submission; `0` waits indefinitely.
    pub timeout_seconds: f64,
    /// Extra attempts after the first submission of a batch.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Trials per oracle submission.
    pub batch_size: usize,
    /// Concurrent oracle submissions.
    pub workers: usize,
}

impl Default for E91Config {
    fn default() -> Self {
        Self {
            trials: 300,
            eve_enabled: false,
            eve_probability: 1.0,
            backend: LOCAL_SIMULATOR.to_string(),
            seed: 91,
            shots: 1,
            max_credits: 12,
            wait_seconds: 60.0,
            timeout_seconds: 0.0,
            max_retries: 3,
            initial_backoff_ms: 250,
            max_backoff_ms: 8_000,
            batch_size: 100,
            workers: 1,
        }
    }
}

impl E91Config {
    pub fn from_json_str(json: &str) -> E91Result<Self> {
        let config: E91Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> E91Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> E91Result<()> {
        let invalid = |message: String| Err(E91Error::InvalidConfig { message });
        if self.trials == 0 {
            return invalid("trial count must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.eve_probability) {
            return invalid(format!("eve_probability {} is outside [0, 1]", self.eve_probability));
        }
        if self.shots != 1 {
            return invalid(format!("shots must be 1 for key generation, got {}", self.shots));
        }
        if self.batch_size == 0 {
            return invalid("batch_size must be at least 1".to_string());
        }
        if self.workers == 0 {
            return invalid("workers must be at least 1".to_string());
        }
        if self.backend.trim().is_empty() {
            return invalid("backend must not be empty".to_string());
        }
        if !(self.wait_seconds >= 0.0 && self.timeout_seconds >= 0.0) {
            return invalid("wait_seconds and timeout_seconds must be non-negative".to_string());
        }
        Ok(())
    }

    pub fn scheduler(&self) -> E91Result<BasisScheduler> {
        if self.eve_enabled {
            BasisScheduler::with_eavesdropper(self.eve_probability)
        } else {
            Ok(BasisScheduler::new())
        }
    }

    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            shots: self.shots,
            backend_id: self.backend.clone(),
            max_credits: self.max_credits,
            wait_seconds: self.wait_seconds,
            timeout_seconds: self.timeout_seconds,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms.max(self.initial_backoff_ms)),
        }
    }
}
