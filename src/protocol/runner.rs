// src/protocol/runner.rs

//! Drives one protocol run end to end.
//!
//! Scheduling and aggregation are single-threaded and in trial order. Only
//! oracle submissions run concurrently, one batch per rayon task. A trial
//! that is still unresolved once retries are exhausted, the quota is spent
//! or the run is cancelled becomes `Observation::Absent` and is excluded
//! from every aggregate.
//!
//! A positive `timeout_seconds` bounds every submission. The call runs on
//! its own thread and is abandoned once the deadline passes; the runner
//! then treats it as a timeout with nothing resolved.

use crate::config::E91Config;
use crate::core::{E91Error, E91Result};
use crate::oracle::{MeasurementOracle, OracleError, OracleResponse, SubmitOptions};
use crate::protocol::{
    Accumulator, AttackModel, ChshEvaluator, DecodedTrial, ErrorAnalyzer, KeySifter, Observation, OutcomeDecoder,
    ProtocolReport, ResultReporter, SiftedKey, TrialSpec, TrialSpecBuilder,
};
use log::{debug, info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Bounded retries with exponential backoff for a single batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }
}

/// Shared flag that stops a run from issuing further oracle requests.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct ProtocolRun {
    /// One record per scheduled trial, in index order.
    pub trials: Vec<DecodedTrial>,
    pub key: SiftedKey,
    pub report: ProtocolReport,
}

/// Runs the E91 protocol against a measurement oracle.
pub struct ProtocolRunner<O> {
    oracle: Arc<O>,
    config: E91Config,
    builder: TrialSpecBuilder,
    cancel: CancelToken,
    /// Set once the backend reports an exhausted quota.
    quota_exhausted: AtomicBool,
}

impl<O: MeasurementOracle + 'static> ProtocolRunner<O> {
    pub fn new(oracle: O, config: E91Config) -> E91Result<Self> {
        config.validate()?;
        Ok(Self {
            oracle: Arc::new(oracle),
            config,
            builder: TrialSpecBuilder::new(),
            cancel: CancelToken::new(),
            quota_exhausted: AtomicBool::new(false),
        })
    }

    pub fn with_attack_model(mut self, attack: AttackModel) -> Self {
        self.builder = TrialSpecBuilder::with_attack_model(attack);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &E91Config {
        &self.config
    }

    pub fn run(&self) -> E91Result<ProtocolRun> {
        let config = &self.config;
        info!(
            "starting E91 run: {} trials on '{}' (eavesdropper: {})",
            config.trials,
            config.backend,
            if config.eve_enabled {
                format!("p = {}", config.eve_probability)
            } else {
                "off".to_string()
            }
        );
        self.quota_exhausted.store(false, Ordering::SeqCst);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let trials = config.scheduler()?.schedule(config.trials, &mut rng);
        let specs = self.builder.build_all(&trials);
        let response = self.resolve(&specs)?;

        let decoded: Vec<DecodedTrial> = trials
            .iter()
            .map(|trial| OutcomeDecoder::observe(trial, response.get(trial.index)))
            .collect();

        let mut sifter = KeySifter::new();
        let mut errors = ErrorAnalyzer::new();
        let mut chsh = ChshEvaluator::new();
        let mut malformed = 0;
        let mut absent = 0;
        for record in &decoded {
            match record.observation {
                Observation::Malformed => malformed += 1,
                Observation::Absent => absent += 1,
                Observation::Observed(_) => {}
            }
            sifter.observe(record);
            errors.observe(record);
            chsh.observe(record);
        }
        if malformed > 0 || absent > 0 {
            warn!("{} malformed and {} unresolved trials excluded from all aggregates", malformed, absent);
        }

        let statistic = chsh.evaluate();
        if let Err(err) = &statistic {
            warn!("CHSH statistic unavailable: {}", err);
        }
        let report = ResultReporter::assemble(trials.len(), &sifter, &errors, statistic, malformed, absent);
        info!(
            "run finished: sifted key {} bits, {} mismatches, {} measurement errors",
            report.sifted_key_length, report.mismatch_count, report.error_counter
        );

        Ok(ProtocolRun {
            trials: decoded,
            key: sifter.into_key(),
            report,
        })
    }

    /// Submits all specs in batches on a pool of `workers` threads.
    fn resolve(&self, specs: &[TrialSpec]) -> E91Result<OracleResponse> {
        let options = self.config.submit_options();
        let policy = self.config.retry_policy();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|err| E91Error::InvalidConfig {
                message: format!("cannot start {} oracle workers: {}", self.config.workers, err),
            })?;

        let responses: Vec<OracleResponse> = pool.install(|| {
            specs
                .par_chunks(self.config.batch_size)
                .map(|batch| self.submit_with_retry(batch, &options, &policy))
                .collect()
        });

        let mut merged = OracleResponse::new();
        for response in responses {
            merged.merge(response);
        }
        Ok(merged)
    }

    /// One submission, waiting at most `timeout_seconds` when it is
    /// positive. `0` waits for the oracle indefinitely.
    fn submit_bounded(&self, pending: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        if options.timeout_seconds <= 0.0 {
            return self.oracle.submit(pending, options);
        }
        let deadline = Duration::try_from_secs_f64(options.timeout_seconds).unwrap_or(Duration::MAX);
        let (tx, rx) = mpsc::channel();
        let oracle = Arc::clone(&self.oracle);
        let requests = pending.to_vec();
        let submit_options = options.clone();
        std::thread::spawn(move || {
            // The receiver is gone if the deadline already passed.
            let _ = tx.send(oracle.submit(&requests, &submit_options));
        });

        match rx.recv_timeout(deadline) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                debug!("no answer for {} trials within {:?}", pending.len(), deadline);
                Err(OracleError::Timeout {
                    partial: OracleResponse::new(),
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(OracleError::BackendUnavailable {
                backend: options.backend_id.clone(),
                message: "oracle worker exited without a response".to_string(),
            }),
        }
    }

    /// Resolves as much of `batch` as the policy allows. Timeouts keep
    /// their partial results and only the remainder is resubmitted.
    fn submit_with_retry(&self, batch: &[TrialSpec], options: &SubmitOptions, policy: &RetryPolicy) -> OracleResponse {
        let mut resolved = OracleResponse::new();
        let mut pending: Vec<TrialSpec> = batch.to_vec();
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                debug!("run cancelled; {} trials left unsubmitted", pending.len());
                break;
            }
            if self.quota_exhausted.load(Ordering::SeqCst) {
                break;
            }

            debug!("submitting {} trials (attempt {})", pending.len(), attempt + 1);
            match self.submit_bounded(&pending, options) {
                Ok(response) => {
                    resolved.merge(response);
                    break;
                }
                Err(OracleError::Timeout { partial }) => {
                    warn!("oracle timed out; {} of {} trials resolved", partial.len(), pending.len());
                    resolved.merge(partial);
                }
                Err(err) if err.is_retryable() => {
                    warn!("{}", err);
                }
                Err(err) => {
                    warn!("{}; no further requests will be issued", err);
                    self.quota_exhausted.store(true, Ordering::SeqCst);
                    break;
                }
            }

            pending.retain(|spec| !resolved.contains(spec.index()));
            if pending.is_empty() {
                break;
            }
            if attempt >= policy.max_retries {
                warn!("giving up on {} trials after {} retries", pending.len(), policy.max_retries);
                break;
            }
            attempt += 1;
            std::thread::sleep(policy.backoff(attempt));
        }

        // Only keep what was asked for.
        batch
            .iter()
            .filter_map(|spec| resolved.get(spec.index()).map(|h| (spec.index(), h.clone())))
            .collect()
    }
}
