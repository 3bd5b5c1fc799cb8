// tests/protocol_tests.rs

use e91::protocol::{Accumulator, ChshEvaluator, ErrorAnalyzer, InterceptHandler, KeySifter, Observation};
use e91::{
    AttackModel, Basis, BasisPair, CancelToken, E91Config, E91Error, Gate, MeasurementOracle, Operation,
    OracleError, OracleResponse, Party, ProtocolRun, ProtocolRunner, QubitId, Simulator, SubmitOptions, TrialSpec,
    CLASSICAL_BOUND, TSIRELSON_BOUND,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

fn config(trials: usize, seed: u64) -> E91Config {
    E91Config {
        trials,
        seed,
        initial_backoff_ms: 1,
        max_backoff_ms: 4,
        ..E91Config::default()
    }
}

fn run_with(config: E91Config) -> Result<ProtocolRun, E91Error> {
    let simulator = Simulator::with_seed(config.seed);
    ProtocolRunner::new(simulator, config)?.run()
}

fn chsh_value(run: &ProtocolRun) -> Result<f64, E91Error> {
    Ok(run.report.chsh.clone()?.value)
}

// --- Ideal runs ---

#[test]
fn test_ideal_run_has_no_mismatches_or_errors() -> Result<(), E91Error> {
    let run = run_with(config(300, 91))?;
    assert_eq!(run.report.trial_count, 300);
    assert_eq!(run.report.mismatch_count, 0);
    assert_eq!(run.report.error_counter, 0);
    assert_eq!(run.report.malformed_count, 0);
    assert_eq!(run.report.absent_count, 0);
    assert_eq!(run.key.alice(), run.key.bob());
    Ok(())
}

#[test]
fn test_sifted_key_covers_exactly_the_compatible_trials() -> Result<(), E91Error> {
    let run = run_with(config(500, 3))?;
    let compatible = run
        .trials
        .iter()
        .filter(|t| t.trial.bases().is_compatible() && t.outcome().is_some())
        .count();
    assert_eq!(run.report.sifted_key_length, compatible);
    assert_eq!(run.key.len(), compatible);
    for bit in run.key.alice() {
        assert!(*bit == 1 || *bit == -1);
    }
    Ok(())
}

#[test]
fn test_trials_come_back_in_order_with_recognised_outcomes() -> Result<(), E91Error> {
    let run = run_with(E91Config {
        batch_size: 13,
        workers: 3,
        ..config(200, 8)
    })?;
    assert_eq!(run.trials.len(), 200);
    for (i, record) in run.trials.iter().enumerate() {
        assert_eq!(record.trial.index, i);
        assert!(
            matches!(record.observation, Observation::Observed(_)),
            "trial {} was {:?}",
            i,
            record.observation
        );
    }
    Ok(())
}

#[test]
fn test_reference_run_violates_the_classical_bound() -> Result<(), E91Error> {
    let run = run_with(config(300, 91))?;
    let s = chsh_value(&run)?;
    assert!((s - TSIRELSON_BOUND).abs() < 0.8, "S = {}", s);
    let deviation = run.report.chsh.clone()?.deviation;
    assert!((deviation - (s - TSIRELSON_BOUND).abs()).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_reference_runs_average_close_to_tsirelson_bound() -> Result<(), E91Error> {
    // One 300-trial run scatters by about 0.25; the mean of 20 by about 0.06.
    let mut total = 0.0;
    for seed in 0..20 {
        total += chsh_value(&run_with(config(300, 1_000 + seed))?)?;
    }
    let mean = total / 20.0;
    assert!((mean - TSIRELSON_BOUND).abs() < 0.2, "mean S = {}", mean);
    Ok(())
}

#[test]
fn test_large_run_converges_to_tsirelson_bound() -> Result<(), E91Error> {
    let run = run_with(config(20_000, 2024))?;
    let s = chsh_value(&run)?;
    assert!((s - TSIRELSON_BOUND).abs() < 0.15, "S = {}", s);
    assert_eq!(run.report.mismatch_count, 0);
    Ok(())
}

// --- Eavesdropping ---

#[test]
fn test_full_interception_restores_classical_statistics() -> Result<(), E91Error> {
    let run = run_with(E91Config {
        eve_enabled: true,
        eve_probability: 1.0,
        ..config(4_000, 5)
    })?;
    let s = chsh_value(&run)?;
    assert!(s <= CLASSICAL_BOUND, "S = {}", s);
    assert!(run.report.mismatch_count > 0);
    Ok(())
}

#[test]
fn test_zero_probability_eavesdropper_never_intercepts() -> Result<(), E91Error> {
    let run = run_with(E91Config {
        eve_enabled: true,
        eve_probability: 0.0,
        ..config(300, 12)
    })?;
    assert!(run.trials.iter().all(|t| !t.trial.is_intercepted()));
    assert_eq!(run.report.mismatch_count, 0);
    Ok(())
}

/// Flips Bob's qubit whenever an interception is scheduled for it.
#[derive(Debug)]
struct FlipBob;

impl InterceptHandler for FlipBob {
    fn operations(&self, party: Party, _basis: Basis, target: QubitId) -> Vec<Operation> {
        let gate = match party {
            Party::Alice => Gate::Identity,
            Party::Bob => Gate::PauliX,
        };
        vec![Operation::Gate { target, gate }]
    }
}

#[test]
fn test_custom_attack_model_is_applied() -> Result<(), E91Error> {
    let config = E91Config {
        eve_enabled: true,
        ..config(2_000, 21)
    };
    let run = ProtocolRunner::new(Simulator::with_seed(21), config)?
        .with_attack_model(AttackModel::Custom(Arc::new(FlipBob)))
        .run()?;
    // (A3,B2) measures both qubits along Z, so a flipped Bob always disagrees.
    let flipped_z = run.trials.iter().filter(|t| {
        t.trial.bases() == BasisPair::new(Basis::B3, Basis::B2) && t.trial.eve_basis_b.number() != 0
    });
    assert!(flipped_z.clone().count() > 0);
    for record in flipped_z {
        assert!(record.outcome().is_some_and(|o| o.is_anticorrelated()));
    }
    assert!(run.report.mismatch_count > 0);
    Ok(())
}

// --- Determinism ---

#[test]
fn test_same_seed_reproduces_the_run() -> Result<(), E91Error> {
    let first = run_with(config(400, 77))?;
    let second = run_with(config(400, 77))?;
    assert_eq!(first.trials, second.trials);
    assert_eq!(first.report, second.report);
    Ok(())
}

#[test]
fn test_batching_and_workers_do_not_change_results() -> Result<(), E91Error> {
    let serial = run_with(E91Config {
        batch_size: 400,
        workers: 1,
        ..config(400, 31)
    })?;
    let parallel = run_with(E91Config {
        batch_size: 7,
        workers: 4,
        ..config(400, 31)
    })?;
    assert_eq!(serial.trials, parallel.trials);
    assert_eq!(serial.report, parallel.report);
    Ok(())
}

#[test]
fn test_partitioned_fold_matches_ordered_fold() -> Result<(), E91Error> {
    let run = run_with(E91Config {
        eve_enabled: true,
        eve_probability: 0.5,
        ..config(600, 44)
    })?;
    let (head, tail) = run.trials.split_at(250);

    let mut sifter = KeySifter::fold(head);
    sifter.merge(KeySifter::fold(tail));
    assert_eq!(sifter.key(), &run.key);
    assert_eq!(sifter.mismatch_count(), run.report.mismatch_count);

    let mut errors = ErrorAnalyzer::fold(tail);
    errors.merge(ErrorAnalyzer::fold(head));
    assert_eq!(errors.error_counter(), run.report.error_counter);

    let mut chsh = ChshEvaluator::fold(tail);
    chsh.merge(ChshEvaluator::fold(head));
    assert_eq!(chsh.evaluate(), run.report.chsh);
    Ok(())
}

// --- Degenerate inputs ---

#[test]
fn test_single_trial_reports_insufficient_samples() -> Result<(), E91Error> {
    let run = run_with(config(1, 4))?;
    assert!(matches!(run.report.chsh, Err(E91Error::InsufficientSamples { .. })));
    assert!(run.report.sifted_key_length <= 1);
    assert_eq!(run.report.mismatch_count, 0);
    assert_eq!(run.report.error_counter, 0);
    assert!(run.report.to_string().contains("CHSH correlation value is unavailable"));
    Ok(())
}

#[test]
fn test_invalid_configuration_is_rejected_up_front() {
    let result = ProtocolRunner::new(Simulator::new(), E91Config {
        eve_probability: -0.1,
        ..E91Config::default()
    });
    assert!(matches!(result, Err(E91Error::InvalidConfig { .. })));
}

// --- Unreliable oracles ---

/// Times out on the first call with only the even trials resolved.
struct FlakyOracle {
    inner: Simulator,
    calls: AtomicUsize,
}

impl MeasurementOracle for FlakyOracle {
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        let response = self.inner.submit(requests, options)?;
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            let partial = response.into_inner().into_iter().filter(|(i, _)| i % 2 == 0).collect();
            return Err(OracleError::Timeout { partial });
        }
        Ok(response)
    }
}

#[test]
fn test_timeout_keeps_partial_results_and_retries_the_rest() -> Result<(), E91Error> {
    let config = config(120, 6);
    let oracle = Arc::new(FlakyOracle {
        inner: Simulator::with_seed(6),
        calls: AtomicUsize::new(0),
    });
    let flaky = ProtocolRunner::new(Arc::clone(&oracle), config.clone())?.run()?;
    let clean = run_with(config)?;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 3);
    assert_eq!(flaky.report.absent_count, 0);
    assert_eq!(flaky.trials, clean.trials);
    assert_eq!(flaky.report, clean.report);
    Ok(())
}

/// Never reachable.
struct DownOracle {
    calls: AtomicUsize,
}

impl MeasurementOracle for DownOracle {
    fn submit(&self, _requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OracleError::BackendUnavailable {
            backend: options.backend_id.clone(),
            message: "maintenance".to_string(),
        })
    }
}

#[test]
fn test_exhausted_retries_leave_trials_absent() -> Result<(), E91Error> {
    let oracle = Arc::new(DownOracle {
        calls: AtomicUsize::new(0),
    });
    let run = ProtocolRunner::new(Arc::clone(&oracle), E91Config {
        max_retries: 2,
        batch_size: 10,
        ..config(30, 1)
    })?
    .run()?;

    // Three batches, one attempt plus two retries each.
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 9);
    assert_eq!(run.report.absent_count, 30);
    assert_eq!(run.report.sifted_key_length, 0);
    assert!(matches!(run.report.chsh, Err(E91Error::InsufficientSamples { .. })));
    assert!(run.report.to_string().contains("30 of 30 trials excluded"));
    Ok(())
}

struct QuotaOracle {
    calls: AtomicUsize,
}

impl MeasurementOracle for QuotaOracle {
    fn submit(&self, _requests: &[TrialSpec], _options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(OracleError::QuotaExceeded {
            message: "0 credits left".to_string(),
        })
    }
}

#[test]
fn test_quota_exceeded_stops_further_requests() -> Result<(), E91Error> {
    let oracle = Arc::new(QuotaOracle {
        calls: AtomicUsize::new(0),
    });
    let run = ProtocolRunner::new(Arc::clone(&oracle), E91Config {
        batch_size: 10,
        workers: 1,
        ..config(50, 2)
    })?
    .run()?;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    assert_eq!(run.report.absent_count, 50);
    Ok(())
}

/// Returns a two-outcome histogram for trial 0.
struct NoisyOracle {
    inner: Simulator,
}

impl MeasurementOracle for NoisyOracle {
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        let mut response = self.inner.submit(requests, options)?;
        if response.contains(0) {
            response.insert(0, [("00".to_string(), 1), ("11".to_string(), 1)].into_iter().collect());
        }
        Ok(response)
    }
}

#[test]
fn test_malformed_histogram_is_excluded_and_counted() -> Result<(), E91Error> {
    let oracle = NoisyOracle {
        inner: Simulator::with_seed(10),
    };
    let run = ProtocolRunner::new(oracle, config(100, 10))?.run()?;
    assert_eq!(run.trials[0].observation, Observation::Malformed);
    assert_eq!(run.report.malformed_count, 1);
    assert_eq!(run.report.absent_count, 0);

    let chsh = ChshEvaluator::fold(&run.trials);
    let expected = run
        .trials
        .iter()
        .filter(|t| t.trial.bases().chsh_slot().is_some() && t.outcome().is_some())
        .count();
    assert_eq!(chsh.table().total_trials() as usize, expected);
    Ok(())
}

#[test]
fn test_cancelled_run_submits_nothing() -> Result<(), E91Error> {
    let oracle = Arc::new(DownOracle {
        calls: AtomicUsize::new(0),
    });
    let token = CancelToken::new();
    let runner = ProtocolRunner::new(Arc::clone(&oracle), config(40, 9))?.with_cancel_token(token.clone());
    token.cancel();
    let run = runner.run()?;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 0);
    assert_eq!(run.report.absent_count, 40);
    assert!(run.trials.iter().all(|t| t.observation == Observation::Absent));
    Ok(())
}

/// Sleeps for `delay` on the first `slow_calls` submissions.
struct SlowOracle {
    inner: Simulator,
    delay: Duration,
    slow_calls: usize,
    calls: AtomicUsize,
}

impl MeasurementOracle for SlowOracle {
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.slow_calls {
            std::thread::sleep(self.delay);
        }
        self.inner.submit(requests, options)
    }
}

#[test]
fn test_hung_oracle_is_abandoned_at_the_deadline() -> Result<(), E91Error> {
    let oracle = SlowOracle {
        inner: Simulator::with_seed(3),
        delay: Duration::from_secs(3),
        slow_calls: usize::MAX,
        calls: AtomicUsize::new(0),
    };
    let started = Instant::now();
    let run = ProtocolRunner::new(oracle, E91Config {
        timeout_seconds: 0.2,
        max_retries: 0,
        ..config(20, 3)
    })?
    .run()?;

    assert!(started.elapsed() < Duration::from_millis(1_500), "took {:?}", started.elapsed());
    assert_eq!(run.report.absent_count, 20);
    assert!(run.trials.iter().all(|t| t.observation == Observation::Absent));
    Ok(())
}

#[test]
fn test_slow_submission_is_retried_after_the_deadline() -> Result<(), E91Error> {
    let oracle = Arc::new(SlowOracle {
        inner: Simulator::with_seed(13),
        delay: Duration::from_secs(2),
        slow_calls: 1,
        calls: AtomicUsize::new(0),
    });
    let run = ProtocolRunner::new(Arc::clone(&oracle), E91Config {
        timeout_seconds: 0.2,
        ..config(60, 13)
    })?
    .run()?;
    let clean = run_with(config(60, 13))?;

    assert_eq!(oracle.calls.load(Ordering::SeqCst), 2);
    assert_eq!(run.report.absent_count, 0);
    assert_eq!(run.report, clean.report);
    Ok(())
}
