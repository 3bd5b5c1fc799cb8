// src/simulation/mod.rs

//! Local reference oracle.
//!
//! `Simulator` executes trial circuits on a dense state vector and samples
//! outcomes with the Born rule. Every trial draws from its own RNG stream,
//! derived from the simulator seed and the trial index, so results do not
//! depend on how trials are batched or on how many workers submit them.

mod results;
pub(crate) mod engine;

pub use results::ShotRecord;

use crate::circuits::Circuit;
use crate::config::LOCAL_SIMULATOR;
use crate::core::E91Error;
use crate::oracle::{Histogram, MeasurementOracle, OracleError, OracleResponse, SubmitOptions};
use crate::operations::Operation;
use crate::protocol::TrialSpec;
use engine::SimulationEngine;
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// State-vector backend implementing `MeasurementOracle`.
#[derive(Debug, Clone)]
pub struct Simulator {
    seed: u64,
    backend_id: String,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            backend_id: LOCAL_SIMULATOR.to_string(),
        }
    }

    pub fn backend_id(&self) -> &str {
        &self.backend_id
    }

    /// Runs `circuit` once and returns the bits of its terminal measurement.
    pub fn run(&self, circuit: &Circuit, rng: &mut StdRng) -> Result<ShotRecord, E91Error> {
        let mut record = ShotRecord::new();
        if circuit.is_empty() {
            return Ok(record);
        }
        let mut engine = SimulationEngine::init(circuit.qubits())?;
        for op in circuit.operations() {
            engine.apply(op, rng, &mut record)?;
        }
        Ok(record)
    }

    /// Executes `spec` `shots` times and histograms the outcomes.
    pub fn execute(&self, spec: &TrialSpec, shots: u32) -> Result<Histogram, E91Error> {
        if !spec
            .circuit
            .operations()
            .iter()
            .any(|op| matches!(op, Operation::Measure { .. }))
        {
            return Err(E91Error::InvalidOperation {
                message: format!("circuit '{}' has no terminal measurement", spec.name()),
            });
        }
        let mut rng = self.trial_rng(spec.index());
        let mut histogram = Histogram::new();
        for _ in 0..shots {
            let record = self.run(&spec.circuit, &mut rng)?;
            *histogram.entry(record.bitstring()).or_insert(0) += 1;
        }
        Ok(histogram)
    }

    /// Independent stream per trial index.
    fn trial_rng(&self, index: usize) -> StdRng {
        let mixed = self.seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        StdRng::seed_from_u64(mixed)
    }
}

impl MeasurementOracle for Simulator {
    fn submit(&self, requests: &[TrialSpec], options: &SubmitOptions) -> Result<OracleResponse, OracleError> {
        if options.backend_id != self.backend_id {
            return Err(OracleError::BackendUnavailable {
                backend: options.backend_id.clone(),
                message: format!("only '{}' is available locally", self.backend_id),
            });
        }
        debug!("simulating {} circuits with {} shots", requests.len(), options.shots);

        let mut response = OracleResponse::new();
        for spec in requests {
            match self.execute(spec, options.shots) {
                Ok(histogram) => response.insert(spec.index(), histogram),
                // Left unresolved; the runner reports it as absent.
                Err(err) => warn!("circuit '{}' failed: {}", spec.name(), err),
            }
        }
        Ok(response)
    }
}
