// src/simulation/engine.rs
use crate::core::constants::e91_constants::AMPLITUDE_TOLERANCE;
use crate::core::{E91Error, QubitId, StateVector};
use crate::operations::{Gate, Operation};
use crate::simulation::ShotRecord;
use crate::validation;
use num_complex::Complex;
use num_traits::Zero;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Dense state-vector engine for a single shot of a circuit.
/// (Internal visibility)
pub(crate) struct SimulationEngine {
    /// Qubit to register position; position 0 is the most significant bit.
    qubit_indices: HashMap<QubitId, usize>,
    state: StateVector,
    num_qubits: usize,
}

impl SimulationEngine {
    /// Starts every qubit in `|0>`.
    pub(crate) fn init(qubits: &HashSet<QubitId>) -> Result<Self, E91Error> {
        if qubits.is_empty() {
            return Err(E91Error::InvalidOperation {
                message: "Cannot initialize simulation engine with zero qubits".to_string(),
            });
        }
        let num_qubits = qubits.len();
        if num_qubits >= usize::BITS as usize {
            return Err(E91Error::SimulationError {
                message: format!("{} qubits overflow the state vector dimension", num_qubits),
            });
        }

        // Sorted so register positions do not depend on HashSet iteration order.
        let mut sorted: Vec<QubitId> = qubits.iter().cloned().collect();
        sorted.sort();
        let qubit_indices = sorted.into_iter().enumerate().map(|(i, q)| (q, i)).collect();

        Ok(Self {
            qubit_indices,
            state: StateVector::ground(num_qubits),
            num_qubits,
        })
    }

    #[cfg(test)]
    pub(crate) fn set_state(&mut self, state: StateVector) -> Result<(), E91Error> {
        validation::validate_state(&state, self.num_qubits)?;
        self.state = state;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &StateVector {
        &self.state
    }

    /// Applies one operation. Terminal measurements record into `record`.
    pub(crate) fn apply<R: Rng>(
        &mut self,
        op: &Operation,
        rng: &mut R,
        record: &mut ShotRecord,
    ) -> Result<(), E91Error> {
        match op {
            Operation::Gate { target, gate } => {
                let idx = self.index_of(target)?;
                self.apply_single_qubit_gate(idx, &gate.matrix());
            }
            Operation::Controlled { control, target, gate } => {
                let control_idx = self.index_of(control)?;
                let target_idx = self.index_of(target)?;
                if control_idx == target_idx {
                    return Err(E91Error::InvalidOperation {
                        message: "Control and target qubits cannot be the same for controlled operation".to_string(),
                    });
                }
                self.apply_controlled_gate(control_idx, target_idx, *gate);
            }
            Operation::Collapse { target } => {
                let idx = self.index_of(target)?;
                self.measure_qubit(idx, rng)?;
            }
            Operation::Measure { targets } => {
                for target in targets {
                    let idx = self.index_of(target)?;
                    let bit = self.measure_qubit(idx, rng)?;
                    record.record_bit(*target, bit);
                }
            }
        }
        validation::check_normalization(&self.state, None)
    }

    fn index_of(&self, qubit: &QubitId) -> Result<usize, E91Error> {
        self.qubit_indices
            .get(qubit)
            .copied()
            .ok_or_else(|| E91Error::ReferenceViolation {
                qubit: *qubit,
                message: "qubit not found in simulation context".to_string(),
            })
    }

    fn mask(&self, idx: usize) -> usize {
        1 << (self.num_qubits - 1 - idx)
    }

    /// Applies a 2x2 unitary to the qubit at register position `idx`.
    fn apply_single_qubit_gate(&mut self, idx: usize, matrix: &[[Complex<f64>; 2]; 2]) {
        let mask = self.mask(idx);
        let amps = self.state.vector_mut();
        for i0 in 0..amps.len() {
            if i0 & mask != 0 {
                continue;
            }
            let i1 = i0 | mask;
            let (psi0, psi1) = (amps[i0], amps[i1]);
            amps[i0] = matrix[0][0] * psi0 + matrix[0][1] * psi1;
            amps[i1] = matrix[1][0] * psi0 + matrix[1][1] * psi1;
        }
    }

    /// Applies `gate` to `target_idx` on the subspace where `control_idx` is 1.
    fn apply_controlled_gate(&mut self, control_idx: usize, target_idx: usize, gate: Gate) {
        let control_mask = self.mask(control_idx);
        let target_mask = self.mask(target_idx);
        let matrix = gate.matrix();
        let amps = self.state.vector_mut();
        for i0 in 0..amps.len() {
            if i0 & control_mask == 0 || i0 & target_mask != 0 {
                continue;
            }
            let i1 = i0 | target_mask;
            let (psi0, psi1) = (amps[i0], amps[i1]);
            amps[i0] = matrix[0][0] * psi0 + matrix[0][1] * psi1;
            amps[i1] = matrix[1][0] * psi0 + matrix[1][1] * psi1;
        }
    }

    /// Projective Z measurement of one qubit; the state is collapsed and
    /// renormalised. Branches with probability below `AMPLITUDE_TOLERANCE`
    /// are never selected.
    fn measure_qubit<R: Rng>(&mut self, idx: usize, rng: &mut R) -> Result<u8, E91Error> {
        let mask = self.mask(idx);
        let p_one: f64 = self
            .state
            .vector()
            .iter()
            .enumerate()
            .filter(|(k, _)| k & mask != 0)
            .map(|(_, c)| c.norm_sqr())
            .sum();
        let p_zero = 1.0 - p_one;

        let bit: u8 = if p_one < AMPLITUDE_TOLERANCE {
            0
        } else if p_zero < AMPLITUDE_TOLERANCE {
            1
        } else if rng.random::<f64>() < p_one {
            1
        } else {
            0
        };

        let kept = if bit == 1 { p_one } else { p_zero };
        if kept < AMPLITUDE_TOLERANCE {
            return Err(E91Error::SimulationError {
                message: format!("Measurement selected a branch with negligible probability {}", kept),
            });
        }
        let scale = 1.0 / kept.sqrt();
        for (k, amp) in self.state.vector_mut().iter_mut().enumerate() {
            let bit_k = u8::from(k & mask != 0);
            if bit_k == bit {
                *amp *= scale;
            } else {
                *amp = Complex::zero();
            }
        }
        Ok(bit)
    }
}
