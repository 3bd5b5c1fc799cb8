// src/validation/mod.rs

//! Sanity checks on simulator state.

use crate::core::constants::e91_constants::NORM_TOLERANCE;
use crate::core::{E91Error, StateVector};

/// Checks that `Σ|c_k|² ≈ 1`.
///
/// # Arguments
/// * `state` - The state to check.
/// * `tolerance` - Allowed deviation from 1.0; defaults to `NORM_TOLERANCE`.
///
/// # Returns
/// * `Ok(())` if normalized within tolerance.
/// * `Err(E91Error::SimulationError)` otherwise.
pub fn check_normalization(state: &StateVector, tolerance: Option<f64>) -> Result<(), E91Error> {
    let effective_tolerance = tolerance.unwrap_or(NORM_TOLERANCE);
    let norm_sq = state.norm_sqr();
    if (norm_sq - 1.0).abs() > effective_tolerance {
        Err(E91Error::SimulationError {
            message: format!(
                "State vector normalization failed. Sum(|c_i|^2) = {} (Deviation > {})",
                norm_sq, effective_tolerance
            ),
        })
    } else {
        Ok(())
    }
}

/// Checks that the vector has the `2^n` shape of an `n`-qubit register
/// and is normalized.
pub fn validate_state(state: &StateVector, num_qubits: usize) -> Result<(), E91Error> {
    let expected = 1usize.checked_shl(num_qubits as u32).unwrap_or(0);
    if state.dim() != expected {
        return Err(E91Error::SimulationError {
            message: format!(
                "State dimension {} does not match a {}-qubit register (expected {})",
                state.dim(),
                num_qubits,
                expected
            ),
        });
    }
    check_normalization(state, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex;
    use std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn bell_state_is_normalized() {
        let h = Complex::new(FRAC_1_SQRT_2, 0.0);
        let zero = Complex::new(0.0, 0.0);
        let state = StateVector::new(vec![h, zero, zero, h]);
        assert!(validate_state(&state, 2).is_ok());
    }

    #[test]
    fn unnormalized_state_is_rejected() {
        let one = Complex::new(1.0, 0.0);
        let state = StateVector::new(vec![one, one]);
        assert!(matches!(check_normalization(&state, None), Err(E91Error::SimulationError { .. })));
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let state = StateVector::ground(1);
        assert!(validate_state(&state, 2).is_err());
    }
}
