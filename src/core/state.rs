// src/core/state.rs

use num_complex::Complex;
use num_traits::Zero;
use std::fmt;

/// Amplitudes of a register of qubits in the computational basis.
///
/// Index `k` encodes the basis state whose most significant bit belongs to
/// qubit 0, so for the two-qubit E91 register `|ab>` sits at `2a + b` with
/// `a` Alice's bit and `b` Bob's bit.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    amplitudes: Vec<Complex<f64>>,
}

impl StateVector {
    /// Wraps an amplitude vector. Normalisation is checked by the engine,
    /// not here.
    pub(crate) fn new(amplitudes: Vec<Complex<f64>>) -> Self {
        Self { amplitudes }
    }

    /// `|0...0>` for `num_qubits` qubits.
    pub(crate) fn ground(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Complex::zero(); 1usize << num_qubits];
        amplitudes[0] = Complex::new(1.0, 0.0);
        Self { amplitudes }
    }

    /// Provides read-only access to the amplitudes.
    pub fn vector(&self) -> &[Complex<f64>] {
        &self.amplitudes
    }

    pub(crate) fn vector_mut(&mut self) -> &mut [Complex<f64>] {
        &mut self.amplitudes
    }

    /// Number of basis states (`2^n`).
    pub fn dim(&self) -> usize {
        self.amplitudes.len()
    }

    /// `Σ|c_k|²`
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|c| c.norm_sqr()).sum()
    }

    /// Born-rule probability of each basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|c| c.norm_sqr()).collect()
    }
}

impl fmt::Display for StateVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State[")?;
        for (i, c) in self.amplitudes.iter().enumerate() {
            write!(f, "{}{:.4}", if i > 0 { ", " } else { "" }, c)?;
        }
        write!(f, "]")
    }
}
