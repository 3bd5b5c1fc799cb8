// src/operations/mod.rs

//! Gates and measurements that make up an E91 trial circuit.

use crate::core::QubitId;
use num_complex::Complex;
use num_traits::Zero;
use std::f64::consts::FRAC_1_SQRT_2;

/// Single-qubit gates needed to prepare the Bell pair and rotate each
/// party's measurement axis in the X-Z plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Identity,
    Hadamard,
    PauliX,
    PauliZ,
    /// Phase `π/2`
    S,
    /// Phase `-π/2`
    SDagger,
    /// Phase `π/4`
    T,
    /// Phase `-π/4`
    TDagger,
}

impl Gate {
    /// 2x2 unitary in the `{|0>, |1>}` basis.
    pub fn matrix(self) -> [[Complex<f64>; 2]; 2] {
        let one = Complex::new(1.0, 0.0);
        let zero = Complex::zero();
        let h = Complex::new(FRAC_1_SQRT_2, 0.0);
        match self {
            Gate::Identity => [[one, zero], [zero, one]],
            Gate::Hadamard => [[h, h], [h, -h]],
            Gate::PauliX => [[zero, one], [one, zero]],
            Gate::PauliZ => [[one, zero], [zero, -one]],
            Gate::S => [[one, zero], [zero, Complex::i()]],
            Gate::SDagger => [[one, zero], [zero, -Complex::i()]],
            Gate::T => [[one, zero], [zero, Complex::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2)]],
            Gate::TDagger => [[one, zero], [zero, Complex::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2)]],
        }
    }

    /// The gate undoing this one.
    pub fn inverse(self) -> Gate {
        match self {
            Gate::S => Gate::SDagger,
            Gate::SDagger => Gate::S,
            Gate::T => Gate::TDagger,
            Gate::TDagger => Gate::T,
            other => other,
        }
    }

    /// Short circuit-diagram label.
    pub fn symbol(self) -> &'static str {
        match self {
            Gate::Identity => "I",
            Gate::Hadamard => "H",
            Gate::PauliX => "X",
            Gate::PauliZ => "Z",
            Gate::S => "S",
            Gate::SDagger => "S†",
            Gate::T => "T",
            Gate::TDagger => "T†",
        }
    }
}

/// One step of a trial circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Applies a single-qubit gate.
    Gate {
        target: QubitId,
        gate: Gate,
    },

    /// Applies `gate` to `target` when `control` is `|1>`.
    Controlled {
        control: QubitId,
        target: QubitId,
        gate: Gate,
    },

    /// Measures `target` in the computational basis and collapses the
    /// state without recording the bit. This is how an interceptor's
    /// measurement disturbs the pair.
    Collapse {
        target: QubitId,
    },

    /// Terminal joint measurement. The bits of `targets`, in order, form
    /// the histogram key.
    Measure {
        targets: Vec<QubitId>,
    },
}

impl Operation {
    /// Returns every qubit the operation touches.
    pub fn involved_qubits(&self) -> Vec<QubitId> {
        match self {
            Operation::Gate { target, .. } => vec![*target],
            Operation::Controlled { control, target, .. } => vec![*control, *target],
            Operation::Collapse { target } => vec![*target],
            Operation::Measure { targets } => targets.clone(),
        }
    }
}
