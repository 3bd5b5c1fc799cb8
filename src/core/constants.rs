//! Bounds and tolerances shared by the statistics engine and the simulator.

/// Constants of the E91 protocol
pub mod e91_constants {
    /// Tsirelson's bound `2√2`, the quantum maximum of the CHSH statistic.
    pub const TSIRELSON_BOUND: f64 = 2.0 * std::f64::consts::SQRT_2;
    /// Local-hidden-variable bound on `|S|`.
    pub const CLASSICAL_BOUND: f64 = 2.0;
    /// Probabilities below this are treated as exact zeros when sampling.
    pub const AMPLITUDE_TOLERANCE: f64 = 1e-12;
    /// Allowed deviation of `Σ|c_k|²` from 1.
    pub const NORM_TOLERANCE: f64 = 1e-9;
}
