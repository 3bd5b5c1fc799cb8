// src/core/mod.rs

//! Core data structures and types

pub mod basis;
pub mod error;
pub mod state;

pub use basis::{Basis, BasisPair, InterceptBasis, Party};
pub use error::{E91Error, E91Result, QubitId};
pub use state::StateVector;

pub mod constants;
pub use constants::e91_constants::{CLASSICAL_BOUND, TSIRELSON_BOUND};
