// src/simulation/results.rs
use crate::core::QubitId;
use std::collections::HashMap;
use std::fmt;

/// Bits recorded by the terminal measurement of a single shot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShotRecord {
    bits: HashMap<QubitId, u8>,
    /// Qubits in the order the measurement listed them.
    order: Vec<QubitId>,
}

impl ShotRecord {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_bit(&mut self, qubit: QubitId, bit: u8) {
        if self.bits.insert(qubit, bit).is_none() {
            self.order.push(qubit);
        }
    }

    /// The measured bit of `qubit`, if it was measured.
    pub fn bit(&self, qubit: &QubitId) -> Option<u8> {
        self.bits.get(qubit).copied()
    }

    /// Histogram key: measured bits concatenated in measurement order.
    pub fn bitstring(&self) -> String {
        self.order
            .iter()
            .filter_map(|q| self.bits.get(q))
            .map(|bit| if *bit == 0 { '0' } else { '1' })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl fmt::Display for ShotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.order.is_empty() {
            return write!(f, "Shot[no qubits measured]");
        }
        write!(f, "Shot[")?;
        for (i, qubit) in self.order.iter().enumerate() {
            let bit = self.bits.get(qubit).copied().unwrap_or_default();
            write!(f, "{}{}={}", if i > 0 { ", " } else { "" }, qubit, bit)?;
        }
        write!(f, "]")
    }
}
