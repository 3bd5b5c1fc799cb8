// src/core/basis.rs

//! Measurement basis labels.
//!
//! Only labels live here. The rotation each label stands for is chosen by
//! the circuit layer, and the two parties use different angle sets for the
//! same label.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three measurement bases available to each party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Basis {
    B1,
    B2,
    B3,
}

impl Basis {
    /// All bases in label order.
    pub const ALL: [Basis; 3] = [Basis::B1, Basis::B2, Basis::B3];

    /// 1-based label number.
    pub fn number(self) -> u8 {
        match self {
            Basis::B1 => 1,
            Basis::B2 => 2,
            Basis::B3 => 3,
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.number())
    }
}

/// Eve's choice for one intercepted qubit: leave it alone, or measure it in
/// one of the bases of the party the qubit is travelling to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterceptBasis {
    Identity,
    Measure(Basis),
}

impl InterceptBasis {
    /// Identity followed by the three bases; draws are uniform over this.
    pub const ALL: [InterceptBasis; 4] = [
        InterceptBasis::Identity,
        InterceptBasis::Measure(Basis::B1),
        InterceptBasis::Measure(Basis::B2),
        InterceptBasis::Measure(Basis::B3),
    ];

    /// `0` for identity, otherwise the basis number.
    pub fn number(self) -> u8 {
        match self {
            InterceptBasis::Identity => 0,
            InterceptBasis::Measure(basis) => basis.number(),
        }
    }
}

impl fmt::Display for InterceptBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterceptBasis::Identity => write!(f, "I"),
            InterceptBasis::Measure(basis) => write!(f, "{}", basis),
        }
    }
}

/// The legitimate party a qubit is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Alice,
    Bob,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Alice => write!(f, "Alice"),
            Party::Bob => write!(f, "Bob"),
        }
    }
}

/// Alice's and Bob's basis for a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasisPair {
    pub alice: Basis,
    pub bob: Basis,
}

impl BasisPair {
    /// Pairs that project onto the same eigenstates and so form the key.
    pub const COMPATIBLE: [BasisPair; 2] = [
        BasisPair::new(Basis::B2, Basis::B1),
        BasisPair::new(Basis::B3, Basis::B2),
    ];

    /// The four CHSH categories in the order `S` combines them.
    pub const CHSH: [BasisPair; 4] = [
        BasisPair::new(Basis::B1, Basis::B1),
        BasisPair::new(Basis::B1, Basis::B3),
        BasisPair::new(Basis::B3, Basis::B1),
        BasisPair::new(Basis::B3, Basis::B3),
    ];

    pub const fn new(alice: Basis, bob: Basis) -> Self {
        Self { alice, bob }
    }

    /// True for `(B2,B1)` and `(B3,B2)`.
    pub fn is_compatible(&self) -> bool {
        Self::COMPATIBLE.contains(self)
    }

    /// Position of this pair among the CHSH categories, if it is one.
    pub fn chsh_slot(&self) -> Option<usize> {
        Self::CHSH.iter().position(|pair| pair == self)
    }
}

impl fmt::Display for BasisPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A{}B{}", self.alice.number(), self.bob.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compatible_pairs_are_disjoint_from_chsh_categories() {
        for pair in BasisPair::COMPATIBLE {
            assert!(pair.chsh_slot().is_none(), "{} should not be a CHSH category", pair);
        }
        for pair in BasisPair::CHSH {
            assert!(!pair.is_compatible(), "{} should not be used for the key", pair);
        }
    }

    #[test]
    fn pair_labels_match_circuit_naming() {
        assert_eq!(BasisPair::new(Basis::B2, Basis::B1).to_string(), "A2B1");
        assert_eq!(InterceptBasis::Measure(Basis::B3).number(), 3);
        assert_eq!(InterceptBasis::Identity.number(), 0);
    }
}
