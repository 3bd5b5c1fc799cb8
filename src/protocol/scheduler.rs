// src/protocol/scheduler.rs

//! Random basis choices for Alice, Bob and the interceptor.

use crate::core::{Basis, BasisPair, E91Error, E91Result, InterceptBasis};
use log::debug;
use rand::Rng;
use std::fmt;

/// The basis choices of one trial. Immutable once scheduled; later joined
/// with its observation by `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trial {
    pub index: usize,
    pub alice_basis: Basis,
    pub bob_basis: Basis,
    /// Interception of the qubit travelling to Alice.
    pub eve_basis_a: InterceptBasis,
    /// Interception of the qubit travelling to Bob.
    pub eve_basis_b: InterceptBasis,
}

impl Trial {
    pub fn bases(&self) -> BasisPair {
        BasisPair::new(self.alice_basis, self.bob_basis)
    }

    /// Circuit name, e.g. `17-A2B1E03`.
    pub fn name(&self) -> String {
        format!(
            "{}-{}E{}{}",
            self.index,
            self.bases(),
            self.eve_basis_a.number(),
            self.eve_basis_b.number()
        )
    }

    pub fn is_intercepted(&self) -> bool {
        self.eve_basis_a != InterceptBasis::Identity || self.eve_basis_b != InterceptBasis::Identity
    }
}

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trial({})", self.name())
    }
}

/// Draws independent, uniform basis choices for every trial.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BasisScheduler {
    /// Interception probability when an eavesdropper is present.
    eavesdropper: Option<f64>,
}

impl BasisScheduler {
    /// A scheduler without an eavesdropper: every intercept is `Identity`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A scheduler whose eavesdropper intercepts each trial with
    /// `probability`.
    pub fn with_eavesdropper(probability: f64) -> E91Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(E91Error::InvalidConfig {
                message: format!("interception probability {} is outside [0, 1]", probability),
            });
        }
        Ok(Self {
            eavesdropper: Some(probability),
        })
    }

    pub fn eavesdropper(&self) -> Option<f64> {
        self.eavesdropper
    }

    /// Schedules `count` trials.
    ///
    /// All of Alice's and Bob's choices are drawn first, interleaved per
    /// trial; the eavesdropper's draws follow. Without an eavesdropper no
    /// randomness is consumed for interception.
    pub fn schedule<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<Trial> {
        let mut trials: Vec<Trial> = (0..count)
            .map(|index| Trial {
                index,
                alice_basis: draw_basis(rng),
                bob_basis: draw_basis(rng),
                eve_basis_a: InterceptBasis::Identity,
                eve_basis_b: InterceptBasis::Identity,
            })
            .collect();

        if let Some(probability) = self.eavesdropper {
            for trial in trials.iter_mut() {
                if rng.random::<f64>() <= probability {
                    trial.eve_basis_a = draw_intercept(rng);
                    trial.eve_basis_b = draw_intercept(rng);
                }
            }
        }

        debug!(
            "scheduled {} trials ({} intercepted)",
            trials.len(),
            trials.iter().filter(|t| t.is_intercepted()).count()
        );
        trials
    }
}

fn draw_basis<R: Rng>(rng: &mut R) -> Basis {
    Basis::ALL[rng.random_range(0..Basis::ALL.len())]
}

fn draw_intercept<R: Rng>(rng: &mut R) -> InterceptBasis {
    InterceptBasis::ALL[rng.random_range(0..InterceptBasis::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn same_seed_same_schedule() {
        let scheduler = BasisScheduler::with_eavesdropper(0.5).unwrap();
        let a = scheduler.schedule(200, &mut StdRng::seed_from_u64(42));
        let b = scheduler.schedule(200, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a.iter().enumerate().all(|(i, t)| t.index == i));
    }

    #[test]
    fn no_eavesdropper_means_identity_everywhere() {
        let trials = BasisScheduler::new().schedule(500, &mut StdRng::seed_from_u64(3));
        assert!(trials.iter().all(|t| !t.is_intercepted()));
    }

    #[test]
    fn zero_probability_never_intercepts() {
        // A draw of exactly 0.0 would pass `<= 0.0`; with 2^53 possible
        // values that is not a concern for 500 trials.
        let scheduler = BasisScheduler::with_eavesdropper(0.0).unwrap();
        let trials = scheduler.schedule(500, &mut StdRng::seed_from_u64(11));
        assert!(trials.iter().all(|t| !t.is_intercepted()));
    }

    #[test]
    fn full_probability_draws_every_intercept_choice() {
        let scheduler = BasisScheduler::with_eavesdropper(1.0).unwrap();
        let trials = scheduler.schedule(2000, &mut StdRng::seed_from_u64(5));
        for choice in InterceptBasis::ALL {
            assert!(trials.iter().any(|t| t.eve_basis_a == choice), "{} never drawn for Alice's qubit", choice);
            assert!(trials.iter().any(|t| t.eve_basis_b == choice), "{} never drawn for Bob's qubit", choice);
        }
    }

    #[test]
    fn bases_are_roughly_uniform() {
        let trials = BasisScheduler::new().schedule(3000, &mut StdRng::seed_from_u64(9));
        for basis in Basis::ALL {
            let alice = trials.iter().filter(|t| t.alice_basis == basis).count();
            let bob = trials.iter().filter(|t| t.bob_basis == basis).count();
            assert!((800..1200).contains(&alice), "Alice drew {} {} times", basis, alice);
            assert!((800..1200).contains(&bob), "Bob drew {} {} times", basis, bob);
        }
    }

    #[test]
    fn probability_outside_unit_interval_is_rejected() {
        assert!(BasisScheduler::with_eavesdropper(1.5).is_err());
        assert!(BasisScheduler::with_eavesdropper(-0.1).is_err());
        assert!(BasisScheduler::with_eavesdropper(f64::NAN).is_err());
    }

    #[test]
    fn trial_name_encodes_choices() {
        let trial = Trial {
            index: 17,
            alice_basis: Basis::B2,
            bob_basis: Basis::B1,
            eve_basis_a: InterceptBasis::Identity,
            eve_basis_b: InterceptBasis::Measure(Basis::B3),
        };
        assert_eq!(trial.name(), "17-A2B1E03");
    }
}
