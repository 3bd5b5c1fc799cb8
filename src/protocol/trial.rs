// src/protocol/trial.rs

//! Turns scheduled trials into circuits the oracle can execute.

use crate::circuits::{Circuit, CircuitBuilder};
use crate::core::{Basis, InterceptBasis, Party, QubitId};
use crate::operations::{Gate, Operation};
use crate::protocol::Trial;
use std::fmt;
use std::sync::Arc;

/// Qubit of the pair routed to Alice.
pub const ALICE_QUBIT: QubitId = QubitId(0);
/// Qubit of the pair routed to Bob.
pub const BOB_QUBIT: QubitId = QubitId(1);

impl Party {
    /// The qubit this party receives.
    pub fn qubit(self) -> QubitId {
        match self {
            Party::Alice => ALICE_QUBIT,
            Party::Bob => BOB_QUBIT,
        }
    }
}

/// Gates that rotate `party`'s measurement axis onto Z for `basis`.
///
/// Alice measures along X, (Z+X)/√2 and Z; Bob along (Z+X)/√2, Z and
/// (Z−X)/√2. `(A2,B1)` and `(A3,B2)` therefore share an axis.
pub fn basis_rotation(party: Party, basis: Basis) -> Vec<Gate> {
    match (party, basis) {
        (Party::Alice, Basis::B1) => vec![Gate::Hadamard],
        (Party::Alice, Basis::B2) => vec![Gate::S, Gate::Hadamard, Gate::T, Gate::Hadamard],
        (Party::Alice, Basis::B3) => vec![],
        (Party::Bob, Basis::B1) => vec![Gate::S, Gate::Hadamard, Gate::T, Gate::Hadamard],
        (Party::Bob, Basis::B2) => vec![],
        (Party::Bob, Basis::B3) => vec![Gate::S, Gate::Hadamard, Gate::TDagger, Gate::Hadamard],
    }
}

/// An attacker model that decides what happens to an intercepted qubit.
pub trait InterceptHandler: Send + Sync + fmt::Debug {
    /// Operations applied to `target` (travelling to `party`) when the
    /// schedule asked for an interception in `basis`.
    fn operations(&self, party: Party, basis: Basis, target: QubitId) -> Vec<Operation>;
}

/// What the eavesdropper does to one qubit of one trial.
#[derive(Debug, Clone)]
pub enum Interception {
    /// The qubit passes untouched.
    NoIntercept,
    /// Measure in the receiving party's `basis` and resend the eigenstate
    /// that was found.
    InterceptResend(Basis),
    /// Defer to a user-supplied attacker model.
    Custom {
        basis: Basis,
        handler: Arc<dyn InterceptHandler>,
    },
}

impl Interception {
    /// Operations on the qubit routed to `party`.
    pub fn operations(&self, party: Party) -> Vec<Operation> {
        let target = party.qubit();
        match self {
            Interception::NoIntercept => vec![Operation::Gate {
                target,
                gate: Gate::Identity,
            }],
            Interception::InterceptResend(basis) => {
                let rotation = basis_rotation(party, *basis);
                let mut ops: Vec<Operation> = rotation
                    .iter()
                    .map(|gate| Operation::Gate { target, gate: *gate })
                    .collect();
                ops.push(Operation::Collapse { target });
                ops.extend(rotation.iter().rev().map(|gate| Operation::Gate {
                    target,
                    gate: gate.inverse(),
                }));
                ops
            }
            Interception::Custom { basis, handler } => handler.operations(party, *basis, target),
        }
    }
}

/// The attacker model used for every non-identity intercept of a run.
#[derive(Debug, Clone, Default)]
pub enum AttackModel {
    #[default]
    InterceptResend,
    Custom(Arc<dyn InterceptHandler>),
}

impl AttackModel {
    pub fn interception(&self, choice: InterceptBasis) -> Interception {
        match (choice, self) {
            (InterceptBasis::Identity, _) => Interception::NoIntercept,
            (InterceptBasis::Measure(basis), AttackModel::InterceptResend) => Interception::InterceptResend(basis),
            (InterceptBasis::Measure(basis), AttackModel::Custom(handler)) => Interception::Custom {
                basis,
                handler: Arc::clone(handler),
            },
        }
    }
}

/// A fully specified measurement request for one trial.
#[derive(Debug, Clone)]
pub struct TrialSpec {
    pub trial: Trial,
    pub circuit: Circuit,
}

impl TrialSpec {
    /// Identity of the request; oracle responses are keyed by it.
    pub fn index(&self) -> usize {
        self.trial.index
    }

    pub fn name(&self) -> &str {
        self.circuit.name()
    }
}

/// Builds one circuit per trial. Pure: no randomness, no I/O, and no
/// deduplication of identical basis tuples.
#[derive(Debug, Clone, Default)]
pub struct TrialSpecBuilder {
    attack: AttackModel,
}

impl TrialSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attack_model(attack: AttackModel) -> Self {
        Self { attack }
    }

    /// Preparation, Alice-side intercept, Bob-side intercept, Alice's
    /// rotation, Bob's rotation, joint measurement.
    pub fn build(&self, trial: &Trial) -> TrialSpec {
        let circuit = CircuitBuilder::new(trial.name())
            .add_ops(bell_pair())
            .add_ops(self.attack.interception(trial.eve_basis_a).operations(Party::Alice))
            .add_ops(self.attack.interception(trial.eve_basis_b).operations(Party::Bob))
            .add_ops(measurement_rotation(Party::Alice, trial.alice_basis))
            .add_ops(measurement_rotation(Party::Bob, trial.bob_basis))
            .add_op(Operation::Measure {
                targets: vec![ALICE_QUBIT, BOB_QUBIT],
            })
            .build();
        TrialSpec { trial: *trial, circuit }
    }

    pub fn build_all(&self, trials: &[Trial]) -> Vec<TrialSpec> {
        trials.iter().map(|trial| self.build(trial)).collect()
    }
}

/// `H(q1); CX(q1 -> q0)` giving `(|00> + |11>)/√2`.
fn bell_pair() -> Vec<Operation> {
    vec![
        Operation::Gate {
            target: BOB_QUBIT,
            gate: Gate::Hadamard,
        },
        Operation::Controlled {
            control: BOB_QUBIT,
            target: ALICE_QUBIT,
            gate: Gate::PauliX,
        },
    ]
}

fn measurement_rotation(party: Party, basis: Basis) -> Vec<Operation> {
    let target = party.qubit();
    basis_rotation(party, basis)
        .into_iter()
        .map(|gate| Operation::Gate { target, gate })
        .collect()
}
