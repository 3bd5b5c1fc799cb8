// src/circuits/mod.rs

//! Named, ordered sequences of `Operation`s.
//!
//! Every E91 trial is one `Circuit`: Bell-pair preparation, optional
//! interception, the two basis rotations and a terminal measurement.

use crate::core::QubitId;
use crate::operations::{Gate, Operation};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// An ordered list of operations applied to a set of qubits.
#[derive(Clone, PartialEq)]
pub struct Circuit {
    name: String,
    /// The unique set of qubits involved across all operations.
    qubits: HashSet<QubitId>,
    /// Order is significant.
    operations: Vec<Operation>,
}

impl Circuit {
    /// Creates a new, empty circuit with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qubits: HashSet::new(),
            operations: Vec::new(),
        }
    }

    /// Appends `op` and registers the qubits it touches.
    pub fn add_operation(&mut self, op: Operation) {
        for qubit in op.involved_qubits() {
            self.qubits.insert(qubit);
        }
        self.operations.push(op);
    }

    /// Appends every operation yielded by `ops`.
    pub fn add_operations<I>(&mut self, ops: I)
    where
        I: IntoIterator<Item = Operation>,
    {
        for op in ops {
            self.add_operation(op);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a reference to the set of unique qubits in this circuit.
    pub fn qubits(&self) -> &HashSet<QubitId> {
        &self.qubits
    }

    /// Returns the ordered operations.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new("")
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// Method-chaining helper for constructing a `Circuit`.
pub struct CircuitBuilder {
    circuit: Circuit,
}

impl CircuitBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            circuit: Circuit::new(name),
        }
    }

    /// Adds a single operation.
    pub fn add_op(mut self, op: Operation) -> Self {
        self.circuit.add_operation(op);
        self
    }

    /// Adds several operations in order.
    pub fn add_ops<I>(mut self, ops: I) -> Self
    where
        I: IntoIterator<Item = Operation>,
    {
        self.circuit.add_operations(ops);
        self
    }

    /// Shorthand for `Operation::Gate`.
    pub fn gate(self, target: QubitId, gate: Gate) -> Self {
        self.add_op(Operation::Gate { target, gate })
    }

    pub fn build(self) -> Circuit {
        self.circuit
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operations.is_empty() {
            return writeln!(f, "Circuit '{}' [0 operations on 0 qubits]", self.name);
        }

        let ops = &self.operations;
        let num_ops = ops.len();

        let mut sorted_qubits: Vec<QubitId> = self.qubits.iter().cloned().collect();
        sorted_qubits.sort();
        let num_qubits = sorted_qubits.len();
        let qubit_to_row: HashMap<QubitId, usize> = sorted_qubits
            .iter()
            .enumerate()
            .map(|(i, q)| (*q, i))
            .collect();

        let max_label_width = sorted_qubits
            .iter()
            .map(|q| q.to_string().len())
            .max()
            .unwrap_or(0);
        let label_padding = " ".repeat(max_label_width + 2);

        const GATE_WIDTH: usize = 5;
        const WIRE: &str = "─────";
        const V_WIRE: char = '│';
        const H_WIRE: char = '─';

        let mut op_grid: Vec<Vec<String>> = vec![vec![WIRE.to_string(); num_ops]; num_qubits];
        let mut v_connect: Vec<Vec<char>> = vec![vec![' '; num_ops]; num_qubits];

        fn format_gate(symbol: &str) -> String {
            let slen = symbol.chars().count();
            if slen >= GATE_WIDTH {
                symbol.chars().take(GATE_WIDTH).collect()
            } else {
                let total = GATE_WIDTH - slen;
                let pre = total / 2;
                format!(
                    "{}{}{}",
                    H_WIRE.to_string().repeat(pre),
                    symbol,
                    H_WIRE.to_string().repeat(total - pre)
                )
            }
        }

        for (t, op) in ops.iter().enumerate() {
            match op {
                Operation::Gate { target, gate } => {
                    if *gate == Gate::Identity {
                        continue;
                    }
                    if let Some(r) = qubit_to_row.get(target) {
                        op_grid[*r][t] = format_gate(gate.symbol());
                    }
                }
                Operation::Controlled { control, target, gate } => {
                    if let (Some(rc), Some(rt)) = (qubit_to_row.get(control), qubit_to_row.get(target)) {
                        op_grid[*rc][t] = format_gate("@");
                        op_grid[*rt][t] = format_gate(gate.symbol());
                        let r_min = (*rc).min(*rt);
                        let r_max = (*rc).max(*rt);
                        for row in v_connect.iter_mut().take(r_max).skip(r_min) {
                            row[t] = V_WIRE;
                        }
                    }
                }
                Operation::Collapse { target } => {
                    if let Some(r) = qubit_to_row.get(target) {
                        op_grid[*r][t] = format_gate("E");
                    }
                }
                Operation::Measure { targets } => {
                    for target in targets {
                        if let Some(r) = qubit_to_row.get(target) {
                            op_grid[*r][t] = format_gate("M");
                        }
                    }
                }
            }
        }

        writeln!(f, "Circuit '{}' [{} operations on {} qubits]", self.name, num_ops, num_qubits)?;
        for r in 0..num_qubits {
            let label = format!("{}: ", sorted_qubits[r]);
            write!(f, "{:<width$}", label, width = max_label_width + 2)?;
            writeln!(f, "{}", op_grid[r].join(""))?;

            if r < num_qubits - 1 {
                write!(f, "{}", label_padding)?;
                for t in 0..num_ops {
                    let pad = GATE_WIDTH - 1;
                    let pre = pad / 2;
                    write!(f, "{}{}{}", " ".repeat(pre), v_connect[r][t], " ".repeat(pad - pre))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_tracks_qubits_and_order() {
        let q0 = QubitId(0);
        let q1 = QubitId(1);
        let circuit = CircuitBuilder::new("bell")
            .gate(q1, Gate::Hadamard)
            .add_op(Operation::Controlled { control: q1, target: q0, gate: Gate::PauliX })
            .add_op(Operation::Measure { targets: vec![q0, q1] })
            .build();

        assert_eq!(circuit.name(), "bell");
        assert_eq!(circuit.len(), 3);
        assert_eq!(circuit.qubits().len(), 2);
        assert!(matches!(circuit.operations()[0], Operation::Gate { gate: Gate::Hadamard, .. }));

        let rendered = circuit.to_string();
        assert!(rendered.contains("Circuit 'bell' [3 operations on 2 qubits]"));
        assert!(rendered.contains('M'));
    }

    #[test]
    fn empty_circuit_renders_header_only() {
        let circuit = Circuit::new("empty");
        assert!(circuit.is_empty());
        assert_eq!(circuit.to_string(), "Circuit 'empty' [0 operations on 0 qubits]\n");
    }
}
