//! MNA matrix assembly and solution queries.

use std::collections::{BTreeSet, HashMap};

use crate::circuit::NodeId;
use crate::elements::{Battery, CurrentSource, Resistor};
use crate::error::{Result, SolverError};

use super::linalg::{DenseMatrix, LinearSolver};

/// Owner of an auxiliary branch-current unknown.
#[derive(Debug, Clone, Copy)]
enum AuxBranch {
    /// Index into the battery list.
    Battery(usize),
    /// Index into the resistor list; the resistance is exactly zero.
    ShortResistor(usize),
}

/// A static linear circuit ready for one nodal solve.
///
/// Elements may come straight from a snapshot or from companion substitution
/// of reactive elements; the solver treats both identically.
#[derive(Debug, Clone, Default)]
pub struct MnaCircuit {
    pub batteries: Vec<Battery>,
    pub resistors: Vec<Resistor>,
    pub current_sources: Vec<CurrentSource>,
}

impl MnaCircuit {
    /// Create a circuit from element lists.
    pub fn new(
        batteries: Vec<Battery>,
        resistors: Vec<Resistor>,
        current_sources: Vec<CurrentSource>,
    ) -> Self {
        Self {
            batteries,
            resistors,
            current_sources,
        }
    }

    /// Every node referenced by an element, plus the reference node.
    ///
    /// Ordered ascending so index assignment is deterministic: identical
    /// inputs produce bit-for-bit identical solutions.
    fn node_set(&self, ground: NodeId) -> BTreeSet<NodeId> {
        let mut nodes = BTreeSet::new();
        nodes.insert(ground);
        for battery in &self.batteries {
            nodes.insert(battery.node0);
            nodes.insert(battery.node1);
        }
        for resistor in &self.resistors {
            nodes.insert(resistor.node0);
            nodes.insert(resistor.node1);
        }
        for source in &self.current_sources {
            nodes.insert(source.node0);
            nodes.insert(source.node1);
        }
        nodes
    }

    /// Auxiliary branch-current unknowns: one per battery and one per
    /// zero-resistance resistor. Self-loop sources constrain nothing and get
    /// no branch.
    fn aux_branches(&self) -> Vec<AuxBranch> {
        let mut branches = Vec::new();
        for (i, battery) in self.batteries.iter().enumerate() {
            if battery.node0 != battery.node1 {
                branches.push(AuxBranch::Battery(i));
            }
        }
        for (i, resistor) in self.resistors.iter().enumerate() {
            if resistor.is_short() && resistor.node0 != resistor.node1 {
                branches.push(AuxBranch::ShortResistor(i));
            }
        }
        branches
    }

    /// Assemble and solve the nodal system for the given reference node.
    pub fn solve(&self, ground: NodeId, backend: &dyn LinearSolver) -> Result<Solution> {
        let ordered: Vec<NodeId> = self
            .node_set(ground)
            .into_iter()
            .filter(|&node| node != ground)
            .collect();
        let index: HashMap<NodeId, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, &node)| (node, i))
            .collect();
        let n = ordered.len();

        let branches = self.aux_branches();
        let m = branches.len();
        let size = n + m;

        let mut matrix = DenseMatrix::new(size);
        let mut rhs = vec![0.0; size];

        let node_index = |node: NodeId| -> Option<usize> {
            if node == ground {
                None
            } else {
                index.get(&node).copied()
            }
        };

        // Conductance stamps for ordinary resistors.
        for resistor in &self.resistors {
            if resistor.is_short() {
                continue;
            }
            stamp_conductance(
                &mut matrix,
                node_index(resistor.node0),
                node_index(resistor.node1),
                resistor.conductance(),
            );
        }

        // Current sources inject straight into the right-hand side: the
        // driven current arrives at node1 and leaves node0.
        for source in &self.current_sources {
            if let Some(i) = node_index(source.node1) {
                rhs[i] += source.current;
            }
            if let Some(i) = node_index(source.node0) {
                rhs[i] -= source.current;
            }
        }

        // Incidence rows for voltage-source-like elements. The row enforces
        // V(positive) - V(negative) = E; the symmetric column entries put the
        // branch current into both node equations.
        for (offset, branch) in branches.iter().enumerate() {
            let row = n + offset;
            let (positive, negative, voltage) = match *branch {
                AuxBranch::Battery(i) => {
                    let battery = &self.batteries[i];
                    (battery.node1, battery.node0, battery.voltage)
                }
                AuxBranch::ShortResistor(i) => {
                    let resistor = &self.resistors[i];
                    (resistor.node1, resistor.node0, 0.0)
                }
            };
            if let Some(i) = node_index(positive) {
                matrix.add(row, i, 1.0);
                matrix.add(i, row, 1.0);
            }
            if let Some(i) = node_index(negative) {
                matrix.add(row, i, -1.0);
                matrix.add(i, row, -1.0);
            }
            rhs[row] = voltage;
        }

        let x = backend.solve(&matrix, &rhs)?;

        // Any NaN/Inf in the result is a defect; raise instead of returning
        // a corrupted solution.
        for (i, &value) in x.iter().enumerate() {
            if !value.is_finite() {
                let quantity = if i < n {
                    format!("voltage at {}", ordered[i])
                } else {
                    format!("auxiliary branch current {}", i - n)
                };
                return Err(SolverError::non_finite(quantity, value));
            }
        }

        let mut voltages = HashMap::with_capacity(n + 1);
        voltages.insert(ground, 0.0);
        for (i, &node) in ordered.iter().enumerate() {
            voltages.insert(node, x[i]);
        }

        // The stamped unknown is the internal current from the positive
        // terminal to the negative one; the reported element current runs
        // node0 -> node1, so negate.
        let mut battery_currents = vec![0.0; self.batteries.len()];
        let mut short_currents = HashMap::new();
        for (offset, branch) in branches.iter().enumerate() {
            let current = -x[n + offset];
            match *branch {
                AuxBranch::Battery(i) => battery_currents[i] = current,
                AuxBranch::ShortResistor(i) => {
                    short_currents.insert(i, current);
                }
            }
        }

        Ok(Solution {
            voltages,
            battery_currents,
            resistors: self.resistors.clone(),
            short_currents,
        })
    }
}

/// Stamp a conductance between two node indices.
///
/// For a conductance G between nodes n1 and n2:
///   A[n1,n1] += G
///   A[n2,n2] += G
///   A[n1,n2] -= G
///   A[n2,n1] -= G
fn stamp_conductance(matrix: &mut DenseMatrix, n1: Option<usize>, n2: Option<usize>, g: f64) {
    if let Some(i) = n1 {
        matrix.add(i, i, g);
    }
    if let Some(j) = n2 {
        matrix.add(j, j, g);
    }
    if let (Some(i), Some(j)) = (n1, n2) {
        matrix.add(i, j, -g);
        matrix.add(j, i, -g);
    }
}

/// A solved nodal system.
///
/// Node voltages and auxiliary branch currents are stored; ordinary resistor
/// currents are derived on demand from Ohm's law so the matrix stays as
/// small as possible.
#[derive(Debug, Clone)]
pub struct Solution {
    voltages: HashMap<NodeId, f64>,
    battery_currents: Vec<f64>,
    resistors: Vec<Resistor>,
    short_currents: HashMap<usize, f64>,
}

impl Solution {
    /// Voltage at a node. The reference node and any node absent from the
    /// solved system read as 0.
    pub fn voltage(&self, node: NodeId) -> f64 {
        self.voltages.get(&node).copied().unwrap_or(0.0)
    }

    /// `V(node0) - V(node1)`.
    pub fn voltage_across(&self, node0: NodeId, node1: NodeId) -> f64 {
        self.voltage(node0) - self.voltage(node1)
    }

    /// Solved current through a battery (by position in the battery list),
    /// measured from node0 to node1. Self-loop batteries carry nothing.
    pub fn battery_current(&self, index: usize) -> f64 {
        self.battery_currents.get(index).copied().unwrap_or(0.0)
    }

    /// Current through a resistor (by position in the resistor list),
    /// measured from node0 to node1. Zero-resistance elements read their
    /// auxiliary unknown; ordinary resistors use Ohm's law.
    pub fn resistor_current(&self, index: usize) -> f64 {
        if let Some(&current) = self.short_currents.get(&index) {
            return current;
        }
        match self.resistors.get(index) {
            Some(resistor) if !resistor.is_short() => {
                self.voltage_across(resistor.node0, resistor.node1) / resistor.resistance
            }
            _ => 0.0,
        }
    }

    /// All solved node voltages, reference node included.
    pub fn node_voltages(&self) -> &HashMap<NodeId, f64> {
        &self.voltages
    }
}
