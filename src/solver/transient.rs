//! Dynamic circuits: reactive elements carried through time.
//!
//! A [`DynamicCircuit`] holds the static elements of a snapshot plus its
//! capacitors and inductors with their carried terminal state. Solving for a
//! timestep substitutes each reactive element with its trapezoidal companion
//! network, runs the static nodal solve, and derives the next circuit with
//! updated reactive state. States are immutable: [`DynamicState::update`]
//! returns a new state, which is what makes the subdivision controller's
//! coarse/fine comparison side-effect-free.

use std::collections::HashMap;

use crate::circuit::{
    ElementId, ElementKind, ElementSnapshot, NodeId, ReactiveState, OPEN_SWITCH_RESISTANCE,
};
use crate::elements::{Battery, CurrentSource, Resistor};
use crate::error::{Result, SolverError};

use super::companion::{CapacitorCompanion, InductorCompanion};
use super::linalg::LinearSolver;
use super::mna::{MnaCircuit, Solution};

/// Electrical law of a static element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticKind {
    Resistor { resistance: f64 },
    Battery { voltage: f64 },
    CurrentSource { current: f64 },
}

/// A static element with its stable id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticElement {
    pub id: ElementId,
    pub node0: NodeId,
    pub node1: NodeId,
    pub kind: StaticKind,
}

/// Parameters of a reactive element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReactiveKind {
    Capacitor { capacitance: f64 },
    Inductor { inductance: f64 },
}

/// A reactive element with its carried terminal state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReactiveElement {
    pub id: ElementId,
    pub node0: NodeId,
    pub node1: NodeId,
    pub kind: ReactiveKind,
    pub state: ReactiveState,
}

/// How to read an element's current out of a solved system.
#[derive(Debug, Clone, Copy)]
enum CurrentReadout {
    /// Ohm's law or auxiliary unknown, by resistor list position.
    FromResistor { index: usize },
    /// Auxiliary branch current, by battery list position.
    FromBattery { index: usize },
    /// Source-defined current.
    Fixed { current: f64 },
    /// Capacitor companion: `G_eq * v - I_eq`.
    FromCompanion { conductance: f64, history_current: f64 },
}

#[derive(Debug, Clone, Copy)]
struct Readout {
    node0: NodeId,
    node1: NodeId,
    current: CurrentReadout,
}

/// A snapshot circuit ready for transient solves.
///
/// Valid for any timestep size: companion parameters are re-derived from the
/// carried reactive state on every solve.
#[derive(Debug, Clone)]
pub struct DynamicCircuit {
    ground: NodeId,
    statics: Vec<StaticElement>,
    reactives: Vec<ReactiveElement>,
}

impl DynamicCircuit {
    /// Create a dynamic circuit from element lists.
    pub fn new(
        ground: NodeId,
        statics: Vec<StaticElement>,
        reactives: Vec<ReactiveElement>,
    ) -> Self {
        Self {
            ground,
            statics,
            reactives,
        }
    }

    /// Build from a flattened frame snapshot.
    ///
    /// Switches lower to resistors here: closed is a zero-resistance link
    /// (solved through the auxiliary-current path), open is a large finite
    /// resistance.
    pub fn from_snapshot(elements: &[ElementSnapshot], ground: NodeId) -> Self {
        let mut statics = Vec::new();
        let mut reactives = Vec::new();

        for element in elements {
            match element.kind {
                ElementKind::Resistor { resistance } => statics.push(StaticElement {
                    id: element.id,
                    node0: element.node0,
                    node1: element.node1,
                    kind: StaticKind::Resistor { resistance },
                }),
                ElementKind::Battery { voltage } => statics.push(StaticElement {
                    id: element.id,
                    node0: element.node0,
                    node1: element.node1,
                    kind: StaticKind::Battery { voltage },
                }),
                ElementKind::CurrentSource { current } => statics.push(StaticElement {
                    id: element.id,
                    node0: element.node0,
                    node1: element.node1,
                    kind: StaticKind::CurrentSource { current },
                }),
                ElementKind::Switch { closed } => statics.push(StaticElement {
                    id: element.id,
                    node0: element.node0,
                    node1: element.node1,
                    kind: StaticKind::Resistor {
                        resistance: if closed { 0.0 } else { OPEN_SWITCH_RESISTANCE },
                    },
                }),
                ElementKind::Capacitor { capacitance, state } => reactives.push(ReactiveElement {
                    id: element.id,
                    node0: element.node0,
                    node1: element.node1,
                    kind: ReactiveKind::Capacitor { capacitance },
                    state,
                }),
                ElementKind::Inductor { inductance, state } => reactives.push(ReactiveElement {
                    id: element.id,
                    node0: element.node0,
                    node1: element.node1,
                    kind: ReactiveKind::Inductor { inductance },
                    state,
                }),
            }
        }

        Self::new(ground, statics, reactives)
    }

    /// The designated reference node.
    pub fn ground(&self) -> NodeId {
        self.ground
    }

    /// Static elements, in snapshot order.
    pub fn statics(&self) -> &[StaticElement] {
        &self.statics
    }

    /// Reactive elements, in snapshot order.
    pub fn reactives(&self) -> &[ReactiveElement] {
        &self.reactives
    }

    /// Carried state of a reactive element, by id.
    pub fn reactive_state(&self, id: ElementId) -> Option<ReactiveState> {
        self.reactives
            .iter()
            .find(|element| element.id == id)
            .map(|element| element.state)
    }

    /// First node id free for synthetic companion-internal nodes.
    fn internal_node_base(&self) -> usize {
        let mut max = self.ground.0;
        for element in &self.statics {
            max = max.max(element.node0.0).max(element.node1.0);
        }
        for element in &self.reactives {
            max = max.max(element.node0.0).max(element.node1.0);
        }
        max + 1
    }

    /// Substitute companion models for this timestep, solve the resulting
    /// static system, and return a companion-aware solution.
    pub fn solve(&self, dt: f64, backend: &dyn LinearSolver) -> Result<DynamicSolution> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SolverError::InvalidTimestep { dt });
        }

        let mut batteries = Vec::new();
        let mut resistors = Vec::new();
        let mut current_sources = Vec::new();
        let mut readouts =
            HashMap::with_capacity(self.statics.len() + self.reactives.len());

        for element in &self.statics {
            let current = match element.kind {
                StaticKind::Resistor { resistance } => {
                    let index = resistors.len();
                    resistors.push(Resistor::new(element.node0, element.node1, resistance));
                    CurrentReadout::FromResistor { index }
                }
                StaticKind::Battery { voltage } => {
                    let index = batteries.len();
                    batteries.push(Battery::new(element.node0, element.node1, voltage));
                    CurrentReadout::FromBattery { index }
                }
                StaticKind::CurrentSource { current } => {
                    current_sources.push(CurrentSource::new(
                        element.node0,
                        element.node1,
                        current,
                    ));
                    CurrentReadout::Fixed { current }
                }
            };
            readouts.insert(
                element.id,
                Readout {
                    node0: element.node0,
                    node1: element.node1,
                    current,
                },
            );
        }

        let mut next_internal = self.internal_node_base();
        for element in &self.reactives {
            let current = match element.kind {
                ReactiveKind::Capacitor { capacitance } => {
                    let companion = CapacitorCompanion::new(capacitance, &element.state, dt);
                    resistors.push(Resistor::new(
                        element.node0,
                        element.node1,
                        companion.resistance,
                    ));
                    current_sources.push(CurrentSource::new(
                        element.node1,
                        element.node0,
                        companion.history_current,
                    ));
                    CurrentReadout::FromCompanion {
                        conductance: companion.conductance(),
                        history_current: companion.history_current,
                    }
                }
                ReactiveKind::Inductor { inductance } => {
                    let companion = InductorCompanion::new(inductance, &element.state, dt);
                    let internal = NodeId(next_internal);
                    next_internal += 1;
                    let index = batteries.len();
                    // The companion source's auxiliary unknown is the
                    // inductor current itself.
                    batteries.push(Battery::new(
                        element.node0,
                        internal,
                        companion.source_voltage,
                    ));
                    resistors.push(Resistor::new(internal, element.node1, companion.resistance));
                    CurrentReadout::FromBattery { index }
                }
            };
            readouts.insert(
                element.id,
                Readout {
                    node0: element.node0,
                    node1: element.node1,
                    current,
                },
            );
        }

        let mna = MnaCircuit::new(batteries, resistors, current_sources);
        let solution = mna.solve(self.ground, backend)?;

        Ok(DynamicSolution { solution, readouts })
    }

    /// Derive the circuit for the next step: same topology, reactive states
    /// replaced by their end-of-step values.
    pub fn next_circuit(&self, solution: &DynamicSolution) -> DynamicCircuit {
        let reactives = self
            .reactives
            .iter()
            .map(|element| {
                let voltage = solution.voltage(element.id).unwrap_or(element.state.voltage);
                let current = solution.current(element.id).unwrap_or(element.state.current);
                ReactiveElement {
                    state: ReactiveState::new(voltage, current),
                    ..*element
                }
            })
            .collect();
        DynamicCircuit {
            ground: self.ground,
            statics: self.statics.clone(),
            reactives,
        }
    }
}

/// A solved transient step, queryable by stable element id.
#[derive(Debug, Clone)]
pub struct DynamicSolution {
    solution: Solution,
    readouts: HashMap<ElementId, Readout>,
}

impl DynamicSolution {
    /// Voltage at a node; the reference node reads as 0.
    pub fn node_voltage(&self, node: NodeId) -> f64 {
        self.solution.voltage(node)
    }

    /// Voltage across an element, `V(node0) - V(node1)`.
    ///
    /// For an inductor this spans the original node pair, not the synthetic
    /// companion-internal node.
    pub fn voltage(&self, id: ElementId) -> Option<f64> {
        let readout = self.readouts.get(&id)?;
        Some(self.solution.voltage_across(readout.node0, readout.node1))
    }

    /// Current through an element, from `node0` to `node1`.
    pub fn current(&self, id: ElementId) -> Option<f64> {
        let readout = self.readouts.get(&id)?;
        let current = match readout.current {
            CurrentReadout::FromResistor { index } => self.solution.resistor_current(index),
            CurrentReadout::FromBattery { index } => self.solution.battery_current(index),
            CurrentReadout::Fixed { current } => current,
            CurrentReadout::FromCompanion {
                conductance,
                history_current,
            } => {
                conductance * self.solution.voltage_across(readout.node0, readout.node1)
                    - history_current
            }
        };
        Some(current)
    }
}

/// An immutable point in the transient integration.
///
/// `update(dt)` solves the held circuit for one step and returns a new state
/// carrying the advanced circuit and the step's solution; the input state is
/// untouched.
#[derive(Debug, Clone)]
pub struct DynamicState {
    circuit: DynamicCircuit,
    solution: Option<DynamicSolution>,
}

impl DynamicState {
    /// Wrap a circuit that has not been solved yet.
    pub fn new(circuit: DynamicCircuit) -> Self {
        Self {
            circuit,
            solution: None,
        }
    }

    /// The circuit as of this state.
    pub fn circuit(&self) -> &DynamicCircuit {
        &self.circuit
    }

    /// The solution that produced this state, if any.
    pub fn solution(&self) -> Option<&DynamicSolution> {
        self.solution.as_ref()
    }

    /// Advance by one step of `dt`, returning the new state.
    pub fn update(&self, dt: f64, backend: &dyn LinearSolver) -> Result<DynamicState> {
        let solution = self.circuit.solve(dt, backend)?;
        let circuit = self.circuit.next_circuit(&solution);
        Ok(DynamicState {
            circuit,
            solution: Some(solution),
        })
    }

    /// Currents through every reactive element, in snapshot order.
    ///
    /// These are the quantities whose rate of change determines local
    /// truncation error for the companion-model scheme, so they serve as the
    /// error signal for timestep subdivision.
    pub fn characteristic_currents(&self) -> Vec<f64> {
        self.circuit
            .reactives
            .iter()
            .map(|element| element.state.current)
            .collect()
    }

    /// Instantaneous current through an element.
    ///
    /// Falls back to the carried reactive state when this state has not been
    /// solved (an initial state); static elements have no current then.
    pub fn current(&self, id: ElementId) -> Option<f64> {
        match &self.solution {
            Some(solution) => solution.current(id),
            None => self.circuit.reactive_state(id).map(|state| state.current),
        }
    }

    /// Instantaneous voltage across an element; same fallback rules as
    /// [`DynamicState::current`].
    pub fn voltage(&self, id: ElementId) -> Option<f64> {
        match &self.solution {
            Some(solution) => solution.voltage(id),
            None => self.circuit.reactive_state(id).map(|state| state.voltage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::DenseLu;
    use approx::assert_abs_diff_eq;

    const GROUND: NodeId = NodeId(0);

    fn rc_circuit(resistance: f64, capacitance: f64) -> DynamicCircuit {
        // Battery 5 V feeding an RC low-pass to ground.
        DynamicCircuit::new(
            GROUND,
            vec![
                StaticElement {
                    id: ElementId(0),
                    node0: GROUND,
                    node1: NodeId(1),
                    kind: StaticKind::Battery { voltage: 5.0 },
                },
                StaticElement {
                    id: ElementId(1),
                    node0: NodeId(1),
                    node1: NodeId(2),
                    kind: StaticKind::Resistor { resistance },
                },
            ],
            vec![ReactiveElement {
                id: ElementId(2),
                node0: NodeId(2),
                node1: GROUND,
                kind: ReactiveKind::Capacitor { capacitance },
                state: ReactiveState::default(),
            }],
        )
    }

    #[test]
    fn test_single_step_satisfies_trapezoidal_rule() {
        let backend = DenseLu::new();
        let dt = 0.01;
        let circuit = rc_circuit(10.0, 1e-3);
        let solution = circuit.solve(dt, &backend).unwrap();

        let v_cap = solution.voltage(ElementId(2)).unwrap();
        let i_cap = solution.current(ElementId(2)).unwrap();

        // Trapezoidal relation from rest: i = (2C/dt) * v.
        assert_abs_diff_eq!(i_cap, 2.0 * 1e-3 / dt * v_cap, epsilon = 1e-9);
        // Loop voltage: battery = resistor drop + capacitor voltage.
        let i_res = solution.current(ElementId(1)).unwrap();
        assert_abs_diff_eq!(5.0, i_res * 10.0 + v_cap, epsilon = 1e-9);
        // Series loop carries one current.
        assert_abs_diff_eq!(i_res, i_cap, epsilon = 1e-9);
    }

    #[test]
    fn test_update_returns_new_state() {
        let backend = DenseLu::new();
        let initial = DynamicState::new(rc_circuit(10.0, 1e-3));
        let advanced = initial.update(0.01, &backend).unwrap();

        // Input state untouched.
        assert_eq!(
            initial.circuit().reactive_state(ElementId(2)),
            Some(ReactiveState::default())
        );
        // Advanced state carries the end-of-step values.
        let state = advanced.circuit().reactive_state(ElementId(2)).unwrap();
        assert!(state.voltage > 0.0);
        assert_abs_diff_eq!(
            state.voltage,
            advanced.voltage(ElementId(2)).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_capacitor_charges_to_battery_voltage() {
        let backend = DenseLu::new();
        // Time constant 10 ms, integrated for 100 time constants.
        let mut state = DynamicState::new(rc_circuit(10.0, 1e-3));
        for _ in 0..100 {
            state = state.update(0.01, &backend).unwrap();
        }
        let charged = state.circuit().reactive_state(ElementId(2)).unwrap();
        assert_abs_diff_eq!(charged.voltage, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(charged.current, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inductor_current_approaches_steady_state() {
        let backend = DenseLu::new();
        // Battery 5 V, 10 ohm, 0.1 H: steady-state current 0.5 A.
        let circuit = DynamicCircuit::new(
            GROUND,
            vec![
                StaticElement {
                    id: ElementId(0),
                    node0: GROUND,
                    node1: NodeId(1),
                    kind: StaticKind::Battery { voltage: 5.0 },
                },
                StaticElement {
                    id: ElementId(1),
                    node0: NodeId(1),
                    node1: NodeId(2),
                    kind: StaticKind::Resistor { resistance: 10.0 },
                },
            ],
            vec![ReactiveElement {
                id: ElementId(2),
                node0: NodeId(2),
                node1: GROUND,
                kind: ReactiveKind::Inductor { inductance: 0.1 },
                state: ReactiveState::default(),
            }],
        );
        let mut state = DynamicState::new(circuit);
        for _ in 0..2000 {
            state = state.update(0.001, &backend).unwrap();
        }
        let settled = state.circuit().reactive_state(ElementId(2)).unwrap();
        assert_abs_diff_eq!(settled.current, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(settled.voltage, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_characteristic_currents_track_reactive_state() {
        let backend = DenseLu::new();
        let initial = DynamicState::new(rc_circuit(10.0, 1e-3));
        assert_eq!(initial.characteristic_currents(), vec![0.0]);

        let advanced = initial.update(0.01, &backend).unwrap();
        let currents = advanced.characteristic_currents();
        assert_eq!(currents.len(), 1);
        assert_abs_diff_eq!(
            currents[0],
            advanced.current(ElementId(2)).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_zero_timestep_is_rejected() {
        let backend = DenseLu::new();
        let circuit = rc_circuit(10.0, 1e-3);
        let err = circuit.solve(0.0, &backend).unwrap_err();
        assert!(matches!(err, SolverError::InvalidTimestep { .. }));
    }

    #[test]
    fn test_switch_lowering() {
        let elements = [
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::switch(ElementId(1), NodeId(1), NodeId(2), false),
            ElementSnapshot::resistor(ElementId(2), NodeId(2), GROUND, 3.0),
        ];
        let circuit = DynamicCircuit::from_snapshot(&elements, GROUND);
        assert!(matches!(
            circuit.statics()[1].kind,
            StaticKind::Resistor { resistance } if resistance == OPEN_SWITCH_RESISTANCE
        ));

        let closed = DynamicCircuit::from_snapshot(
            &[ElementSnapshot::switch(ElementId(1), NodeId(1), NodeId(2), true)],
            GROUND,
        );
        assert!(matches!(
            closed.statics()[0].kind,
            StaticKind::Resistor { resistance } if resistance == 0.0
        ));
    }
}
