//! Per-frame solve entry point.
//!
//! The host simulation calls [`CircuitEngine::solve`] once per animation
//! frame with a flattened element snapshot, the reference node, and the
//! frame timestep. The result carries instantaneous and time-averaged
//! quantities for every element plus the reactive state the caller stores
//! and feeds back next frame. The engine itself keeps nothing between
//! frames; topology changes simply arrive as a different snapshot.

use std::collections::{HashMap, HashSet};

use crate::circuit::{ElementId, ElementKind, ElementSnapshot, NodeId, ReactiveState};
use crate::error::{Result, SolverError};
use crate::solver::{
    DenseLu, DynamicCircuit, DynamicState, LinearSolver, TimestepSubdivisions,
    DEFAULT_MAX_DEPTH, DEFAULT_SUBDIVISION_TOLERANCE,
};

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct SolveConfig {
    /// Subdivision accept tolerance, in amperes.
    pub tolerance: f64,
    /// Maximum timestep bisection depth per frame.
    pub max_depth: usize,
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SUBDIVISION_TOLERANCE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SolveConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the subdivision accept tolerance (in amperes).
    ///
    /// Lower tolerance = finer sub-steps and smoother readouts, at the cost
    /// of more solves per frame.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum bisection depth. Depth 0 disables subdivision.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Solved quantities for one element of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementResult {
    /// Current through the element at the end of the frame, node0 -> node1.
    pub current: f64,
    /// Voltage across the element at the end of the frame,
    /// `V(node0) - V(node1)`.
    pub voltage: f64,
    /// Duration-weighted average current over the frame's sub-steps.
    pub average_current: f64,
    /// Duration-weighted average voltage over the frame's sub-steps.
    pub average_voltage: f64,
    /// Updated carried state, for capacitors and inductors only. The caller
    /// stores this and supplies it in the next frame's snapshot.
    pub state: Option<ReactiveState>,
}

/// The outcome of one frame's solve.
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    results: HashMap<ElementId, ElementResult>,
    depth_exceeded: bool,
}

impl FrameResult {
    /// Look up an element's solved quantities by its stable id.
    pub fn element(&self, id: ElementId) -> Option<&ElementResult> {
        self.results.get(&id)
    }

    /// Iterate over all per-element results.
    pub fn iter(&self) -> impl Iterator<Item = (&ElementId, &ElementResult)> {
        self.results.iter()
    }

    /// Number of elements in the result.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the result is empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Whether any sub-step was accepted only because the bisection depth
    /// bound was reached. Accuracy is degraded for this frame.
    pub fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }
}

/// The circuit analysis engine.
///
/// Stateless between frames; cheap to construct once and reuse.
pub struct CircuitEngine {
    config: SolveConfig,
    backend: Box<dyn LinearSolver>,
}

impl Default for CircuitEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitEngine {
    /// Create an engine with the default configuration and the standard
    /// double-precision backend.
    pub fn new() -> Self {
        Self::with_config(SolveConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(config: SolveConfig) -> Self {
        Self {
            config,
            backend: Box::new(DenseLu::new()),
        }
    }

    /// Replace the linear-algebra backend.
    pub fn with_backend(mut self, backend: Box<dyn LinearSolver>) -> Self {
        self.backend = backend;
        self
    }

    /// Solve one frame.
    ///
    /// `dt == 0` is a no-op frame: carried state is echoed unchanged and no
    /// system is solved. Singular topologies and non-finite results surface
    /// as errors; subdivision depth exhaustion is reported on the
    /// [`FrameResult`] instead, with a best-effort solution.
    pub fn solve(
        &self,
        elements: &[ElementSnapshot],
        ground: NodeId,
        dt: f64,
    ) -> Result<FrameResult> {
        validate_snapshot(elements, ground, dt)?;

        if elements.is_empty() {
            return Ok(FrameResult::default());
        }

        let circuit = DynamicCircuit::from_snapshot(elements, ground);
        let initial = DynamicState::new(circuit);
        let subdivisions = TimestepSubdivisions::new(self.config.tolerance, self.config.max_depth);
        let history = subdivisions.advance(initial, dt, self.backend.as_ref())?;

        tracing::debug!(
            elements = elements.len(),
            sub_steps = history.steps().len(),
            dt,
            depth_exceeded = history.depth_exceeded(),
            "frame solved"
        );

        let final_state = history.final_state();
        let mut results = HashMap::with_capacity(elements.len());
        for element in elements {
            let current = final_state.current(element.id).unwrap_or(0.0);
            let voltage = final_state.voltage(element.id).unwrap_or(0.0);
            let average_current = history.average_current(element.id).unwrap_or(current);
            let average_voltage = history.average_voltage(element.id).unwrap_or(voltage);
            let state = final_state.circuit().reactive_state(element.id);
            results.insert(
                element.id,
                ElementResult {
                    current,
                    voltage,
                    average_current,
                    average_voltage,
                    state,
                },
            );
        }

        Ok(FrameResult {
            results,
            depth_exceeded: history.depth_exceeded(),
        })
    }
}

/// Reject malformed snapshots before any numerical work.
fn validate_snapshot(elements: &[ElementSnapshot], ground: NodeId, dt: f64) -> Result<()> {
    if !dt.is_finite() || dt < 0.0 {
        return Err(SolverError::InvalidTimestep { dt });
    }

    let mut seen = HashSet::with_capacity(elements.len());
    let mut touches_ground = false;

    for element in elements {
        if !seen.insert(element.id) {
            return Err(SolverError::DuplicateElement {
                element: element.id,
            });
        }
        if element.node0 == ground || element.node1 == ground {
            touches_ground = true;
        }
        validate_kind(element)?;
    }

    if !elements.is_empty() && !touches_ground {
        return Err(SolverError::MissingGround { node: ground });
    }

    Ok(())
}

fn validate_kind(element: &ElementSnapshot) -> Result<()> {
    let check_finite = |name: &str, value: f64| -> Result<()> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(SolverError::invalid_parameter(
                element.id,
                format!("{name} must be finite, got {value}"),
            ))
        }
    };

    match element.kind {
        ElementKind::Resistor { resistance } => {
            check_finite("resistance", resistance)?;
            if resistance < 0.0 {
                return Err(SolverError::invalid_parameter(
                    element.id,
                    format!("resistance must be non-negative, got {resistance}"),
                ));
            }
        }
        ElementKind::Battery { voltage } => check_finite("voltage", voltage)?,
        ElementKind::CurrentSource { current } => check_finite("current", current)?,
        ElementKind::Capacitor { capacitance, state } => {
            check_finite("capacitance", capacitance)?;
            if capacitance <= 0.0 {
                return Err(SolverError::invalid_parameter(
                    element.id,
                    format!("capacitance must be positive, got {capacitance}"),
                ));
            }
            check_finite("carried voltage", state.voltage)?;
            check_finite("carried current", state.current)?;
        }
        ElementKind::Inductor { inductance, state } => {
            check_finite("inductance", inductance)?;
            if inductance <= 0.0 {
                return Err(SolverError::invalid_parameter(
                    element.id,
                    format!("inductance must be positive, got {inductance}"),
                ));
            }
            check_finite("carried voltage", state.voltage)?;
            check_finite("carried current", state.current)?;
        }
        ElementKind::Switch { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const GROUND: NodeId = NodeId(0);
    const FRAME_DT: f64 = 1.0 / 60.0;

    fn simple_loop() -> Vec<ElementSnapshot> {
        vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), GROUND, 3.0),
        ]
    }

    fn rc_snapshot(state: ReactiveState) -> Vec<ElementSnapshot> {
        vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), NodeId(2), 100.0),
            ElementSnapshot::capacitor(ElementId(2), NodeId(2), GROUND, 1e-4, state),
        ]
    }

    #[test]
    fn test_simple_loop_frame() {
        let engine = CircuitEngine::new();
        let result = engine.solve(&simple_loop(), GROUND, FRAME_DT).unwrap();

        let resistor = result.element(ElementId(1)).unwrap();
        assert_abs_diff_eq!(resistor.current, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(resistor.voltage, 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(resistor.average_current, 3.0, epsilon = 1e-9);
        assert!(resistor.state.is_none());

        let battery = result.element(ElementId(0)).unwrap();
        assert_abs_diff_eq!(battery.current, 3.0, epsilon = 1e-9);
        assert!(!result.depth_exceeded());
    }

    #[test]
    fn test_parallel_resistors_frame() {
        let elements = vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 4.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), GROUND, 4.0),
            ElementSnapshot::resistor(ElementId(2), NodeId(1), GROUND, 4.0),
        ];
        let result = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();
        assert_abs_diff_eq!(
            result.element(ElementId(0)).unwrap().current,
            2.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            result.element(ElementId(1)).unwrap().current,
            1.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            result.element(ElementId(2)).unwrap().current,
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_state_carries_across_frames_to_full_charge() {
        let engine = CircuitEngine::new();
        // Time constant 10 ms against 16.7 ms frames: several frames to
        // converge, exercising the carried-state round trip.
        let mut state = ReactiveState::default();
        for _ in 0..60 {
            let result = engine.solve(&rc_snapshot(state), GROUND, FRAME_DT).unwrap();
            state = result.element(ElementId(2)).unwrap().state.unwrap();
        }
        assert_abs_diff_eq!(state.voltage, 9.0, epsilon = 1e-4);
        assert_abs_diff_eq!(state.current, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_inductor_ramps_across_frames() {
        let engine = CircuitEngine::new();
        // Time constant 5 ms; a second of frames reaches 5 V / 10 ohm.
        let mut state = ReactiveState::default();
        for _ in 0..60 {
            let elements = [
                ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 5.0),
                ElementSnapshot::resistor(ElementId(1), NodeId(1), NodeId(2), 10.0),
                ElementSnapshot::inductor(ElementId(2), NodeId(2), GROUND, 0.05, state),
            ];
            let result = engine.solve(&elements, GROUND, FRAME_DT).unwrap();
            state = result.element(ElementId(2)).unwrap().state.unwrap();
        }
        assert_abs_diff_eq!(state.current, 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(state.voltage, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_current_source_drives_resistor() {
        let elements = [
            ElementSnapshot::current_source(ElementId(0), GROUND, NodeId(1), 2.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), GROUND, 5.0),
        ];
        let result = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();
        assert_abs_diff_eq!(
            result.element(ElementId(1)).unwrap().voltage,
            10.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            result.element(ElementId(0)).unwrap().current,
            2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_solve_is_bit_for_bit_deterministic() {
        let elements = rc_snapshot(ReactiveState::new(1.25, 0.0625));
        let a = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();
        let b = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();

        for id in [ElementId(0), ElementId(1), ElementId(2)] {
            let ra = a.element(id).unwrap();
            let rb = b.element(id).unwrap();
            assert_eq!(ra.current.to_bits(), rb.current.to_bits());
            assert_eq!(ra.voltage.to_bits(), rb.voltage.to_bits());
            assert_eq!(ra.average_current.to_bits(), rb.average_current.to_bits());
            assert_eq!(ra.average_voltage.to_bits(), rb.average_voltage.to_bits());
            assert_eq!(ra.state.is_some(), rb.state.is_some());
        }
    }

    #[test]
    fn test_subdivision_improves_stiff_accuracy() {
        // Time constant 1 ms against a 12 ms frame: without subdivision the
        // only two permitted half steps overshoot the battery voltage.
        let elements = vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), NodeId(2), 1.0),
            ElementSnapshot::capacitor(
                ElementId(2),
                NodeId(2),
                GROUND,
                1e-3,
                ReactiveState::default(),
            ),
        ];
        let dt = 0.012;

        let subdivided = CircuitEngine::with_config(SolveConfig::new().with_max_depth(12))
            .solve(&elements, GROUND, dt)
            .unwrap();
        let flat = CircuitEngine::with_config(SolveConfig::new().with_max_depth(0))
            .solve(&elements, GROUND, dt)
            .unwrap();

        let v_subdivided = subdivided.element(ElementId(2)).unwrap().state.unwrap().voltage;
        let v_flat = flat.element(ElementId(2)).unwrap().state.unwrap().voltage;

        // Twelve time constants in, the subdivided run has settled at the
        // battery voltage; the flat run rings past it.
        assert!((v_subdivided - 9.0).abs() < 1e-2);
        assert!(v_flat > 10.0);
        assert!((v_flat - 9.0).abs() > 1.0);
        assert!(flat.depth_exceeded());
    }

    #[test]
    fn test_open_switch_produces_near_zero_finite_current() {
        let elements = vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::switch(ElementId(1), NodeId(1), NodeId(2), false),
            ElementSnapshot::resistor(ElementId(2), NodeId(2), GROUND, 3.0),
        ];
        let result = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();
        let current = result.element(ElementId(1)).unwrap().current;
        assert!(current.is_finite());
        assert!(current.abs() < 1e-7);
    }

    #[test]
    fn test_closed_switch_in_series_carries_full_current() {
        let elements = vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::switch(ElementId(1), NodeId(1), NodeId(2), true),
            ElementSnapshot::resistor(ElementId(2), NodeId(2), GROUND, 3.0),
        ];
        let result = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();
        assert_abs_diff_eq!(
            result.element(ElementId(1)).unwrap().current,
            3.0,
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(
            result.element(ElementId(1)).unwrap().voltage,
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_resistance_in_series_with_battery() {
        let elements = vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), NodeId(2), 0.0),
            ElementSnapshot::resistor(ElementId(2), NodeId(2), GROUND, 3.0),
        ];
        let result = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap();
        assert_abs_diff_eq!(
            result.element(ElementId(1)).unwrap().current,
            3.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_zero_dt_frame_echoes_state() {
        let carried = ReactiveState::new(4.5, 0.125);
        let result = CircuitEngine::new()
            .solve(&rc_snapshot(carried), GROUND, 0.0)
            .unwrap();
        let capacitor = result.element(ElementId(2)).unwrap();
        assert_eq!(capacitor.state, Some(carried));
        assert_eq!(capacitor.voltage, carried.voltage);
        assert_eq!(capacitor.current, carried.current);
        // Nothing was solved for static elements.
        assert_eq!(result.element(ElementId(1)).unwrap().current, 0.0);
    }

    #[test]
    fn test_empty_snapshot() {
        let result = CircuitEngine::new().solve(&[], GROUND, FRAME_DT).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_validation_errors() {
        let engine = CircuitEngine::new();

        let negative_dt = engine.solve(&simple_loop(), GROUND, -1.0).unwrap_err();
        assert!(matches!(negative_dt, SolverError::InvalidTimestep { .. }));

        let no_ground = engine
            .solve(&simple_loop(), NodeId(99), FRAME_DT)
            .unwrap_err();
        assert!(matches!(no_ground, SolverError::MissingGround { .. }));

        let duplicate = engine
            .solve(
                &[
                    ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
                    ElementSnapshot::resistor(ElementId(0), NodeId(1), GROUND, 3.0),
                ],
                GROUND,
                FRAME_DT,
            )
            .unwrap_err();
        assert!(matches!(duplicate, SolverError::DuplicateElement { .. }));

        let negative_resistance = engine
            .solve(
                &[
                    ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
                    ElementSnapshot::resistor(ElementId(1), NodeId(1), GROUND, -3.0),
                ],
                GROUND,
                FRAME_DT,
            )
            .unwrap_err();
        assert!(matches!(
            negative_resistance,
            SolverError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_floating_section_surfaces_singular_matrix() {
        let elements = vec![
            ElementSnapshot::battery(ElementId(0), GROUND, NodeId(1), 9.0),
            ElementSnapshot::resistor(ElementId(1), NodeId(1), GROUND, 3.0),
            ElementSnapshot::resistor(ElementId(2), NodeId(5), NodeId(6), 1.0),
            ElementSnapshot::resistor(ElementId(3), NodeId(6), NodeId(5), 1.0),
        ];
        let err = CircuitEngine::new()
            .solve(&elements, GROUND, FRAME_DT)
            .unwrap_err();
        assert!(matches!(err, SolverError::SingularMatrix));
    }
}
