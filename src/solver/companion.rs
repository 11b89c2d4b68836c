//! Trapezoidal companion models for reactive elements.
//!
//! A capacitor or inductor with known terminal state at the start of a step
//! is substituted by a small network of elements the static solver already
//! understands, valid for exactly one timestep size. Both substitutions are
//! pure functions of `(parameters, prior state, dt)`, which lets the
//! subdivision controller re-derive them for arbitrary sub-steps without
//! touching the rest of the circuit.

use crate::circuit::ReactiveState;

/// Norton companion of a capacitor for one timestep.
///
/// Trapezoidal discretization of `i = C dv/dt` gives
///   `i(n) = G_eq * v(n) - I_eq`
/// with `G_eq = 2C/dt` and `I_eq = G_eq * v(n-1) + i(n-1)`: an equivalent
/// resistance `1/G_eq` between the terminals in parallel with a history
/// current `I_eq` driven from node1 back to node0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacitorCompanion {
    /// Equivalent parallel resistance, `dt / 2C`.
    pub resistance: f64,
    /// History current `I_eq`.
    pub history_current: f64,
}

impl CapacitorCompanion {
    /// Derive the companion for a capacitor with the given prior state.
    pub fn new(capacitance: f64, state: &ReactiveState, dt: f64) -> Self {
        let resistance = dt / (2.0 * capacitance);
        let history_current = state.voltage / resistance + state.current;
        Self {
            resistance,
            history_current,
        }
    }

    /// Equivalent conductance `G_eq = 2C/dt`.
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Capacitor current at the end of the step, from the solved voltage
    /// across the terminals.
    pub fn current(&self, voltage: f64) -> f64 {
        self.conductance() * voltage - self.history_current
    }
}

/// Thevenin companion of an inductor for one timestep.
///
/// Trapezoidal discretization of `v = L di/dt` gives
///   `v(n) = R_eq * i(n) - V_eq`
/// with `R_eq = 2L/dt` and `V_eq = R_eq * i(n-1) + v(n-1)`: a source `V_eq`
/// in series with `R_eq`, oriented along the inductor's current sense. The
/// series pair is wired through a synthetic internal node so the node
/// indexing invariant stays uniform, and the source's auxiliary unknown is
/// the inductor current itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InductorCompanion {
    /// Equivalent series resistance, `2L / dt`.
    pub resistance: f64,
    /// History source voltage `V_eq`.
    pub source_voltage: f64,
}

impl InductorCompanion {
    /// Derive the companion for an inductor with the given prior state.
    pub fn new(inductance: f64, state: &ReactiveState, dt: f64) -> Self {
        let resistance = 2.0 * inductance / dt;
        let source_voltage = resistance * state.current + state.voltage;
        Self {
            resistance,
            source_voltage,
        }
    }

    /// Inductor voltage at the end of the step, from the solved current.
    pub fn voltage(&self, current: f64) -> f64 {
        self.resistance * current - self.source_voltage
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_capacitor_companion_parameters() {
        // 1 uF at 48 kHz steps: G_eq = 2C/dt = 96 mS.
        let dt = 1.0 / 48_000.0;
        let companion = CapacitorCompanion::new(1e-6, &ReactiveState::default(), dt);
        assert_relative_eq!(companion.conductance(), 0.096, max_relative = 1e-12);
        assert_relative_eq!(companion.history_current, 0.0);
    }

    #[test]
    fn test_capacitor_history_carries_prior_state() {
        let dt = 0.01;
        let state = ReactiveState::new(2.0, 0.5);
        let companion = CapacitorCompanion::new(0.05, &state, dt);
        // G_eq = 2 * 0.05 / 0.01 = 10 S, I_eq = 10 * 2 + 0.5 = 20.5 A.
        assert_relative_eq!(companion.conductance(), 10.0, max_relative = 1e-12);
        assert_relative_eq!(companion.history_current, 20.5, max_relative = 1e-12);
        // Voltage held constant: current equals C dv/dt average, here -0.5
        // to cancel the carried current per the trapezoidal rule.
        assert_relative_eq!(companion.current(2.0), -0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_inductor_companion_parameters() {
        let dt = 0.002;
        let state = ReactiveState::new(1.0, 0.25);
        let companion = InductorCompanion::new(0.1, &state, dt);
        // R_eq = 2 * 0.1 / 0.002 = 100 ohm, V_eq = 100 * 0.25 + 1 = 26 V.
        assert_relative_eq!(companion.resistance, 100.0, max_relative = 1e-12);
        assert_relative_eq!(companion.source_voltage, 26.0, max_relative = 1e-12);
        // Current held constant: voltage collapses to -v(n-1).
        assert_relative_eq!(companion.voltage(0.25), -1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_companion_is_pure() {
        let state = ReactiveState::new(3.0, -1.0);
        let a = CapacitorCompanion::new(1e-3, &state, 0.004);
        let b = CapacitorCompanion::new(1e-3, &state, 0.004);
        assert_eq!(a, b);
    }
}
