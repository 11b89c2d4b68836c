//! Aggregation of the accepted sub-steps for one frame.

use crate::circuit::ElementId;

use super::transient::DynamicState;

/// One accepted sub-step: the state at its end and its duration.
#[derive(Debug, Clone)]
pub struct HistoryStep {
    pub state: DynamicState,
    pub dt: f64,
}

/// The ordered sub-step sequence produced for one frame.
///
/// Exposes both kinds of reportable quantities: the final state (the
/// baseline for the next frame and for instantaneous queries) and the
/// duration-weighted average over all sub-steps (smooth, flicker-free
/// readouts even when a stiff transient makes instantaneous currents spike).
#[derive(Debug, Clone)]
pub struct StateHistory {
    steps: Vec<HistoryStep>,
    final_state: DynamicState,
    depth_exceeded: bool,
}

impl StateHistory {
    /// Create a history from accepted steps and the end-of-frame state.
    pub(crate) fn new(
        steps: Vec<HistoryStep>,
        final_state: DynamicState,
        depth_exceeded: bool,
    ) -> Self {
        Self {
            steps,
            final_state,
            depth_exceeded,
        }
    }

    /// Create the history of a zero-length frame: the input state, untouched.
    pub(crate) fn no_op(state: DynamicState) -> Self {
        Self {
            steps: Vec::new(),
            final_state: state,
            depth_exceeded: false,
        }
    }

    /// The accepted sub-steps, in order.
    pub fn steps(&self) -> &[HistoryStep] {
        &self.steps
    }

    /// The state at the end of the frame.
    pub fn final_state(&self) -> &DynamicState {
        &self.final_state
    }

    /// Whether any sub-step was accepted only because the bisection depth
    /// bound was reached.
    pub fn depth_exceeded(&self) -> bool {
        self.depth_exceeded
    }

    /// Total duration covered by the accepted sub-steps.
    pub fn total_time(&self) -> f64 {
        self.steps.iter().map(|step| step.dt).sum()
    }

    /// Duration-weighted average current through an element.
    ///
    /// A zero-length frame reports the instantaneous value.
    pub fn average_current(&self, id: ElementId) -> Option<f64> {
        self.weighted_average(|state| state.current(id))
    }

    /// Duration-weighted average voltage across an element.
    pub fn average_voltage(&self, id: ElementId) -> Option<f64> {
        self.weighted_average(|state| state.voltage(id))
    }

    fn weighted_average<F>(&self, quantity: F) -> Option<f64>
    where
        F: Fn(&DynamicState) -> Option<f64>,
    {
        let total = self.total_time();
        if total <= 0.0 {
            return quantity(&self.final_state);
        }
        let mut accumulated = 0.0;
        for step in &self.steps {
            accumulated += quantity(&step.state)? * step.dt;
        }
        Some(accumulated / total)
    }
}
