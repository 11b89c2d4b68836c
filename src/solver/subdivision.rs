//! Recursive adaptive timestep subdivision.
//!
//! For each candidate step the controller solves the interval once coarsely
//! and once as two half steps, then compares the reactive-element currents
//! of the two outcomes. Agreement within tolerance accepts the fine result;
//! disagreement bisects and treats each half independently, so a stiff
//! transient is resolved finely only where it actually lives. The depth
//! bound guarantees a frame always completes, trading accuracy for
//! continuity when it is hit.

use crate::error::Result;

use super::linalg::LinearSolver;
use super::results::{HistoryStep, StateHistory};
use super::transient::DynamicState;
use super::{DEFAULT_MAX_DEPTH, DEFAULT_SUBDIVISION_TOLERANCE};

/// Adaptive bisection controller for one frame's timestep.
#[derive(Debug, Clone)]
pub struct TimestepSubdivisions {
    /// Accept threshold, in amperes, on the maximum absolute divergence
    /// between coarse and fine reactive-element currents.
    pub tolerance: f64,
    /// Maximum bisection depth.
    pub max_depth: usize,
}

impl Default for TimestepSubdivisions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_SUBDIVISION_TOLERANCE,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TimestepSubdivisions {
    /// Create a controller with the given tolerance and depth bound.
    pub fn new(tolerance: f64, max_depth: usize) -> Self {
        Self {
            tolerance,
            max_depth,
        }
    }

    /// Advance `state` across one frame of `dt`, subdividing as needed.
    ///
    /// A zero `dt` is a no-op returning the input state unchanged. Depth
    /// exhaustion still produces a usable best-effort history; it is
    /// reported on the history and logged, never raised as an error.
    pub fn advance(
        &self,
        state: DynamicState,
        dt: f64,
        backend: &dyn LinearSolver,
    ) -> Result<StateHistory> {
        if dt == 0.0 {
            return Ok(StateHistory::no_op(state));
        }

        let mut steps = Vec::new();
        let mut exhausted = false;
        let final_state =
            self.subdivide(&state, dt, self.max_depth, backend, &mut steps, &mut exhausted)?;

        if exhausted {
            tracing::warn!(
                dt,
                max_depth = self.max_depth,
                "subdivision depth exhausted; accepting reduced-accuracy steps"
            );
        }

        Ok(StateHistory::new(steps, final_state, exhausted))
    }

    /// Accept or bisect one candidate step, appending accepted sub-steps.
    /// Returns the state at the end of the interval.
    fn subdivide(
        &self,
        state: &DynamicState,
        dt: f64,
        depth: usize,
        backend: &dyn LinearSolver,
        steps: &mut Vec<HistoryStep>,
        exhausted: &mut bool,
    ) -> Result<DynamicState> {
        let coarse = state.update(dt, backend)?;
        let half = dt / 2.0;
        let fine = state.update(half, backend)?.update(half, backend)?;

        let error = characteristic_divergence(&coarse, &fine);
        if error <= self.tolerance || depth == 0 {
            if error > self.tolerance {
                *exhausted = true;
            }
            // The two half steps are the higher-accuracy outcome.
            steps.push(HistoryStep {
                state: fine.clone(),
                dt,
            });
            return Ok(fine);
        }

        let midpoint = self.subdivide(state, half, depth - 1, backend, steps, exhausted)?;
        self.subdivide(&midpoint, half, depth - 1, backend, steps, exhausted)
    }
}

/// Maximum absolute difference between the reactive-element currents of two
/// candidate outcomes. Resistive-only circuits diverge by exactly zero.
fn characteristic_divergence(coarse: &DynamicState, fine: &DynamicState) -> f64 {
    coarse
        .characteristic_currents()
        .iter()
        .zip(fine.characteristic_currents().iter())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}
