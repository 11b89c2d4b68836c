//! Flattened per-frame element snapshots.
//!
//! Sign convention, applied uniformly across the engine: every element's
//! current is measured flowing from `node0` to `node1` through the element,
//! and a battery's `node1` is its positive terminal, so a battery enforces
//! `V(node1) - V(node0) = voltage`. A battery and a resistor wired head to
//! tail around a loop therefore report the same current sign.

use super::types::{ElementId, NodeId};

/// Resistance used for an open switch.
///
/// Large but finite, so opening a switch yields a near-zero current instead
/// of a singular matrix.
pub const OPEN_SWITCH_RESISTANCE: f64 = 1e9;

/// Carried-forward terminal state of a capacitor or inductor.
///
/// The caller stores this from one frame's [`FrameResult`] and feeds it back
/// in the next frame's snapshot; the engine never retains it between frames.
///
/// [`FrameResult`]: crate::engine::FrameResult
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ReactiveState {
    /// Voltage across the element, `V(node0) - V(node1)`.
    pub voltage: f64,
    /// Current through the element, from `node0` to `node1`.
    pub current: f64,
}

impl ReactiveState {
    /// Create a reactive state from a voltage/current pair.
    pub fn new(voltage: f64, current: f64) -> Self {
        Self { voltage, current }
    }
}

/// Electrical law and parameters of a snapshot element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementKind {
    /// Ohmic element. A resistance of exactly zero is legal and is solved
    /// through the auxiliary-current path rather than as a conductance.
    Resistor { resistance: f64 },
    /// Ideal voltage source; `node1` is the positive terminal.
    Battery { voltage: f64 },
    /// Ideal current source driving `current` from `node0` to `node1`.
    CurrentSource { current: f64 },
    /// Capacitor with carried-forward state from the previous frame.
    Capacitor { capacitance: f64, state: ReactiveState },
    /// Inductor with carried-forward state from the previous frame.
    Inductor { inductance: f64, state: ReactiveState },
    /// Switch: closed is a zero-resistance connection, open is
    /// [`OPEN_SWITCH_RESISTANCE`].
    Switch { closed: bool },
}

/// One element of the flattened circuit snapshot handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub node0: NodeId,
    pub node1: NodeId,
    pub kind: ElementKind,
}

impl ElementSnapshot {
    /// Create a snapshot element.
    pub fn new(id: ElementId, node0: NodeId, node1: NodeId, kind: ElementKind) -> Self {
        Self {
            id,
            node0,
            node1,
            kind,
        }
    }

    /// Create a resistor snapshot.
    pub fn resistor(id: ElementId, node0: NodeId, node1: NodeId, resistance: f64) -> Self {
        Self::new(id, node0, node1, ElementKind::Resistor { resistance })
    }

    /// Create a battery snapshot; `node1` is the positive terminal.
    pub fn battery(id: ElementId, node0: NodeId, node1: NodeId, voltage: f64) -> Self {
        Self::new(id, node0, node1, ElementKind::Battery { voltage })
    }

    /// Create a current source snapshot driving `current` from `node0` to
    /// `node1`.
    pub fn current_source(id: ElementId, node0: NodeId, node1: NodeId, current: f64) -> Self {
        Self::new(id, node0, node1, ElementKind::CurrentSource { current })
    }

    /// Create a capacitor snapshot with carried-forward state.
    pub fn capacitor(
        id: ElementId,
        node0: NodeId,
        node1: NodeId,
        capacitance: f64,
        state: ReactiveState,
    ) -> Self {
        Self::new(id, node0, node1, ElementKind::Capacitor { capacitance, state })
    }

    /// Create an inductor snapshot with carried-forward state.
    pub fn inductor(
        id: ElementId,
        node0: NodeId,
        node1: NodeId,
        inductance: f64,
        state: ReactiveState,
    ) -> Self {
        Self::new(id, node0, node1, ElementKind::Inductor { inductance, state })
    }

    /// Create a switch snapshot.
    pub fn switch(id: ElementId, node0: NodeId, node1: NodeId, closed: bool) -> Self {
        Self::new(id, node0, node1, ElementKind::Switch { closed })
    }

    /// Check whether this element carries reactive (capacitor/inductor) state.
    pub fn is_reactive(&self) -> bool {
        matches!(
            self.kind,
            ElementKind::Capacitor { .. } | ElementKind::Inductor { .. }
        )
    }
}
