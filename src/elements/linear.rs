//! Resistor, battery, and current source value objects.

use crate::circuit::NodeId;

use super::TwoTerminal;

/// An ohmic element with a fixed resistance.
///
/// A resistance of exactly zero cannot be stamped as a conductance; the
/// solver models it as a zero-voltage source with an auxiliary branch
/// current instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resistor {
    pub node0: NodeId,
    pub node1: NodeId,
    pub resistance: f64,
}

impl Resistor {
    /// Create a new resistor.
    pub fn new(node0: NodeId, node1: NodeId, resistance: f64) -> Self {
        Self {
            node0,
            node1,
            resistance,
        }
    }

    /// Check whether this resistor must be solved through the
    /// auxiliary-current path.
    pub fn is_short(&self) -> bool {
        self.resistance == 0.0
    }

    /// Get the conductance (1/R). Only meaningful when not a short.
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }
}

impl TwoTerminal for Resistor {
    fn node0(&self) -> NodeId {
        self.node0
    }

    fn node1(&self) -> NodeId {
        self.node1
    }
}

/// An ideal voltage source.
///
/// `node1` is the positive terminal: the source enforces
/// `V(node1) - V(node0) = voltage` and requires an auxiliary branch-current
/// unknown in the solved system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Battery {
    pub node0: NodeId,
    pub node1: NodeId,
    pub voltage: f64,
}

impl Battery {
    /// Create a new battery; `node1` is the positive terminal.
    pub fn new(node0: NodeId, node1: NodeId, voltage: f64) -> Self {
        Self {
            node0,
            node1,
            voltage,
        }
    }
}

impl TwoTerminal for Battery {
    fn node0(&self) -> NodeId {
        self.node0
    }

    fn node1(&self) -> NodeId {
        self.node1
    }
}

/// An ideal current source driving `current` from `node0` to `node1`.
///
/// Contributes only to the right-hand-side injection vector; it never
/// appears in the matrix itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentSource {
    pub node0: NodeId,
    pub node1: NodeId,
    pub current: f64,
}

impl CurrentSource {
    /// Create a new current source.
    pub fn new(node0: NodeId, node1: NodeId, current: f64) -> Self {
        Self {
            node0,
            node1,
            current,
        }
    }
}

impl TwoTerminal for CurrentSource {
    fn node0(&self) -> NodeId {
        self.node0
    }

    fn node1(&self) -> NodeId {
        self.node1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new(NodeId(1), NodeId(0), 1000.0);
        assert!((r.conductance() - 0.001).abs() < 1e-12);
        assert!(!r.is_short());
        assert!(Resistor::new(NodeId(1), NodeId(0), 0.0).is_short());
    }

    #[test]
    fn test_contains_and_opposite_node() {
        let b = Battery::new(NodeId(0), NodeId(2), 9.0);
        assert!(b.contains_node(NodeId(0)));
        assert!(b.contains_node(NodeId(2)));
        assert!(!b.contains_node(NodeId(1)));
        assert_eq!(b.opposite_node(NodeId(0)), Some(NodeId(2)));
        assert_eq!(b.opposite_node(NodeId(2)), Some(NodeId(0)));
        assert_eq!(b.opposite_node(NodeId(5)), None);
    }

    #[test]
    fn test_self_loop_opposite_node() {
        let i = CurrentSource::new(NodeId(4), NodeId(4), 1.0);
        assert_eq!(i.opposite_node(NodeId(4)), Some(NodeId(4)));
    }
}
