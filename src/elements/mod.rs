//! Linear system element set.
//!
//! Plain value objects identifying two node labels and a defining electrical
//! law. The nodal solver consumes these identically whether they came from a
//! real circuit part or from companion substitution of a capacitor or
//! inductor.

mod linear;

pub use linear::{Battery, CurrentSource, Resistor};

use crate::circuit::NodeId;

/// Two-terminal behavior shared by every member of the element set.
///
/// Self-loops (`node0 == node1`) are legal; they contribute nothing to the
/// solved system.
pub trait TwoTerminal {
    /// First terminal.
    fn node0(&self) -> NodeId;

    /// Second terminal.
    fn node1(&self) -> NodeId;

    /// Check whether `node` is one of this element's terminals.
    fn contains_node(&self, node: NodeId) -> bool {
        node == self.node0() || node == self.node1()
    }

    /// Get the terminal opposite `node`, or `None` if `node` is not a
    /// terminal of this element.
    fn opposite_node(&self, node: NodeId) -> Option<NodeId> {
        if node == self.node0() {
            Some(self.node1())
        } else if node == self.node1() {
            Some(self.node0())
        } else {
            None
        }
    }
}
