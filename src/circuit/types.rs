//! Core identifier types for circuit snapshots.

use std::fmt;

/// A unique label for an electrically connected point.
///
/// Node ids are opaque: the engine assigns matrix indices internally, and the
/// reference (0 V) node is whichever id the caller designates for a solve.
/// Synthetic nodes created during companion substitution are allocated above
/// the snapshot's largest id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// A stable identifier for a circuit element.
///
/// Ids persist for the whole lifetime of an element, so per-element results
/// can be looked up by id even after a re-solve regenerates node indexing or
/// companion elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}
