//! Error types for the circuit analysis engine.
//!
//! This module provides a unified error type [`SolverError`] covering
//! snapshot validation and the numerical solve itself.

use thiserror::Error;

use crate::circuit::{ElementId, NodeId};

/// Result type alias using [`SolverError`].
pub type Result<T> = std::result::Result<T, SolverError>;

/// Unified error type for all engine operations.
#[derive(Error, Debug)]
pub enum SolverError {
    // ============ Snapshot Validation Errors ============
    /// The designated reference node does not appear in the snapshot.
    #[error("reference node {node} is not connected to any element")]
    MissingGround { node: NodeId },

    /// An element parameter is out of range or non-finite.
    #[error("invalid parameter for element {element}: {message}")]
    InvalidParameter { element: ElementId, message: String },

    /// Two snapshot elements share the same id.
    #[error("duplicate element id {element}")]
    DuplicateElement { element: ElementId },

    /// The requested frame timestep is negative or non-finite.
    #[error("invalid timestep {dt:.3e}: must be finite and non-negative")]
    InvalidTimestep { dt: f64 },

    // ============ Solve Errors ============
    /// The nodal matrix cannot be factored.
    ///
    /// Raised for a circuit section with no path to the reference node, or
    /// for a zero-resistance loop of voltage sources with contradictory
    /// voltages. Retrying the same system is pointless; the topology has to
    /// change first.
    #[error("singular matrix - a circuit section has no path to the reference node, or a source loop is contradictory")]
    SingularMatrix,

    /// A solved voltage or current came back NaN or infinite.
    ///
    /// Always a defect; the frame's solve is aborted rather than returning a
    /// corrupted result.
    #[error("non-finite value {value:.3e} solved for {quantity}")]
    NonFiniteSolution { quantity: String, value: f64 },
}

impl SolverError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(element: ElementId, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            element,
            message: message.into(),
        }
    }

    /// Create a non-finite solution error.
    pub fn non_finite(quantity: impl Into<String>, value: f64) -> Self {
        Self::NonFiniteSolution {
            quantity: quantity.into(),
            value,
        }
    }
}
