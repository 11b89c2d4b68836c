//! MNA (Modified Nodal Analysis) solver and transient integration.
//!
//! This module provides the numerical engine for circuit analysis.
//!
//! ## Modified Nodal Analysis
//!
//! MNA combines one voltage unknown per non-reference node with one
//! auxiliary current unknown per element that cannot be written as a
//! conductance (batteries, zero-resistance links). The assembled system
//! Ax = z has the block form
//!
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! with G holding conductance stamps, B and C the ±1 incidence entries
//! tying each auxiliary branch to its two nodes, D zero for ideal sources,
//! v and j the node-voltage and branch-current unknowns, i the net
//! current-source injection per node, and e the enforced source voltages.
//!
//! ## Transient integration
//!
//! Capacitors and inductors are discretized with the trapezoidal rule: each
//! is substituted by a companion network of elements the static solver
//! already understands, valid for one timestep. A recursive subdivision
//! controller compares a coarse full step against two fine half steps and
//! bisects wherever the reactive-element currents diverge beyond tolerance,
//! so stiff transients get finer resolution only where needed.

mod companion;
mod linalg;
mod mna;
mod results;
mod subdivision;
mod transient;

pub use companion::{CapacitorCompanion, InductorCompanion};
pub use linalg::{DenseLu, DenseMatrix, LinearSolver};
pub use mna::{MnaCircuit, Solution};
pub use results::{HistoryStep, StateHistory};
pub use subdivision::TimestepSubdivisions;
pub use transient::{
    DynamicCircuit, DynamicSolution, DynamicState, ReactiveElement, ReactiveKind, StaticElement,
    StaticKind,
};

/// Default accept/subdivide tolerance, in amperes, on the maximum absolute
/// divergence between coarse and fine reactive-element currents.
pub const DEFAULT_SUBDIVISION_TOLERANCE: f64 = 1e-6;

/// Default maximum bisection depth per frame.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Smallest pivot magnitude accepted during LU factorization.
pub const MIN_PIVOT: f64 = 1e-12;
