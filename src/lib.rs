//! # Breadboard Core
//!
//! The circuit analysis engine for an interactive circuit-construction
//! sandbox.
//!
//! This library provides:
//! - Modified Nodal Analysis (MNA) solving of resistor/battery/current-source
//!   networks, including zero-resistance elements and switches
//! - Trapezoidal companion models carrying capacitors and inductors through
//!   time
//! - Recursive adaptive timestep subdivision that bounds integration error
//!   while keeping each frame's solve real-time
//! - Per-frame aggregation of instantaneous and time-averaged currents and
//!   voltages
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Snapshot representation handed in once per frame
//! - [`elements`] - Linear system element set consumed by the solver
//! - [`solver`] - MNA assembly, companion substitution, subdivision control
//! - [`engine`] - The per-frame [`CircuitEngine::solve`] entry point
//!
//! ## Usage
//!
//! ```
//! use breadboard_core::{CircuitEngine, ElementId, ElementSnapshot, NodeId};
//!
//! let ground = NodeId(0);
//! let elements = [
//!     ElementSnapshot::battery(ElementId(0), ground, NodeId(1), 9.0),
//!     ElementSnapshot::resistor(ElementId(1), NodeId(1), ground, 3.0),
//! ];
//!
//! let engine = CircuitEngine::new();
//! let frame = engine.solve(&elements, ground, 1.0 / 60.0).unwrap();
//! assert!((frame.element(ElementId(1)).unwrap().current - 3.0).abs() < 1e-9);
//! ```
//!
//! ## Simulation Method
//!
//! Each frame, the engine rebuilds the circuit from the snapshot (topology
//! may have changed since the last frame) and:
//!
//! 1. Substitutes each capacitor/inductor with a trapezoidal companion
//!    network derived from its carried state and the candidate timestep
//! 2. Assembles the MNA system Ax = z and solves it by LU decomposition
//! 3. Compares a coarse full-step solve against two half-step solves on the
//!    reactive-element currents, bisecting the timestep where they diverge
//! 4. Reduces the accepted sub-steps to instantaneous and duration-weighted
//!    average quantities per element
//!
//! The caller owns all carried state: reactive element voltages/currents
//! come back in the [`FrameResult`] and are fed into the next snapshot.

pub mod circuit;
pub mod elements;
pub mod engine;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{ElementId, ElementKind, ElementSnapshot, NodeId, ReactiveState};
pub use engine::{CircuitEngine, ElementResult, FrameResult, SolveConfig};
pub use error::{Result, SolverError};
pub use solver::{DenseLu, DenseMatrix, LinearSolver};
