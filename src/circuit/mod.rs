//! Circuit snapshot representation.
//!
//! This module provides the flattened form of a circuit handed to the engine
//! once per frame: opaque node and element identifiers plus per-element
//! electrical parameters and carried-forward reactive state. The editing
//! model that produces snapshots (vertices, drag gestures, topology
//! mutation) lives outside this crate.

mod snapshot;
mod types;

pub use snapshot::{ElementKind, ElementSnapshot, ReactiveState, OPEN_SWITCH_RESISTANCE};
pub use types::{ElementId, NodeId};
