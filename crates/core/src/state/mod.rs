//! Run state management.
//!
//! This module provides:
//! - The run state machine: validated transitions that publish events
//! - The in-memory run registry used by the engine

pub mod registry;
pub mod run;

pub use registry::{RunHandle, RunRegistry};
pub use run::{RunStateMachine, TransitionError};
