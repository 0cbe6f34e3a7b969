//! Stage executors.
//!
//! This module provides the `StageExecutor` trait (strategy pattern), the
//! `ExecutorRegistry` that maps stage kinds to executors, and the built-in
//! executors.

pub mod adapters;
pub mod base;
pub mod command;
pub mod registry;

pub use adapters::{MockExecutor, ShellExecutor};
pub use base::{RunContext, StageError, StageEvent, StageExecutor, StageStream};
pub use registry::ExecutorRegistry;
