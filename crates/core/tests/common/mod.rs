//! Common test utilities and helpers for engine integration tests.
//!
//! This module provides shared functionality across the integration tests:
//! - Test fixtures (templates, engines, config directories)
//! - Custom assertions and polling helpers
//! - Scripted executors

pub mod assertions;
pub mod executors;
pub mod fixtures;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use executors::*;
#[allow(unused_imports)]
pub use fixtures::*;
