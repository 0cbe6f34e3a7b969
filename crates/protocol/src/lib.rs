//! # rk-protocol
//!
//! Shared data model for runkit.
//!
//! This crate defines the structures exchanged between the engine and its
//! consumers:
//! - Goals and the stage templates they expand into
//! - Runtime run and stage state, as returned to pollers
//! - Progress events for push-style subscribers
//! - Global configuration from `config.toml`
//!
//! ## Modules
//!
//! - [`goal_models`]: Goal and goal kind
//! - [`stage_models`]: Stage kinds, statuses, templates and runtime stages
//! - [`run_models`]: Run state and status
//! - [`config_models`]: Global configuration
//! - [`ipc`]: Progress events
//!
//! No engine logic lives here; every type derives `TS` so a web client can
//! share the same shapes.

pub mod config_models;
pub mod goal_models;
pub mod ipc;
pub mod run_models;
pub mod stage_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use goal_models::*;
pub use ipc::*;
pub use run_models::*;
pub use stage_models::*;
