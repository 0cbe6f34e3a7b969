//! # rk-core
//!
//! Ordered-stage run engine for runkit.
//!
//! This crate provides:
//! - Configuration loading from the `.runkit/` directory
//! - The stage executor trait, its registry and built-in executors
//! - The run state machine and the in-memory run registry
//! - The engine that creates, executes, queries and cancels runs
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`engine`]: Run creation, sequential execution, query and cancel API
//! - [`error`]: Engine-level error types
//! - [`events`]: Broadcast bus for progress events
//! - [`executors`]: Stage executor trait and implementations
//! - [`init`]: `.runkit/` scaffolding
//! - [`state`]: Run state transitions and registry
//! - [`templates`]: Goal-kind to stage-list catalog

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod executors;
pub mod init;
pub mod state;
pub mod templates;

pub use engine::{Engine, EngineConfig};
pub use error::{EngineError, EngineResult};
