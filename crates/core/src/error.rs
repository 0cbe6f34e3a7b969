//! Errors returned synchronously by the engine's public operations.
//!
//! Stage failures are not in here: they are recorded on the run and never
//! returned to the caller of [`crate::Engine::create_run`].

use rk_protocol::GoalKind;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The goal was rejected before any run was created.
    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    /// No run with this id is held by the engine.
    #[error("Run not found: {0}")]
    RunNotFound(Uuid),

    /// The template catalog has no entry for the goal's kind.
    #[error("No stage template registered for goal kind '{0}'")]
    TemplateMissing(GoalKind),
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
