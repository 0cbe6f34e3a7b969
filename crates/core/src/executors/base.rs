//! Base StageExecutor trait and supporting types.

use async_trait::async_trait;
use rk_protocol::{Goal, Stage, StageKind};
use std::collections::HashMap;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context handed to every executor of a run.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The run being executed.
    pub run_id: Uuid,

    /// The goal the run was created for.
    pub goal: Goal,

    /// Actor that requested the run.
    pub triggered_by: String,

    /// Outputs of the stages that already completed, keyed by stage id.
    pub outputs: HashMap<String, serde_json::Value>,

    /// Tripped when the run is cancelled. Executors that hold external
    /// resources should watch it to stop early.
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Create a context with no prior outputs and a fresh cancellation token.
    pub fn new(run_id: Uuid, goal: Goal, triggered_by: impl Into<String>) -> Self {
        Self {
            run_id,
            goal,
            triggered_by: triggered_by.into(),
            outputs: HashMap::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Set the outputs of earlier stages.
    pub fn with_outputs(mut self, outputs: HashMap<String, serde_json::Value>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Use the given cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Output of an earlier stage.
    pub fn output(&self, stage_id: &str) -> Option<&serde_json::Value> {
        self.outputs.get(stage_id)
    }
}

/// What an executor reports while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum StageEvent {
    /// A line for the stage log.
    Log(String),
    /// The stage's result value. The last one wins.
    Output(serde_json::Value),
    /// The work finished successfully. Anything after it is ignored.
    Completed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("No executor registered for stage kind '{0}'")]
    NotRegistered(StageKind),
    #[error("Executor not available: {0}")]
    NotAvailable(String),
    #[error("Execution failed: {0}")]
    Execution(String),
    #[error("Stage timed out after {0:?}")]
    Timeout(Duration),
    #[error("Cancelled by request")]
    Cancelled,
}

pub type StageStream = Pin<Box<dyn Stream<Item = Result<StageEvent, StageError>> + Send>>;

/// Performs the actual work of a stage.
///
/// The returned stream succeeds when it yields `Completed` or simply ends,
/// and fails on the first `Err`. Executors never change stage status; the
/// engine owns every transition.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Whether the executor can currently take work. The registry falls
    /// back to another executor when this returns false.
    async fn check_availability(&self) -> bool {
        true
    }

    async fn execute(&self, stage: &Stage, context: &RunContext) -> Result<StageStream, StageError>;
}
