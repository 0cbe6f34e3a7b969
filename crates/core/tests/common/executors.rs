//! Scripted stage executors for deterministic testing.

use async_trait::async_trait;
use rk_core::executors::{RunContext, StageError, StageEvent, StageExecutor, StageStream};
use rk_protocol::Stage;
use std::sync::{Arc, Mutex};

/// Records the id of every stage it executes, then succeeds.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingExecutor {
    pub executed: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageExecutor for RecordingExecutor {
    async fn execute(&self, stage: &Stage, _context: &RunContext) -> Result<StageStream, StageError> {
        self.executed.lock().unwrap().push(stage.id.clone());
        let id = stage.id.clone();

        let stream = async_stream::stream! {
            yield Ok(StageEvent::Log(format!("recorded {id}")));
            yield Ok(StageEvent::Completed);
        };

        Ok(Box::pin(stream))
    }
}

/// Logs the output an earlier stage produced, or `none`.
#[allow(dead_code)]
pub struct OutputProbeExecutor {
    pub from: String,
}

impl OutputProbeExecutor {
    #[allow(dead_code)]
    pub fn new(from: &str) -> Self {
        Self {
            from: from.to_string(),
        }
    }
}

#[async_trait]
impl StageExecutor for OutputProbeExecutor {
    async fn execute(&self, _stage: &Stage, context: &RunContext) -> Result<StageStream, StageError> {
        let seen = context
            .output(&self.from)
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".to_string());

        let stream = async_stream::stream! {
            yield Ok(StageEvent::Log(format!("saw {seen}")));
            yield Ok(StageEvent::Completed);
        };

        Ok(Box::pin(stream))
    }
}

/// Logs one line and then waits until the run is cancelled.
#[allow(dead_code)]
pub struct BlockingExecutor;

#[async_trait]
impl StageExecutor for BlockingExecutor {
    async fn execute(&self, _stage: &Stage, context: &RunContext) -> Result<StageStream, StageError> {
        let cancel = context.cancel.clone();

        let stream = async_stream::stream! {
            yield Ok(StageEvent::Log("waiting".to_string()));
            cancel.cancelled().await;
            yield Err(StageError::Cancelled);
        };

        Ok(Box::pin(stream))
    }
}
