//! Scripted executor for tests and simulated runs.

use crate::executors::base::{RunContext, StageError, StageEvent, StageExecutor, StageStream};
use async_trait::async_trait;
use rk_protocol::Stage;
use std::time::Duration;

/// An executor that replays a fixed script, or a default one derived from
/// the stage and goal when no script is given.
///
/// The optional delay is spent before the first event and is cut short when
/// the run is cancelled.
#[derive(Clone)]
pub struct MockExecutor {
    available: bool,
    events: Option<Vec<Result<StageEvent, StageError>>>,
    delay: Duration,
}

impl MockExecutor {
    pub fn new(available: bool, events: Vec<Result<StageEvent, StageError>>) -> Self {
        Self {
            available,
            events: Some(events),
            delay: Duration::ZERO,
        }
    }

    /// Logs one line mentioning the stage and goal, outputs the stage id,
    /// and completes.
    pub fn success() -> Self {
        Self {
            available: true,
            events: None,
            delay: Duration::ZERO,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            events: Some(vec![]),
            delay: Duration::ZERO,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(
            true,
            vec![
                Ok(StageEvent::Log("Starting...".to_string())),
                Err(StageError::Execution(message.into())),
            ],
        )
    }

    /// Wait this long before producing events.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn script_for(&self, stage: &Stage, context: &RunContext) -> Vec<Result<StageEvent, StageError>> {
        match &self.events {
            Some(events) => events.clone(),
            None => vec![
                Ok(StageEvent::Log(format!(
                    "[{}] simulating work for '{}'",
                    stage.kind, context.goal.description
                ))),
                Ok(StageEvent::Output(serde_json::json!({ "stage": stage.id }))),
                Ok(StageEvent::Completed),
            ],
        }
    }
}

#[async_trait]
impl StageExecutor for MockExecutor {
    async fn check_availability(&self) -> bool {
        self.available
    }

    async fn execute(&self, stage: &Stage, context: &RunContext) -> Result<StageStream, StageError> {
        if !self.available {
            return Err(StageError::NotAvailable(
                "Mock executor not available".to_string(),
            ));
        }

        let events = self.script_for(stage, context);
        let delay = self.delay;
        let cancel = context.cancel.clone();

        let stream = async_stream::stream! {
            if !delay.is_zero() {
                let cancelled = tokio::select! {
                    _ = tokio::time::sleep(delay) => false,
                    _ = cancel.cancelled() => true,
                };
                if cancelled {
                    yield Err(StageError::Cancelled);
                    return;
                }
            }
            for event in events {
                yield event;
            }
        };

        Ok(Box::pin(stream))
    }
}
