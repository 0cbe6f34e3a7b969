//! The per-run execution loop.
//!
//! One task per run walks the stages strictly in order. The run's lock is
//! only held for individual transitions, never across an executor await.

use crate::engine::EngineInner;
use crate::events::EventBus;
use crate::executors::{ExecutorRegistry, RunContext, StageError, StageEvent};
use crate::state::run::{
    append_stage_log, complete_stage, fail_stage, finish_run, set_stage_output, start_run,
    start_stage,
};
use crate::state::RunHandle;
use rk_protocol::{RunStatus, Stage, StageStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

enum StageOutcome {
    Succeeded(Option<serde_json::Value>),
    Failed(StageError),
    Cancelled,
}

/// Drive a run from `Pending` to a terminal status.
///
/// Always marks the handle done on exit, including when the run was
/// cancelled before the loop got to start it.
pub(crate) async fn execute_run(inner: Arc<EngineInner>, handle: RunHandle) {
    run_stages(&inner, &handle).await;
    handle.mark_done();
}

async fn run_stages(inner: &EngineInner, handle: &RunHandle) {
    let bus = &inner.bus;

    let stage_count = {
        let mut run = handle.run.write().await;
        if run.status != RunStatus::Pending || handle.cancel.is_cancelled() {
            tracing::debug!(status = ?run.status, "Run no longer pending, not starting");
            return;
        }
        if let Err(e) = start_run(&mut run, bus) {
            tracing::warn!(error = %e, "Failed to start run");
            return;
        }
        tracing::info!(stages = run.stages.len(), "Run started");
        run.stages.len()
    };

    let mut outputs: HashMap<String, serde_json::Value> = HashMap::new();

    for index in 0..stage_count {
        if handle.cancel.is_cancelled() {
            break;
        }

        let (stage, context) = {
            let mut run = handle.run.write().await;
            if run.status != RunStatus::Running {
                break;
            }
            if let Err(e) = start_stage(&mut run, index, bus) {
                tracing::warn!(error = %e, "Failed to start stage");
                break;
            }
            let context = RunContext::new(run.id, run.goal.clone(), run.triggered_by.clone())
                .with_outputs(outputs.clone())
                .with_cancel(handle.cancel.child_token());
            (run.stages[index].clone(), context)
        };

        let timeout = stage
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(inner.config.stage_timeout);
        tracing::debug!(stage_id = %stage.id, kind = %stage.kind, ?timeout, "Stage started");

        let outcome = tokio::select! {
            biased;
            _ = handle.cancel.cancelled() => StageOutcome::Cancelled,
            result = tokio::time::timeout(
                timeout,
                drive_stage(&inner.registry, handle, index, &stage, &context, bus),
            ) => match result {
                Ok(Ok(output)) => StageOutcome::Succeeded(output),
                Ok(Err(e)) => StageOutcome::Failed(e),
                Err(_) => StageOutcome::Failed(StageError::Timeout(timeout)),
            },
        };

        let mut run = handle.run.write().await;
        if run.stages[index].status != StageStatus::Running {
            tracing::debug!(stage_id = %stage.id, "Stage settled by cancellation");
            break;
        }

        match outcome {
            StageOutcome::Succeeded(output) => {
                if let Some(value) = output {
                    if set_stage_output(&mut run, index, value.clone()).is_ok() {
                        outputs.insert(stage.id.clone(), value);
                    }
                }
                if let Err(e) = complete_stage(&mut run, index, bus) {
                    tracing::warn!(stage_id = %stage.id, error = %e, "Failed to complete stage");
                    break;
                }
                tracing::debug!(stage_id = %stage.id, "Stage completed");
            }
            StageOutcome::Failed(e) => {
                tracing::warn!(stage_id = %stage.id, error = %e, "Stage failed");
                if let Err(e) = fail_stage(&mut run, index, e.to_string(), bus) {
                    tracing::warn!(stage_id = %stage.id, error = %e, "Failed to record stage failure");
                }
                break;
            }
            StageOutcome::Cancelled => break,
        }
    }

    let mut run = handle.run.write().await;
    match finish_run(&mut run, bus) {
        Ok(RunStatus::Completed) => tracing::info!("Run completed"),
        Ok(RunStatus::Cancelled) => tracing::info!("Run cancelled"),
        Ok(status) => tracing::warn!(?status, error = ?run.error, "Run did not complete"),
        Err(e) => tracing::warn!(error = %e, "Failed to finish run"),
    }
}

/// Execute one stage and forward its log lines into the run.
///
/// Returns the last output the executor produced.
async fn drive_stage(
    registry: &ExecutorRegistry,
    handle: &RunHandle,
    index: usize,
    stage: &Stage,
    context: &RunContext,
    bus: &EventBus,
) -> Result<Option<serde_json::Value>, StageError> {
    let mut stream = registry.execute(stage, context).await?;
    let mut output = None;

    while let Some(event) = stream.next().await {
        match event? {
            StageEvent::Log(line) => {
                let mut run = handle.run.write().await;
                // the stage was settled elsewhere; stop feeding it
                if append_stage_log(&mut run, index, line, bus).is_err() {
                    return Err(StageError::Cancelled);
                }
            }
            StageEvent::Output(value) => output = Some(value),
            StageEvent::Completed => break,
        }
    }

    Ok(output)
}
