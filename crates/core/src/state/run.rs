//! Run state machine implementation.
//!
//! Every mutation of a [`Run`] goes through one of these functions. Each one
//! validates the transition first, applies it, refreshes the progress value
//! and publishes the matching event. Rejected transitions leave the run
//! untouched.

use crate::events::EventBus;
use chrono::Utc;
use rk_protocol::{Event, Goal, Run, RunStatus, RunTemplate, Stage, StageStatus};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid run transition from {from:?} to {to:?}")]
    Run { from: RunStatus, to: RunStatus },

    #[error("Invalid transition of stage '{stage_id}' from {from:?} to {to:?}")]
    Stage {
        stage_id: String,
        from: StageStatus,
        to: StageStatus,
    },

    #[error("Stage index {0} is out of range")]
    StageIndex(usize),
}

pub struct RunStateMachine;

impl RunStateMachine {
    pub fn validate_run_transition(from: RunStatus, to: RunStatus) -> Result<(), TransitionError> {
        if Self::allowed_run_transitions(from).contains(&to) {
            Ok(())
        } else {
            Err(TransitionError::Run { from, to })
        }
    }

    fn allowed_run_transitions(from: RunStatus) -> Vec<RunStatus> {
        match from {
            RunStatus::Pending => vec![RunStatus::Running, RunStatus::Cancelled],
            RunStatus::Running => vec![
                RunStatus::Completed,
                RunStatus::Failed,
                RunStatus::Cancelled,
            ],
            RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled => vec![],
        }
    }

    pub fn can_transition_stage(from: StageStatus, to: StageStatus) -> bool {
        matches!(
            (from, to),
            (StageStatus::Pending, StageStatus::Running)
                | (StageStatus::Running, StageStatus::Completed)
                | (StageStatus::Running, StageStatus::Failed)
        )
    }

    pub fn can_transition_run(from: RunStatus, to: RunStatus) -> bool {
        Self::validate_run_transition(from, to).is_ok()
    }
}

/// Create a pending run with one pending stage per template entry.
pub fn create_run(goal: Goal, triggered_by: impl Into<String>, template: &RunTemplate) -> Run {
    let stages = template.stages.iter().map(Stage::from_template).collect();
    Run::new(goal, triggered_by, stages)
}

fn set_run_status(run: &mut Run, to: RunStatus, bus: &EventBus) -> Result<(), TransitionError> {
    RunStateMachine::validate_run_transition(run.status, to)?;
    run.status = to;
    if to == RunStatus::Running {
        run.started_at = Some(Utc::now());
    }
    if to.is_terminal() {
        run.completed_at = Some(Utc::now());
        run.current_stage = None;
    }
    run.refresh_progress();
    bus.publish(Event::RunStatusUpdate {
        run_id: run.id,
        status: run.status,
        progress: run.progress,
    });
    Ok(())
}

fn set_stage_status(
    run: &mut Run,
    index: usize,
    to: StageStatus,
    bus: &EventBus,
) -> Result<(), TransitionError> {
    let stage = run
        .stages
        .get_mut(index)
        .ok_or(TransitionError::StageIndex(index))?;
    if !RunStateMachine::can_transition_stage(stage.status, to) {
        return Err(TransitionError::Stage {
            stage_id: stage.id.clone(),
            from: stage.status,
            to,
        });
    }

    let now = Utc::now();
    stage.status = to;
    match to {
        StageStatus::Running => stage.started_at = Some(now),
        _ => {
            stage.finished_at = Some(now);
            if let Some(started) = stage.started_at {
                stage.duration_ms = Some((now - started).num_milliseconds().max(0) as u64);
            }
        }
    }
    let stage_id = stage.id.clone();
    run.refresh_progress();

    bus.publish(Event::StageStatusUpdate {
        run_id: run.id,
        stage_id,
        stage_index: index,
        status: to,
    });
    Ok(())
}

fn push_log(run: &mut Run, index: usize, line: String, bus: &EventBus) {
    if let Some(stage) = run.stages.get_mut(index) {
        stage.log.push(line.clone());
        bus.publish(Event::StageLogChunk {
            run_id: run.id,
            stage_id: stage.id.clone(),
            content: line,
        });
    }
}

/// Transition a pending run to `Running`.
pub fn start_run(run: &mut Run, bus: &EventBus) -> Result<(), TransitionError> {
    set_run_status(run, RunStatus::Running, bus)
}

/// Mark the stage at `index` as running and make it the current stage.
///
/// Only allowed while the run itself is running.
pub fn start_stage(run: &mut Run, index: usize, bus: &EventBus) -> Result<(), TransitionError> {
    if run.status != RunStatus::Running {
        return Err(TransitionError::Run {
            from: run.status,
            to: RunStatus::Running,
        });
    }
    set_stage_status(run, index, StageStatus::Running, bus)?;
    run.current_stage = Some(index);
    let name = run.stages[index].name.clone();
    push_log(run, index, format!("Starting stage '{name}'"), bus);
    Ok(())
}

/// Append a line to a running stage's log.
pub fn append_stage_log(
    run: &mut Run,
    index: usize,
    line: impl Into<String>,
    bus: &EventBus,
) -> Result<(), TransitionError> {
    let stage = run.stages.get(index).ok_or(TransitionError::StageIndex(index))?;
    if stage.status != StageStatus::Running {
        return Err(TransitionError::Stage {
            stage_id: stage.id.clone(),
            from: stage.status,
            to: StageStatus::Running,
        });
    }
    push_log(run, index, line.into(), bus);
    Ok(())
}

/// Record the value a running stage produced.
pub fn set_stage_output(
    run: &mut Run,
    index: usize,
    output: serde_json::Value,
) -> Result<(), TransitionError> {
    let stage = run
        .stages
        .get_mut(index)
        .ok_or(TransitionError::StageIndex(index))?;
    if stage.status != StageStatus::Running {
        return Err(TransitionError::Stage {
            stage_id: stage.id.clone(),
            from: stage.status,
            to: StageStatus::Completed,
        });
    }
    stage.output = Some(output);
    Ok(())
}

/// Mark a running stage as completed.
pub fn complete_stage(run: &mut Run, index: usize, bus: &EventBus) -> Result<(), TransitionError> {
    set_stage_status(run, index, StageStatus::Completed, bus)?;
    let duration = run.stages[index].duration_ms.unwrap_or_default();
    push_log(run, index, format!("Stage completed in {duration}ms"), bus);
    Ok(())
}

/// Mark a running stage as failed, logging `message` and recording it as
/// the run's error.
pub fn fail_stage(
    run: &mut Run,
    index: usize,
    message: impl Into<String>,
    bus: &EventBus,
) -> Result<(), TransitionError> {
    let message = message.into();
    set_stage_status(run, index, StageStatus::Failed, bus)?;
    push_log(run, index, message.clone(), bus);
    run.error = Some(message);
    Ok(())
}

/// Cancel a run that has not reached a terminal status.
///
/// A running stage is failed with `note` as its last log line. Stages that
/// never started stay pending. Returns `false` without changing anything
/// when the run is already terminal.
pub fn cancel_run(run: &mut Run, note: &str, bus: &EventBus) -> Result<bool, TransitionError> {
    if run.is_terminal() {
        return Ok(false);
    }
    RunStateMachine::validate_run_transition(run.status, RunStatus::Cancelled)?;

    if let Some(index) = run
        .stages
        .iter()
        .position(|stage| stage.status == StageStatus::Running)
    {
        set_stage_status(run, index, StageStatus::Failed, bus)?;
        push_log(run, index, note.to_string(), bus);
    }

    run.error = Some(note.to_string());
    set_run_status(run, RunStatus::Cancelled, bus)?;
    bus.publish(Event::RunCancelled { run_id: run.id });
    Ok(true)
}

/// Settle a running run once its loop has stopped.
///
/// `Completed` when every stage completed, `Failed` otherwise. A run that
/// was cancelled meanwhile keeps its status.
pub fn finish_run(run: &mut Run, bus: &EventBus) -> Result<RunStatus, TransitionError> {
    if run.status == RunStatus::Cancelled {
        return Ok(RunStatus::Cancelled);
    }

    if run.all_stages_completed() {
        set_run_status(run, RunStatus::Completed, bus)?;
        bus.publish(Event::RunCompleted { run_id: run.id });
    } else {
        let failed = run
            .stages
            .iter()
            .find(|stage| stage.status == StageStatus::Failed)
            .map(|stage| stage.id.clone());
        let error = run
            .error
            .get_or_insert_with(|| "Run stopped before all stages completed".to_string())
            .clone();
        set_run_status(run, RunStatus::Failed, bus)?;
        bus.publish(Event::RunFailed {
            run_id: run.id,
            stage_id: failed,
            error,
        });
    }
    Ok(run.status)
}
