//! Runtime run state models.
//!
//! A [`Run`] is one end-to-end execution of a goal. Its stage list is fixed
//! at creation; only the individual stages mutate as the engine works
//! through them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::goal_models::Goal;
use crate::stage_models::{Stage, StageStatus};

/// Lifecycle status of a run.
///
/// Normal progression: `Pending -> Running -> Completed`.
///
/// Terminal alternatives:
/// - `Failed`: a stage failed and the loop stopped
/// - `Cancelled`: aborted externally before natural completion
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Completed, failed or cancelled.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The state of a single run, as seen by pollers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Run {
    /// Unique identifier, generated at creation.
    #[ts(type = "string")]
    pub id: Uuid,

    /// What the user asked for.
    pub goal: Goal,

    /// Ordered stages. Length never changes after creation.
    pub stages: Vec<Stage>,

    /// Current lifecycle status.
    pub status: RunStatus,

    /// Percentage of stages that reached a terminal status, 0.0 to 100.0.
    pub progress: f64,

    /// Index of the stage currently running, if any.
    pub current_stage: Option<usize>,

    /// Identifier of the actor that requested the run.
    pub triggered_by: String,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// The failing stage's message, or the cancellation note.
    pub error: Option<String>,
}

impl Run {
    /// Create a pending run over the given stages.
    pub fn new(goal: Goal, triggered_by: impl Into<String>, stages: Vec<Stage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            goal,
            stages,
            status: RunStatus::Pending,
            progress: 0.0,
            current_stage: None,
            triggered_by: triggered_by.into(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Number of stages that reached `Completed` or `Failed`.
    pub fn finished_stage_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|stage| stage.status.is_terminal())
            .count()
    }

    /// Derived progress percentage.
    ///
    /// An empty run reports 100 once terminal and 0 before that.
    pub fn computed_progress(&self) -> f64 {
        if self.stages.is_empty() {
            return if self.status.is_terminal() { 100.0 } else { 0.0 };
        }
        self.finished_stage_count() as f64 / self.stages.len() as f64 * 100.0
    }

    /// Recompute the serialized `progress` field.
    pub fn refresh_progress(&mut self) {
        self.progress = self.computed_progress();
    }

    /// True when every stage is `Completed`. Vacuously true for no stages.
    pub fn all_stages_completed(&self) -> bool {
        self.stages
            .iter()
            .all(|stage| stage.status == StageStatus::Completed)
    }

    /// Look up a stage by id.
    pub fn stage(&self, id: &str) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.id == id)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
