//! Stage models: the unit of work inside a run, and the templates runs are
//! built from.
//!
//! Templates live in `.runkit/templates/*.yaml`; each one lists the stages a
//! goal kind expands into. At run creation the template is copied into a
//! list of [`Stage`] values that never grows or shrinks afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::goal_models::GoalKind;

/// The typed kind of work a stage performs.
///
/// The executor registry dispatches on this value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Checkout,
    Install,
    Build,
    Test,
    Deploy,
    Notify,
    Plan,
    Generate,
    Validate,
    Finalize,
}

impl StageKind {
    /// Stable snake_case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkout => "checkout",
            Self::Install => "install",
            Self::Build => "build",
            Self::Test => "test",
            Self::Deploy => "deploy",
            Self::Notify => "notify",
            Self::Plan => "plan",
            Self::Generate => "generate",
            Self::Validate => "validate",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a single stage.
///
/// Moves strictly forward: `Pending -> Running -> {Completed | Failed}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Not started yet.
    Pending,

    /// Its executor is currently working.
    Running,

    /// Finished successfully.
    Completed,

    /// Finished with an error, a timeout, or a cancellation.
    Failed,
}

impl StageStatus {
    /// Completed or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One entry of a run template.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StageTemplate {
    /// Identifier, unique within its template.
    pub id: String,

    /// Human-readable label. Defaults to the id when omitted.
    #[serde(default)]
    pub name: String,

    /// Which executor handles this stage.
    pub kind: StageKind,

    /// Per-stage timeout override in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl StageTemplate {
    pub fn new(id: impl Into<String>, kind: StageKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            timeout_secs: None,
        }
    }

    /// Set a human-readable name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a timeout override.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// The label to display: the name, or the id if no name was given.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// The fixed, ordered stage list a goal kind expands into.
///
/// # Example
///
/// ```yaml
/// goal: deployment
/// stages:
///   - id: build
///     kind: build
///   - id: deploy
///     name: Deploy to target
///     kind: deploy
///     timeout_secs: 600
///   - id: notify
///     kind: notify
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct RunTemplate {
    /// Goal kind this template serves.
    pub goal: GoalKind,

    /// Stages in execution order.
    #[serde(default)]
    pub stages: Vec<StageTemplate>,
}

impl RunTemplate {
    pub fn new(goal: GoalKind, stages: Vec<StageTemplate>) -> Self {
        Self { goal, stages }
    }
}

/// Runtime state of one stage inside a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct Stage {
    /// Stable identifier, unique within the run.
    pub id: String,

    /// Human-readable label.
    pub name: String,

    /// Which executor handles this stage.
    pub kind: StageKind,

    /// Current lifecycle status.
    pub status: StageStatus,

    /// Append-only log lines produced by the executor and the engine.
    pub log: Vec<String>,

    /// Set when the stage enters `Running`.
    pub started_at: Option<DateTime<Utc>>,

    /// Set exactly when the stage reaches `Completed` or `Failed`.
    pub finished_at: Option<DateTime<Utc>>,

    /// Wall time between start and finish, set on completion or failure.
    pub duration_ms: Option<u64>,

    /// Value produced by the executor, visible to later stages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    /// Timeout override copied from the template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Stage {
    /// Materialize a pending stage from its template entry.
    pub fn from_template(template: &StageTemplate) -> Self {
        Self {
            id: template.id.clone(),
            name: template.display_name().to_string(),
            kind: template.kind,
            status: StageStatus::Pending,
            log: Vec::new(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            output: None,
            timeout_secs: template.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_from_template() {
        let template = StageTemplate::new("build", StageKind::Build).with_timeout_secs(30);
        let stage = Stage::from_template(&template);

        assert_eq!(stage.id, "build");
        assert_eq!(stage.name, "build");
        assert_eq!(stage.kind, StageKind::Build);
        assert_eq!(stage.status, StageStatus::Pending);
        assert!(stage.log.is_empty());
        assert!(stage.started_at.is_none());
        assert!(stage.finished_at.is_none());
        assert_eq!(stage.timeout_secs, Some(30));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut template = StageTemplate::new("deploy", StageKind::Deploy);
        template.name = String::new();
        assert_eq!(template.display_name(), "deploy");

        let named = template.with_name("Deploy to staging");
        assert_eq!(named.display_name(), "Deploy to staging");
    }

    #[test]
    fn test_stage_status_terminal() {
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
        assert!(StageStatus::Completed.is_terminal());
        assert!(StageStatus::Failed.is_terminal());
    }
}
