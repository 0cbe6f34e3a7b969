//! Goal models describing what a user asked for.
//!
//! A goal is the opaque intent behind a run. Its [`GoalKind`] decides which
//! stage template the engine materializes; the description is carried
//! through to every stage executor untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Words that mark a free-text request as a deployment-style goal.
/// Matched against whole words only.
const DEPLOYMENT_KEYWORDS: &[&str] = &[
    "deploy",
    "deploys",
    "deploying",
    "deployment",
    "release",
    "releases",
    "ship",
    "build",
    "pipeline",
    "rollout",
    "staging",
    "production",
];

/// The family of work a goal belongs to.
///
/// Each kind maps to exactly one stage template in the template catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Build-and-ship work: checkout, install, build, deploy.
    Deployment,

    /// Chat-driven code generation: plan, generate, validate, finalize.
    CodeGeneration,
}

impl GoalKind {
    /// All known goal kinds, in display order.
    pub const ALL: [GoalKind; 2] = [GoalKind::Deployment, GoalKind::CodeGeneration];

    /// Stable snake_case name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::CodeGeneration => "code_generation",
        }
    }

    /// Parse a goal kind from its serialized name.
    ///
    /// Hyphens are accepted in place of underscores so CLI users can type
    /// `code-generation`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "deployment" => Some(Self::Deployment),
            "code_generation" => Some(Self::CodeGeneration),
            _ => None,
        }
    }
}

impl fmt::Display for GoalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's request, as handed to the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct Goal {
    /// Which stage template this goal resolves to.
    pub kind: GoalKind,

    /// Free-text description of the request.
    pub description: String,
}

impl Goal {
    /// Create a goal with an explicit kind.
    pub fn new(kind: GoalKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    /// Classify a free-text request.
    ///
    /// Requests mentioning a deployment keyword become
    /// [`GoalKind::Deployment`]; anything else is treated as code generation.
    ///
    /// # Examples
    ///
    /// ```
    /// use rk_protocol::goal_models::{Goal, GoalKind};
    ///
    /// assert_eq!(Goal::infer("deploy to staging").kind, GoalKind::Deployment);
    /// assert_eq!(Goal::infer("add a login form").kind, GoalKind::CodeGeneration);
    /// ```
    pub fn infer(description: impl Into<String>) -> Self {
        let description = description.into();
        let lower = description.to_lowercase();
        let kind = if lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| DEPLOYMENT_KEYWORDS.contains(&word))
        {
            GoalKind::Deployment
        } else {
            GoalKind::CodeGeneration
        };
        Self { kind, description }
    }

    /// True when the description holds nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.description.trim().is_empty()
    }
}
