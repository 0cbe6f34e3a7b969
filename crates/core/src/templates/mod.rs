//! Stage templates per goal kind.
//!
//! A template fixes the ordered list of stages a run gets at creation. The
//! built-in catalog covers both goal kinds; `.runkit/templates/*.yaml`
//! files replace individual entries.

use rk_protocol::{GoalKind, RunTemplate, StageKind, StageTemplate};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Template for '{goal}' has a stage with an empty id")]
    EmptyStageId { goal: GoalKind },

    #[error("Template for '{goal}' has duplicate stage id '{stage_id}'")]
    DuplicateStageId { goal: GoalKind, stage_id: String },

    #[error("Template for '{goal}' sets a zero timeout on stage '{stage_id}'")]
    ZeroTimeout { goal: GoalKind, stage_id: String },
}

/// Check that stage ids are non-empty and unique within the template, and
/// that timeout overrides are positive.
pub fn validate_template(template: &RunTemplate) -> Result<(), TemplateError> {
    let mut seen = HashSet::new();
    for stage in &template.stages {
        if stage.id.trim().is_empty() {
            return Err(TemplateError::EmptyStageId {
                goal: template.goal,
            });
        }
        if !seen.insert(stage.id.as_str()) {
            return Err(TemplateError::DuplicateStageId {
                goal: template.goal,
                stage_id: stage.id.clone(),
            });
        }
        if stage.timeout_secs == Some(0) {
            return Err(TemplateError::ZeroTimeout {
                goal: template.goal,
                stage_id: stage.id.clone(),
            });
        }
    }
    Ok(())
}

/// Maps each goal kind to the template its runs are created from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateCatalog {
    templates: HashMap<GoalKind, RunTemplate>,
}

impl TemplateCatalog {
    /// An empty catalog. Every `create_run` fails until templates are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default stage lists:
    /// - deployment: checkout, install, build, deploy
    /// - code generation: plan, generate, validate, finalize
    pub fn builtin() -> Self {
        let deployment = RunTemplate::new(
            GoalKind::Deployment,
            vec![
                StageTemplate::new("checkout", StageKind::Checkout).with_name("Checkout sources"),
                StageTemplate::new("install", StageKind::Install).with_name("Install dependencies"),
                StageTemplate::new("build", StageKind::Build).with_name("Build"),
                StageTemplate::new("deploy", StageKind::Deploy).with_name("Deploy"),
            ],
        );
        let code_generation = RunTemplate::new(
            GoalKind::CodeGeneration,
            vec![
                StageTemplate::new("plan", StageKind::Plan).with_name("Plan changes"),
                StageTemplate::new("generate", StageKind::Generate).with_name("Generate code"),
                StageTemplate::new("validate", StageKind::Validate).with_name("Validate output"),
                StageTemplate::new("finalize", StageKind::Finalize).with_name("Finalize"),
            ],
        );

        let mut templates = HashMap::new();
        templates.insert(GoalKind::Deployment, deployment);
        templates.insert(GoalKind::CodeGeneration, code_generation);
        Self { templates }
    }

    /// Add or replace the template for its goal kind.
    pub fn insert(&mut self, template: RunTemplate) -> Result<(), TemplateError> {
        validate_template(&template)?;
        self.templates.insert(template.goal, template);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, template: RunTemplate) -> Result<Self, TemplateError> {
        self.insert(template)?;
        Ok(self)
    }

    pub fn get(&self, goal: GoalKind) -> Option<&RunTemplate> {
        self.templates.get(&goal)
    }

    /// All templates, in `GoalKind::ALL` order.
    pub fn templates(&self) -> Vec<&RunTemplate> {
        GoalKind::ALL
            .iter()
            .filter_map(|goal| self.templates.get(goal))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
