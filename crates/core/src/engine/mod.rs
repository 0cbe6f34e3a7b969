//! Run execution engine.
//!
//! The `Engine` owns the run registry. It creates runs from goals, executes
//! each run's stages in order on its own task, and answers queries and
//! cancellation requests while runs are in flight.

mod runner;

use crate::error::{EngineError, EngineResult};
use crate::events::EventBus;
use crate::executors::ExecutorRegistry;
use crate::state::{self, RunHandle, RunRegistry};
use crate::templates::TemplateCatalog;
use rk_protocol::{Event, GlobalConfig, Goal, Run, DEFAULT_EVENT_CAPACITY, DEFAULT_STAGE_TIMEOUT_SECS};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

/// Log line and run error recorded when a run is cancelled.
pub const CANCEL_NOTE: &str = "cancelled by request";

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Upper bound for a stage without its own `timeout_secs`.
    pub stage_timeout: Duration,

    /// Keep at most this many runs, evicting the oldest terminal ones.
    pub max_retained_runs: Option<usize>,

    /// Buffer size of the event bus.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
            max_retained_runs: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl From<&GlobalConfig> for EngineConfig {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
            max_retained_runs: config.max_retained_runs,
            event_capacity: config.event_capacity,
        }
    }
}

pub(crate) struct EngineInner {
    pub(crate) registry: ExecutorRegistry,
    pub(crate) templates: TemplateCatalog,
    pub(crate) config: EngineConfig,
    pub(crate) runs: RunRegistry,
    pub(crate) bus: EventBus,
}

/// Creates, executes, queries and cancels runs.
///
/// Cheap to clone; clones share the same registry and event bus. Must be
/// used from within a tokio runtime because every run is executed on a
/// spawned task.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(registry: ExecutorRegistry, templates: TemplateCatalog, config: EngineConfig) -> Self {
        let bus = EventBus::with_capacity(config.event_capacity);
        let runs = RunRegistry::new(config.max_retained_runs);
        Self {
            inner: Arc::new(EngineInner {
                registry,
                templates,
                config,
                runs,
                bus,
            }),
        }
    }

    /// Create a run for `goal` and start executing it in the background.
    ///
    /// Returns as soon as the run is registered. Stage failures never
    /// surface here; they are recorded on the run.
    ///
    /// # Errors
    ///
    /// - `InvalidGoal` if the description is empty or whitespace
    /// - `TemplateMissing` if the catalog has no template for the goal kind
    ///
    /// In both cases no run is created.
    pub async fn create_run(&self, goal: Goal, triggered_by: &str) -> EngineResult<Uuid> {
        if goal.is_blank() {
            return Err(EngineError::InvalidGoal(
                "goal description must not be empty".to_string(),
            ));
        }
        let template = self
            .inner
            .templates
            .get(goal.kind)
            .ok_or(EngineError::TemplateMissing(goal.kind))?;

        let run = state::run::create_run(goal, triggered_by, template);
        let run_id = run.id;
        let created = Event::RunCreated {
            run_id,
            goal: run.goal.description.clone(),
            triggered_by: run.triggered_by.clone(),
            stage_count: run.stages.len(),
        };
        tracing::info!(
            run_id = %run_id,
            goal_kind = %run.goal.kind,
            stages = run.stages.len(),
            triggered_by = %run.triggered_by,
            "Run created"
        );

        let handle = RunHandle::new(run);
        for evicted in self.inner.runs.insert(handle.clone()).await {
            tracing::debug!(run_id = %evicted, "Evicted terminal run");
        }
        // subscribers may look the run up as soon as they see this
        self.inner.bus.publish(created);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(
            runner::execute_run(inner, handle)
                .instrument(tracing::info_span!("run", run_id = %run_id)),
        );

        Ok(run_id)
    }

    /// Classify free text with [`Goal::infer`] and create a run for it.
    pub async fn create_run_from_text(
        &self,
        description: &str,
        triggered_by: &str,
    ) -> EngineResult<Uuid> {
        self.create_run(Goal::infer(description), triggered_by).await
    }

    /// A consistent snapshot of the run, or `None` for an unknown id.
    pub async fn get_run(&self, id: Uuid) -> Option<Run> {
        let handle = self.inner.runs.get(id).await?;
        Some(handle.snapshot().await)
    }

    /// Snapshots of every retained run, newest first.
    pub async fn list_runs(&self) -> Vec<Run> {
        self.inner.runs.list().await
    }

    /// Request cancellation and return the resulting snapshot.
    ///
    /// A pending run is cancelled with all stages left pending. For a
    /// running run the in-flight stage is failed, later stages stay pending
    /// and the executor is told to stop through its cancellation token.
    /// Terminal runs are returned unchanged.
    pub async fn cancel_run(&self, id: Uuid) -> EngineResult<Run> {
        let handle = self
            .inner
            .runs
            .get(id)
            .await
            .ok_or(EngineError::RunNotFound(id))?;

        let (changed, snapshot) = {
            let mut run = handle.run.write().await;
            let changed = match state::run::cancel_run(&mut run, CANCEL_NOTE, &self.inner.bus) {
                Ok(changed) => changed,
                Err(e) => {
                    tracing::warn!(run_id = %id, error = %e, "Failed to cancel run");
                    false
                }
            };
            (changed, run.clone())
        };

        if changed {
            handle.cancel.cancel();
            tracing::info!(run_id = %id, "Run cancelled");
        } else {
            tracing::debug!(run_id = %id, status = ?snapshot.status, "Cancel ignored, run already terminal");
        }
        Ok(snapshot)
    }

    /// Wait until the run's execution loop has exited and return its final
    /// snapshot.
    pub async fn wait_for(&self, id: Uuid) -> EngineResult<Run> {
        let handle = self
            .inner
            .runs
            .get(id)
            .await
            .ok_or(EngineError::RunNotFound(id))?;
        handle.wait_done().await;
        Ok(handle.snapshot().await)
    }

    /// Receive progress events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    pub async fn run_count(&self) -> usize {
        self.inner.runs.len().await
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.inner.templates
    }

    pub fn executors(&self) -> &ExecutorRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.inner.config)
            .field("executors", &self.inner.registry)
            .field("templates", &self.inner.templates.len())
            .finish()
    }
}
