//! Executor registry for dispatching stages by kind.
//!
//! The `ExecutorRegistry` is responsible for:
//! - Mapping each `StageKind` to the executor that performs it
//! - Providing a fallback for kinds with no dedicated executor
//! - Falling back when a registered executor reports itself unavailable

use crate::executors::adapters::ShellExecutor;
use crate::executors::base::{RunContext, StageError, StageExecutor, StageStream};
use rk_protocol::{ShellCommand, Stage, StageKind};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Supplied to the engine at construction time. Lookups are by typed
/// `StageKind`, never by stage id.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
    executors: HashMap<StageKind, Arc<dyn StageExecutor>>,
    fallback: Option<Arc<dyn StageExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `executor` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: StageKind, executor: Arc<dyn StageExecutor>) {
        self.executors.insert(kind, executor);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, kind: StageKind, executor: impl StageExecutor + 'static) -> Self {
        self.register(kind, Arc::new(executor));
        self
    }

    /// Use `executor` for kinds that have no executor of their own, or whose
    /// executor is unavailable.
    pub fn with_fallback(mut self, executor: impl StageExecutor + 'static) -> Self {
        self.fallback = Some(Arc::new(executor));
        self
    }

    /// Register a `ShellExecutor` for every configured command.
    pub fn with_shell_commands(
        mut self,
        commands: &HashMap<StageKind, ShellCommand>,
        root: &Path,
    ) -> Self {
        for (kind, command) in commands {
            tracing::debug!(kind = %kind, command = %command.command, "Registering shell executor");
            self.register(*kind, Arc::new(ShellExecutor::from_config(command, root)));
        }
        self
    }

    pub fn get(&self, kind: StageKind) -> Option<Arc<dyn StageExecutor>> {
        self.executors.get(&kind).cloned()
    }

    pub fn has(&self, kind: StageKind) -> bool {
        self.executors.contains_key(&kind)
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<StageKind> {
        let mut kinds: Vec<_> = self.executors.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Execute `stage` with the executor for its kind.
    ///
    /// 1. Look up the executor registered for the kind
    /// 2. If it is missing or unavailable, try the fallback
    /// 3. Execute with whichever executor was selected
    pub async fn execute(
        &self,
        stage: &Stage,
        context: &RunContext,
    ) -> Result<StageStream, StageError> {
        match self.get(stage.kind) {
            Some(executor) => {
                if executor.check_availability().await {
                    return executor.execute(stage, context).await;
                }

                if let Some(fallback) = &self.fallback {
                    if fallback.check_availability().await {
                        tracing::warn!(
                            kind = %stage.kind,
                            stage_id = %stage.id,
                            "Executor unavailable, using fallback"
                        );
                        return fallback.execute(stage, context).await;
                    }
                }

                Err(StageError::NotAvailable(format!(
                    "Executor for '{}' is not available and no fallback succeeded",
                    stage.kind
                )))
            }
            None => match &self.fallback {
                Some(fallback) if fallback.check_availability().await => {
                    fallback.execute(stage, context).await
                }
                Some(_) => Err(StageError::NotAvailable(format!(
                    "Fallback executor for '{}' is not available",
                    stage.kind
                ))),
                None => Err(StageError::NotRegistered(stage.kind)),
            },
        }
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry")
            .field("kinds", &self.kinds())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
