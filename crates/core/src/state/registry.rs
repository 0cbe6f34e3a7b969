//! In-memory registry of runs.
//!
//! Each run lives behind its own `Arc<RwLock<Run>>`, written only by that
//! run's execution loop and by cancellation. Readers take a read lock and
//! clone, so they always see a whole transition or none of it.

use rk_protocol::Run;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Everything the engine keeps per run.
#[derive(Clone)]
pub struct RunHandle {
    pub run: Arc<RwLock<Run>>,

    /// Tripped by `cancel_run`. Executors see a child of this token.
    pub cancel: CancellationToken,

    /// Flips to `true` once the execution loop has exited.
    pub done: Arc<watch::Sender<bool>>,
}

impl RunHandle {
    pub fn new(run: Run) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            run: Arc::new(RwLock::new(run)),
            cancel: CancellationToken::new(),
            done: Arc::new(done),
        }
    }

    /// A consistent copy of the run.
    pub async fn snapshot(&self) -> Run {
        self.run.read().await.clone()
    }

    /// Signal that the execution loop has exited.
    pub fn mark_done(&self) {
        self.done.send_replace(true);
    }

    /// Wait until the execution loop has exited.
    pub async fn wait_done(&self) {
        let mut rx = self.done.subscribe();
        // the sender lives in this handle, so the channel cannot close here
        let _ = rx.wait_for(|done| *done).await;
    }
}

#[derive(Default)]
struct Entries {
    runs: HashMap<Uuid, RunHandle>,
    /// Insertion order, oldest first.
    order: VecDeque<Uuid>,
}

/// Map of run id to [`RunHandle`], with optional retention limit.
#[derive(Clone, Default)]
pub struct RunRegistry {
    entries: Arc<RwLock<Entries>>,
    max_retained: Option<usize>,
}

impl RunRegistry {
    pub fn new(max_retained: Option<usize>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries::default())),
            max_retained,
        }
    }

    /// Register a new run and evict the oldest terminal runs while the
    /// registry is over its retention limit.
    ///
    /// Pending and running runs are never evicted, so the registry can stay
    /// above the limit while many runs are in flight. Returns the evicted ids.
    pub async fn insert(&self, handle: RunHandle) -> Vec<Uuid> {
        let id = handle.run.read().await.id;
        let mut entries = self.entries.write().await;
        entries.runs.insert(id, handle);
        entries.order.push_back(id);

        let mut evicted = Vec::new();
        let Some(max) = self.max_retained else {
            return evicted;
        };

        while entries.runs.len() > max {
            let candidate = entries.order.iter().copied().find(|candidate| {
                *candidate != id
                    && entries
                        .runs
                        .get(candidate)
                        .and_then(|handle| handle.run.try_read().ok())
                        .is_some_and(|run| run.is_terminal())
            });
            let Some(old) = candidate else {
                break;
            };
            entries.runs.remove(&old);
            entries.order.retain(|other| *other != old);
            evicted.push(old);
        }
        evicted
    }

    pub async fn get(&self, id: Uuid) -> Option<RunHandle> {
        self.entries.read().await.runs.get(&id).cloned()
    }

    /// Snapshots of every run, newest first.
    pub async fn list(&self) -> Vec<Run> {
        let handles: Vec<RunHandle> = {
            let entries = self.entries.read().await;
            entries
                .order
                .iter()
                .rev()
                .filter_map(|id| entries.runs.get(id).cloned())
                .collect()
        };

        let mut runs = Vec::with_capacity(handles.len());
        for handle in handles {
            runs.push(handle.snapshot().await);
        }
        runs
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.runs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
