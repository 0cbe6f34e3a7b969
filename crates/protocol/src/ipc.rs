//! Progress events emitted by the engine.
//!
//! Polling `get_run` is the baseline way to follow a run. Consumers that
//! want push updates (a websocket broadcaster, a terminal renderer)
//! subscribe to these events instead.
//!
//! Uses tagged enum serialization for TypeScript compatibility:
//! ```json
//! {
//!   "type": "stageStatusUpdate",
//!   "payload": {
//!     "run_id": "uuid-here",
//!     "stage_id": "build",
//!     "stage_index": 0,
//!     "status": "running"
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::run_models::RunStatus;
use crate::stage_models::StageStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A run was registered and is about to start.
    RunCreated {
        #[ts(type = "string")]
        run_id: Uuid,
        goal: String,
        triggered_by: String,
        stage_count: usize,
    },

    /// A run's status or progress changed.
    RunStatusUpdate {
        #[ts(type = "string")]
        run_id: Uuid,
        status: RunStatus,
        progress: f64,
    },

    /// A stage moved to a new status.
    StageStatusUpdate {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_id: String,
        stage_index: usize,
        status: StageStatus,
    },

    /// A stage produced a new log line.
    StageLogChunk {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_id: String,
        content: String,
    },

    /// Every stage completed.
    RunCompleted {
        #[ts(type = "string")]
        run_id: Uuid,
    },

    /// A stage failed and the run stopped.
    RunFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        stage_id: Option<String>,
        error: String,
    },

    /// The run was cancelled by request.
    RunCancelled {
        #[ts(type = "string")]
        run_id: Uuid,
    },
}

impl Event {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::RunCreated { run_id, .. }
            | Self::RunStatusUpdate { run_id, .. }
            | Self::StageStatusUpdate { run_id, .. }
            | Self::StageLogChunk { run_id, .. }
            | Self::RunCompleted { run_id }
            | Self::RunFailed { run_id, .. }
            | Self::RunCancelled { run_id } => *run_id,
        }
    }

    /// True for the last event a run ever emits.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RunCompleted { .. } | Self::RunFailed { .. } | Self::RunCancelled { .. }
        )
    }
}
