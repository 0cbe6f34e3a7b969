//! Global configuration models for `.runkit/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use ts_rs::TS;

use crate::stage_models::StageKind;

pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_EVENT_CAPACITY: usize = 1000;

/// A shell command bound to a stage kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct ShellCommand {
    /// Command line, run through `sh -c`.
    pub command: String,

    /// Working directory, relative to the project root. Defaults to the root.
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Represents global settings from `.runkit/config.toml`.
///
/// # Example
///
/// ```toml
/// stage_timeout_secs = 120
/// max_retained_runs = 200
///
/// [executors.build]
/// command = "cargo build --release"
///
/// [executors.test]
/// command = "cargo test"
/// cwd = "crates/core"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct GlobalConfig {
    /// Upper bound on a single stage's execution time.
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Evict the oldest finished runs once more than this many are held.
    /// Unbounded when absent.
    #[serde(default)]
    pub max_retained_runs: Option<usize>,

    /// Buffer size of the event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Shell commands that back individual stage kinds.
    #[serde(default)]
    pub executors: HashMap<StageKind, ShellCommand>,
}

fn default_stage_timeout_secs() -> u64 {
    DEFAULT_STAGE_TIMEOUT_SECS
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
            max_retained_runs: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            executors: HashMap::new(),
        }
    }
}
