//! # Step Model
//!
//! The smallest unit of externally executed work. A step is identified by
//! `(task_id, name)`, advances `PendingStart -> Started -> {Finished, Failed}`,
//! and carries the execution statistics and console output recorded when the
//! external executor reports completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state_machine::ExecutionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: i64,
    pub task_id: i64,
    /// Unique within the owning task
    pub name: String,
    pub parameters: Option<Value>,
    pub status: ExecutionStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Recorded once, when the executor reports the terminal transition
    pub statistics: Option<ExecutionStatistics>,
}

/// Incremental step submission against an existing task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStep {
    pub task_id: i64,
    pub name: String,
    pub parameters: Option<Value>,
}

/// Resource usage and diagnostics reported by the external executor for
/// one step attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStatistics {
    pub node: String,
    pub exit_code: i32,
    pub user_cpu_ms: i64,
    pub system_cpu_ms: i64,
    pub duration_ms: i64,
    pub max_rss_kb: i64,
    pub max_vm_size_kb: i64,
    pub disk_read_bytes: i64,
    pub disk_write_bytes: i64,
    pub stdout_text: String,
    pub stderr_text: String,
}

/// Everything an external executor needs to run one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepToRun {
    pub task_id: i64,
    pub module_short_name: String,
    pub step_name: String,
    pub parameters: Option<Value>,
}

/// Captured console output of one step, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConsoleOutput {
    pub task_id: i64,
    pub step_name: String,
    pub stdout_text: String,
    pub stderr_text: String,
}
