//! # Task Model
//!
//! A named subdivision of a job, composed of steps. A task's status is
//! derived from its steps' statuses but stored independently so that
//! callers never have to re-derive it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state_machine::ExecutionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub job_id: i64,
    /// Short name of the processing module this task invokes
    pub module_short_name: String,
    pub parameters: Option<Value>,
    /// Tasks that must complete before this one may start; informational
    /// for the external scheduler, not enforced by this core
    pub preceding_task_ids: Vec<i64>,
    pub status: ExecutionStatus,
    pub submitted_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

/// Incremental task submission against an existing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub job_id: i64,
    pub module_short_name: String,
    pub parameters: Option<Value>,
    pub preceding_task_ids: Vec<i64>,
}
