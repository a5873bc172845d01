//! # Job Model
//!
//! Top-level unit of submitted work, composed of tasks. A job is created in
//! `Submitted` status together with its initial tasks and steps, and is then
//! mutated only through the defined transition operations. Jobs are never
//! deleted by this core; archival is an external concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::configuration::ConfigurationUpdateAction;
use crate::state_machine::JobStatus;

/// How a job came to be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartType {
    /// Submitted automatically when new input data arrived
    Triggered,
    /// Submitted explicitly by an operator
    Requested,
    /// Submitted by the recurring scheduler
    Scheduled,
}

impl StartType {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Triggered => 1,
            Self::Requested => 2,
            Self::Scheduled => 3,
        }
    }

    pub fn from_i16(value: i16) -> Result<Self, String> {
        match value {
            1 => Ok(Self::Triggered),
            2 => Ok(Self::Requested),
            3 => Ok(Self::Scheduled),
            _ => Err(format!("Invalid start type: {value}")),
        }
    }
}

/// A persisted job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: i64,
    pub processor_id: i64,
    pub site_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_type: StartType,
    /// Processor invocation parameters, opaque to this core
    pub parameters: Value,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
}

/// Definition of a job to submit, including its initial task/step
/// composition. Tasks discovered later (dynamic fan-out) are added through
/// `submit_task` / `submit_steps`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,
    pub description: Option<String>,
    pub processor_id: i64,
    pub site_id: i64,
    pub start_type: StartType,
    pub parameters: Value,
    /// Per-job configuration overrides; every key must reference an
    /// existing global configuration parameter.
    pub configuration: Vec<ConfigurationUpdateAction>,
    pub tasks: Vec<NewJobTask>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobTask {
    pub module_short_name: String,
    pub parameters: Option<Value>,
    pub steps: Vec<NewJobStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJobStep {
    /// Unique within the owning task
    pub name: String,
    pub parameters: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_type_roundtrip() {
        for start_type in [StartType::Triggered, StartType::Requested, StartType::Scheduled] {
            assert_eq!(StartType::from_i16(start_type.as_i16()).unwrap(), start_type);
        }
        assert!(StartType::from_i16(0).is_err());
    }
}
