use serde::{Deserialize, Serialize};
use std::fmt;

/// Execution status shared by steps and tasks.
///
/// Steps advance `PendingStart -> Started -> {Finished, Failed}` with no
/// regression and no skipping. A task's status is derived from its steps
/// but stored independently, so it uses the same set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Submitted and waiting for an executor to pick it up
    PendingStart,
    /// An external executor is running it
    Started,
    /// Completed successfully
    Finished,
    /// Completed with an error
    Failed,
}

impl ExecutionStatus {
    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Check if this is an active status (work is in flight)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Started)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PendingStart => write!(f, "pending_start"),
            Self::Started => write!(f, "started"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_start" => Ok(Self::PendingStart),
            "started" => Ok(Self::Started),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid execution status: {s}")),
        }
    }
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        Self::PendingStart
    }
}

/// Job status.
///
/// `Submitted -> Running <-> Paused`; `Running/Paused -> NeedsInput -> Running`;
/// any non-terminal status may move to the terminal `Cancelled`, `Finished`
/// or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted but no step has started yet
    Submitted,
    /// At least one step has started
    Running,
    /// Suspended by an operator
    Paused,
    /// Blocked on external input
    NeedsInput,
    /// Cancelled by an operator
    Cancelled,
    /// All work completed successfully
    Finished,
    /// Completed with an error
    Failed,
}

impl JobStatus {
    /// Check if this is a terminal status (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Finished | Self::Failed)
    }

    /// Check if the job is currently processing work
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::NeedsInput => write!(f, "needs_input"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "running" => Ok(Self::Running),
            "paused" => Ok(Self::Paused),
            "needs_input" => Ok(Self::NeedsInput),
            "cancelled" => Ok(Self::Cancelled),
            "finished" => Ok(Self::Finished),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn execution_status_terminal_check() {
        assert!(ExecutionStatus::Finished.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(!ExecutionStatus::PendingStart.is_terminal());
        assert!(!ExecutionStatus::Started.is_terminal());
    }

    #[test]
    fn job_status_terminal_check() {
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Paused.is_terminal());
        assert!(!JobStatus::NeedsInput.is_terminal());
    }

    #[test]
    fn status_string_conversion() {
        assert_eq!(ExecutionStatus::PendingStart.to_string(), "pending_start");
        assert_eq!(
            "started".parse::<ExecutionStatus>().unwrap(),
            ExecutionStatus::Started
        );

        assert_eq!(JobStatus::NeedsInput.to_string(), "needs_input");
        assert_eq!("paused".parse::<JobStatus>().unwrap(), JobStatus::Paused);
    }

    #[test]
    fn status_serde() {
        let status = ExecutionStatus::PendingStart;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"pending_start\"");

        let parsed: ExecutionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }

    fn any_execution_status() -> impl Strategy<Value = ExecutionStatus> {
        prop_oneof![
            Just(ExecutionStatus::PendingStart),
            Just(ExecutionStatus::Started),
            Just(ExecutionStatus::Finished),
            Just(ExecutionStatus::Failed),
        ]
    }

    fn any_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Submitted),
            Just(JobStatus::Running),
            Just(JobStatus::Paused),
            Just(JobStatus::NeedsInput),
            Just(JobStatus::Cancelled),
            Just(JobStatus::Finished),
            Just(JobStatus::Failed),
        ]
    }

    proptest! {
        #[test]
        fn execution_status_display_roundtrip(status in any_execution_status()) {
            let parsed: ExecutionStatus = status.to_string().parse().unwrap();
            prop_assert_eq!(parsed, status);
        }

        #[test]
        fn job_status_display_roundtrip(status in any_job_status()) {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            prop_assert_eq!(parsed, status);
        }
    }
}
