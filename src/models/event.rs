//! # Event Model
//!
//! Immutable records of domain occurrences queued for asynchronous
//! consumption. Once enqueued an event is never mutated except to mark the
//! start and completion of processing. Delivery is at-least-once: the claim
//! operations are advisory, so consumers must handle events idempotently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discriminator for the serialized payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TaskFinished,
    ProductAvailable,
    JobCancelled,
    JobPaused,
    JobResumed,
    JobSubmitted,
    StepFailed,
    JobFinished,
    JobFailed,
}

impl EventType {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::TaskFinished => 1,
            Self::ProductAvailable => 2,
            Self::JobCancelled => 3,
            Self::JobPaused => 4,
            Self::JobResumed => 5,
            Self::JobSubmitted => 6,
            Self::StepFailed => 7,
            Self::JobFinished => 8,
            Self::JobFailed => 9,
        }
    }

    pub fn from_i16(value: i16) -> Result<Self, String> {
        match value {
            1 => Ok(Self::TaskFinished),
            2 => Ok(Self::ProductAvailable),
            3 => Ok(Self::JobCancelled),
            4 => Ok(Self::JobPaused),
            5 => Ok(Self::JobResumed),
            6 => Ok(Self::JobSubmitted),
            7 => Ok(Self::StepFailed),
            8 => Ok(Self::JobFinished),
            9 => Ok(Self::JobFailed),
            _ => Err(format!("Invalid event type: {value}")),
        }
    }
}

/// An event to enqueue. The payload is opaque to this core beyond the
/// discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedEvent {
    pub event_type: EventType,
    pub payload: Value,
}

impl SerializedEvent {
    pub fn new(event_type: EventType, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Event enqueued when the last step of a task finishes.
    pub fn task_finished(job_id: i64, task_id: i64, module_short_name: &str) -> Self {
        Self::new(
            EventType::TaskFinished,
            serde_json::json!({
                "job_id": job_id,
                "task_id": task_id,
                "module_short_name": module_short_name,
            }),
        )
    }

    /// Event enqueued when a step fails.
    pub fn step_failed(job_id: i64, task_id: i64, step_name: &str) -> Self {
        Self::new(
            EventType::StepFailed,
            serde_json::json!({
                "job_id": job_id,
                "task_id": task_id,
                "step_name": step_name,
            }),
        )
    }

    /// Event enqueued on a terminal job transition.
    pub fn job_terminal(event_type: EventType, job_id: i64) -> Self {
        Self::new(event_type, serde_json::json!({ "job_id": job_id }))
    }
}

/// An enqueued event not yet claimed by any consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnprocessedEvent {
    pub id: i64,
    pub event_type: EventType,
    pub payload: Value,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_roundtrip() {
        for raw in 1..=9i16 {
            let event_type = EventType::from_i16(raw).unwrap();
            assert_eq!(event_type.as_i16(), raw);
        }
        assert!(EventType::from_i16(0).is_err());
        assert!(EventType::from_i16(10).is_err());
    }
}
