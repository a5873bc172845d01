//! # Scheduled Task Model
//!
//! Durable definitions of recurring work plus their last-known execution
//! status. The external scheduler loop reads these, computes due times
//! against the current clock, and writes status back in bulk; no cron
//! parsing or due-time policy lives in this core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatType {
    /// Run once at `first_run_time`
    Once,
    /// Run every `repeat_after_days` days
    Cyclic,
    /// Run on day `repeat_on_month_day` of every month
    Monthly,
}

impl RepeatType {
    pub fn as_i16(self) -> i16 {
        match self {
            Self::Once => 0,
            Self::Cyclic => 1,
            Self::Monthly => 2,
        }
    }

    pub fn from_i16(value: i16) -> Result<Self, String> {
        match value {
            0 => Ok(Self::Once),
            1 => Ok(Self::Cyclic),
            2 => Ok(Self::Monthly),
            _ => Err(format!("Invalid repeat type: {value}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: i64,
    pub name: String,
    pub processor_id: i64,
    pub site_id: i64,
    pub parameters: Option<Value>,
    pub repeat_type: RepeatType,
    pub repeat_after_days: i32,
    pub repeat_on_month_day: i32,
    pub first_run_time: DateTime<Utc>,
    pub retry_seconds: i32,
    pub priority: i32,
    pub status: ScheduledTaskStatus,
}

/// Last-known execution status, written back by the scheduler loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTaskStatus {
    pub last_scheduled_run: Option<DateTime<Utc>>,
    pub last_run_timestamp: Option<DateTime<Utc>>,
    pub last_retry_timestamp: Option<DateTime<Utc>>,
    pub estimated_next_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScheduledTask {
    pub name: String,
    pub processor_id: i64,
    pub site_id: i64,
    pub parameters: Option<Value>,
    pub repeat_type: RepeatType,
    pub repeat_after_days: i32,
    pub repeat_on_month_day: i32,
    pub first_run_time: DateTime<Utc>,
    pub retry_seconds: i32,
    pub priority: i32,
}

/// One entry of a bulk status write-back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTaskStatusUpdate {
    pub id: i64,
    pub status: ScheduledTaskStatus,
}
