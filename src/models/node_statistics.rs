//! Monitoring sample reported by a processing node.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatistics {
    pub node_name: String,
    pub cpu_user_pct: f64,
    pub cpu_system_pct: f64,
    pub mem_total_kb: i64,
    pub mem_used_kb: i64,
    pub swap_total_kb: i64,
    pub swap_used_kb: i64,
    pub load_avg_1m: f64,
    pub load_avg_5m: f64,
    pub load_avg_15m: f64,
    pub disk_total_bytes: i64,
    pub disk_used_bytes: i64,
    pub sampled_at: DateTime<Utc>,
}
