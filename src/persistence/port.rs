//! The data-access port: one method per query/command family.
//!
//! Semantics every implementation must honor:
//!
//! - Every mutating method is a single all-or-nothing unit of work that
//!   reads current status, validates through [`crate::state_machine`] and
//!   only then writes; never a blind unconditional update.
//! - Status propagation happens inside the same unit of work: the first
//!   step starting promotes its task to `Started` and a `Submitted` job to
//!   `Running`; a failing step marks its task `Failed` and enqueues a
//!   `StepFailed` event; the last step finishing marks the task `Finished`
//!   and enqueues a `TaskFinished` event; terminal job transitions enqueue
//!   the matching job event.
//! - Batch configuration updates always complete, reporting one
//!   [`KeyedMessage`] per input action.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    ArchivedProduct, ConfigurationParameterInfo, ConfigurationParameterValue,
    ConfigurationUpdateAction, ExecutionStatistics, KeyedMessage, NewJob, NewProduct,
    NewScheduledTask, NewStep, NewTask, NodeStatistics, Product, ProductToArchive, Satellite,
    ScheduledTask, ScheduledTaskStatusUpdate, SerializedEvent, StepConsoleOutput, StepToRun, Tile,
    UnprocessedEvent,
};
use crate::state_machine::ExecutionStatus;

#[async_trait]
pub trait PersistencePort: Send + Sync {
    // --- job / task / step lifecycle ---

    /// Create a job in `Submitted` status together with its tasks and steps
    /// (all `PendingStart`). Fails with a validation error when the
    /// definition references an unknown processor, site or configuration
    /// key.
    async fn submit_job(&self, job: &NewJob) -> Result<i64>;

    /// Add a task to an existing job (dynamic fan-out).
    async fn submit_task(&self, task: &NewTask) -> Result<i64>;

    /// Add steps to existing tasks (dynamic fan-out).
    async fn submit_steps(&self, steps: &[NewStep]) -> Result<()>;

    /// Re-assert `PendingStart` on a step that has not started yet.
    async fn mark_step_pending_start(&self, task_id: i64, name: &str) -> Result<()>;

    /// Record that an external executor started the step.
    async fn mark_step_started(&self, task_id: i64, name: &str) -> Result<()>;

    /// Record successful completion with its statistics.
    ///
    /// Returns `false` without recording anything when the step is already
    /// terminal, so a crashed-and-retried executor can safely re-report
    /// completion without double-counting statistics.
    async fn mark_step_finished(
        &self,
        task_id: i64,
        name: &str,
        statistics: &ExecutionStatistics,
    ) -> Result<bool>;

    /// Record failure with its statistics. Legal from any status except a
    /// terminal `Finished`.
    async fn mark_step_failed(
        &self,
        task_id: i64,
        name: &str,
        statistics: &ExecutionStatistics,
    ) -> Result<()>;

    async fn mark_job_paused(&self, job_id: i64) -> Result<()>;
    async fn mark_job_resumed(&self, job_id: i64) -> Result<()>;
    async fn mark_job_cancelled(&self, job_id: i64) -> Result<()>;
    async fn mark_job_finished(&self, job_id: i64) -> Result<()>;
    async fn mark_job_failed(&self, job_id: i64) -> Result<()>;
    async fn mark_job_needs_input(&self, job_id: i64) -> Result<()>;

    /// Ids of the job's tasks currently in one of the given statuses.
    async fn get_job_tasks_by_status(
        &self,
        job_id: i64,
        statuses: &[ExecutionStatus],
    ) -> Result<Vec<i64>>;

    /// Steps of one task ready to run, in submission order.
    async fn get_task_steps_for_start(&self, task_id: i64) -> Result<Vec<StepToRun>>;

    /// Steps of a job still to run after a pause or crash: exactly the
    /// steps not `Finished`, in original submission order.
    async fn get_job_steps_for_resume(&self, job_id: i64) -> Result<Vec<StepToRun>>;

    /// Captured per-step console output of one task.
    async fn get_task_console_outputs(&self, task_id: i64) -> Result<Vec<StepConsoleOutput>>;

    // --- configuration store ---

    /// Full ordered snapshot of all configuration parameters.
    async fn get_configuration_set(&self) -> Result<Vec<ConfigurationParameterInfo>>;

    /// Global values whose key starts with `prefix`.
    async fn get_configuration_parameters(
        &self,
        prefix: &str,
    ) -> Result<Vec<ConfigurationParameterValue>>;

    /// Effective values for a job: override if present, else global.
    async fn get_job_configuration_parameters(
        &self,
        job_id: i64,
        prefix: &str,
    ) -> Result<Vec<ConfigurationParameterValue>>;

    /// Apply a batch of global upsert/delete actions, reporting one outcome
    /// per action. Advanced keys require `is_admin`.
    async fn update_configuration_parameters(
        &self,
        actions: &[ConfigurationUpdateAction],
        is_admin: bool,
    ) -> Result<Vec<KeyedMessage>>;

    /// Apply a batch of per-job override actions; job scope is always
    /// caller-owned, so there is no admin gating.
    async fn update_job_configuration_parameters(
        &self,
        job_id: i64,
        actions: &[ConfigurationUpdateAction],
    ) -> Result<Vec<KeyedMessage>>;

    // --- event inbox ---

    /// Append-only enqueue.
    async fn insert_event(&self, event: &SerializedEvent) -> Result<()>;

    /// Unclaimed events in insertion order.
    async fn get_new_events(&self) -> Result<Vec<UnprocessedEvent>>;

    /// Advisory claim: two consumers may both observe an event before
    /// either claims it, so handling must be idempotent.
    async fn mark_event_processing_started(&self, event_id: i64) -> Result<()>;

    async fn mark_event_processing_complete(&self, event_id: i64) -> Result<()>;

    // --- scheduled task registry ---

    async fn insert_scheduled_task(&self, task: &NewScheduledTask) -> Result<i64>;

    async fn get_scheduled_tasks(&self) -> Result<Vec<ScheduledTask>>;

    /// Bulk status write-back after one scheduler evaluation pass.
    async fn update_scheduled_tasks_status(
        &self,
        updates: &[ScheduledTaskStatusUpdate],
    ) -> Result<()>;

    // --- product catalog boundary ---

    async fn insert_product(&self, product: &NewProduct) -> Result<i64>;

    /// Products past the configured retention, with their archive
    /// destinations.
    async fn get_products_to_archive(&self) -> Result<Vec<ProductToArchive>>;

    async fn mark_products_archived(&self, products: &[ArchivedProduct]) -> Result<()>;

    /// Products of one site and type created inside the given window.
    async fn get_products(
        &self,
        site_id: i64,
        product_type_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Product>>;

    async fn get_site_tiles(&self, site_id: i64, satellite: Satellite) -> Result<Vec<Tile>>;

    /// Tiles of the other satellites' grids intersecting the given tile.
    async fn get_intersecting_tiles(&self, satellite: Satellite, tile_id: &str)
        -> Result<Vec<Tile>>;

    // --- node monitoring boundary ---

    async fn insert_node_statistics(&self, statistics: &NodeStatistics) -> Result<()>;
}
