//! # Postgres Persistence
//!
//! The production [`PersistencePort`] backend. Every operation is a single
//! unit of work: open a transaction at REPEATABLE READ, read current
//! status, validate through [`crate::state_machine`], write, commit. The
//! storage engine aborts one of two conflicting transactions; the retry
//! executor observes the abort as a transient error and re-runs the whole
//! unit with fresh reads.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::debug;

use crate::config::RetryConfig;
use crate::error::{classify_storage_error, CoreError, Result};
use crate::models::{
    ArchivedProduct, ConfigurationParameterInfo, ConfigurationParameterValue,
    ConfigurationUpdateAction, EventType, ExecutionStatistics, KeyedMessage, NewJob, NewProduct,
    NewScheduledTask, NewStep, NewTask, NodeStatistics, Product, ProductToArchive, Satellite,
    ScheduledTask, ScheduledTaskStatus, ScheduledTaskStatusUpdate, SerializedEvent,
    StepConsoleOutput, StepToRun, Tile, UnprocessedEvent,
};
use crate::persistence::port::PersistencePort;
use crate::resilience::RetryExecutor;
use crate::state_machine::{
    derive_task_status, job_running_on_step_start, validate_job_transition, validate_step_fail,
    validate_step_finish, validate_step_pending_start, validate_step_start, ExecutionStatus,
    JobStatus, JobTransition, JobTransitionOutcome,
};

const UNKNOWN_KEY: &str = "unknown configuration key";
const ADMIN_REQUIRED: &str = "parameter requires administrative privileges";

/// Postgres-backed [`PersistencePort`] implementation.
pub struct PgPersistence {
    pool: PgPool,
    retry: RetryExecutor,
}

impl PgPersistence {
    pub fn new(pool: PgPool, retry_config: RetryConfig) -> Self {
        Self {
            pool,
            retry: RetryExecutor::new(retry_config),
        }
    }

    async fn mark_job(
        &self,
        operation: &'static str,
        job_id: i64,
        transition: JobTransition,
    ) -> Result<()> {
        let pool = &self.pool;
        self.retry
            .execute(operation, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, operation).await?;
                    let current = fetch_job_status(&mut tx, operation, job_id).await?;

                    let entity = format!("job {job_id}");
                    if let JobTransitionOutcome::Applied(new_status) =
                        validate_job_transition(&entity, current, transition)?
                    {
                        sqlx::query(
                            "UPDATE job SET status = $1, status_changed_at = now() WHERE id = $2",
                        )
                        .bind(new_status.to_string())
                        .bind(job_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(operation, e))?;

                        let terminal_event = match new_status {
                            JobStatus::Cancelled => Some(EventType::JobCancelled),
                            JobStatus::Finished => Some(EventType::JobFinished),
                            JobStatus::Failed => Some(EventType::JobFailed),
                            _ => None,
                        };
                        if let Some(event_type) = terminal_event {
                            let event = SerializedEvent::job_terminal(event_type, job_id);
                            enqueue_event(&mut tx, operation, &event).await?;
                        }

                        debug!(operation, job_id, status = %new_status, "job transition applied");
                    }

                    commit(tx, operation).await
                })
            })
            .await
    }
}

#[async_trait]
impl PersistencePort for PgPersistence {
    async fn submit_job(&self, job: &NewJob) -> Result<i64> {
        const OP: &str = "SubmitJob";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;

                    ensure_exists(&mut tx, OP, "processor", job.processor_id).await?;
                    ensure_exists(&mut tx, OP, "site", job.site_id).await?;
                    for action in &job.configuration {
                        ensure_known_key(&mut tx, OP, &action.key).await?;
                    }

                    let row = sqlx::query(
                        "INSERT INTO job \
                         (processor_id, site_id, name, description, start_type, parameters, status) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
                    )
                    .bind(job.processor_id)
                    .bind(job.site_id)
                    .bind(&job.name)
                    .bind(&job.description)
                    .bind(job.start_type.as_i16())
                    .bind(&job.parameters)
                    .bind(JobStatus::Submitted.to_string())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;
                    let job_id: i64 = row.try_get("id").map_err(|e| classify_storage_error(OP, e))?;

                    for action in &job.configuration {
                        apply_job_override(&mut tx, OP, job_id, action).await?;
                    }

                    for new_task in &job.tasks {
                        let task_row = sqlx::query(
                            "INSERT INTO task (job_id, module_short_name, parameters, status) \
                             VALUES ($1, $2, $3, $4) RETURNING id",
                        )
                        .bind(job_id)
                        .bind(&new_task.module_short_name)
                        .bind(&new_task.parameters)
                        .bind(ExecutionStatus::PendingStart.to_string())
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                        let task_id: i64 = task_row
                            .try_get("id")
                            .map_err(|e| classify_storage_error(OP, e))?;

                        for new_step in &new_task.steps {
                            sqlx::query(
                                "INSERT INTO step (task_id, name, parameters, status) \
                                 VALUES ($1, $2, $3, $4)",
                            )
                            .bind(task_id)
                            .bind(&new_step.name)
                            .bind(&new_step.parameters)
                            .bind(ExecutionStatus::PendingStart.to_string())
                            .execute(&mut *tx)
                            .await
                            .map_err(|e| classify_storage_error(OP, e))?;
                        }
                    }

                    commit(tx, OP).await?;
                    debug!(operation = OP, job_id, name = %job.name, "job submitted");
                    Ok(job_id)
                })
            })
            .await
    }

    async fn submit_task(&self, task: &NewTask) -> Result<i64> {
        const OP: &str = "SubmitTask";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;

                    let status = fetch_job_status(&mut tx, OP, task.job_id).await?;
                    if status.is_terminal() {
                        return Err(CoreError::validation(format!(
                            "job {} is already {status}",
                            task.job_id
                        )));
                    }

                    let row = sqlx::query(
                        "INSERT INTO task \
                         (job_id, module_short_name, parameters, preceding_task_ids, status) \
                         VALUES ($1, $2, $3, $4, $5) RETURNING id",
                    )
                    .bind(task.job_id)
                    .bind(&task.module_short_name)
                    .bind(&task.parameters)
                    .bind(&task.preceding_task_ids)
                    .bind(ExecutionStatus::PendingStart.to_string())
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;
                    let task_id: i64 = row.try_get("id").map_err(|e| classify_storage_error(OP, e))?;

                    commit(tx, OP).await?;
                    Ok(task_id)
                })
            })
            .await
    }

    async fn submit_steps(&self, steps: &[NewStep]) -> Result<()> {
        const OP: &str = "SubmitSteps";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;

                    for step in steps {
                        ensure_exists(&mut tx, OP, "task", step.task_id).await?;
                        sqlx::query(
                            "INSERT INTO step (task_id, name, parameters, status) \
                             VALUES ($1, $2, $3, $4)",
                        )
                        .bind(step.task_id)
                        .bind(&step.name)
                        .bind(&step.parameters)
                        .bind(ExecutionStatus::PendingStart.to_string())
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    }

                    commit(tx, OP).await
                })
            })
            .await
    }

    async fn mark_step_pending_start(&self, task_id: i64, name: &str) -> Result<()> {
        const OP: &str = "MarkStepPendingStart";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    let (_, status) = fetch_step(&mut tx, OP, task_id, name).await?;
                    validate_step_pending_start(&format!("step {task_id}/{name}"), status)?;
                    commit(tx, OP).await
                })
            })
            .await
    }

    async fn mark_step_started(&self, task_id: i64, name: &str) -> Result<()> {
        const OP: &str = "MarkStepStarted";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    let (step_id, status) = fetch_step(&mut tx, OP, task_id, name).await?;
                    validate_step_start(&format!("step {task_id}/{name}"), status)?;

                    sqlx::query(
                        "UPDATE step SET status = $1, started_at = now() WHERE id = $2",
                    )
                    .bind(ExecutionStatus::Started.to_string())
                    .bind(step_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    // Promote the owning task and a still-submitted job.
                    let task_row = sqlx::query("SELECT job_id, status FROM task WHERE id = $1")
                        .bind(task_id)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    let job_id: i64 = task_row
                        .try_get("job_id")
                        .map_err(|e| classify_storage_error(OP, e))?;
                    let task_status = parse_execution_status(OP, &task_row)?;

                    if task_status == ExecutionStatus::PendingStart {
                        sqlx::query(
                            "UPDATE task SET status = $1, status_changed_at = now() WHERE id = $2",
                        )
                        .bind(ExecutionStatus::Started.to_string())
                        .bind(task_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    }

                    let job_status = fetch_job_status(&mut tx, OP, job_id).await?;
                    if let Some(new_status) = job_running_on_step_start(job_status) {
                        sqlx::query(
                            "UPDATE job SET status = $1, status_changed_at = now() WHERE id = $2",
                        )
                        .bind(new_status.to_string())
                        .bind(job_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    }

                    commit(tx, OP).await
                })
            })
            .await
    }

    async fn mark_step_finished(
        &self,
        task_id: i64,
        name: &str,
        statistics: &ExecutionStatistics,
    ) -> Result<bool> {
        const OP: &str = "MarkStepFinished";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    let (step_id, status) = fetch_step(&mut tx, OP, task_id, name).await?;

                    if !validate_step_finish(&format!("step {task_id}/{name}"), status)? {
                        // Already terminal: record nothing.
                        return Ok(false);
                    }

                    write_step_terminal(
                        &mut tx,
                        OP,
                        step_id,
                        ExecutionStatus::Finished,
                        statistics,
                    )
                    .await?;
                    propagate_step_terminal(&mut tx, OP, task_id).await?;

                    commit(tx, OP).await?;
                    Ok(true)
                })
            })
            .await
    }

    async fn mark_step_failed(
        &self,
        task_id: i64,
        name: &str,
        statistics: &ExecutionStatistics,
    ) -> Result<()> {
        const OP: &str = "MarkStepFailed";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    let (step_id, status) = fetch_step(&mut tx, OP, task_id, name).await?;
                    validate_step_fail(&format!("step {task_id}/{name}"), status)?;

                    write_step_terminal(&mut tx, OP, step_id, ExecutionStatus::Failed, statistics)
                        .await?;

                    // A failed step fails its task; the job is left to the
                    // orchestrator's explicit decision.
                    let task_row = sqlx::query("SELECT job_id, status FROM task WHERE id = $1")
                        .bind(task_id)
                        .fetch_one(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    let job_id: i64 = task_row
                        .try_get("job_id")
                        .map_err(|e| classify_storage_error(OP, e))?;
                    let task_status = parse_execution_status(OP, &task_row)?;

                    if !task_status.is_terminal() {
                        sqlx::query(
                            "UPDATE task SET status = $1, status_changed_at = now() WHERE id = $2",
                        )
                        .bind(ExecutionStatus::Failed.to_string())
                        .bind(task_id)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    }

                    let event = SerializedEvent::step_failed(job_id, task_id, name);
                    enqueue_event(&mut tx, OP, &event).await?;

                    commit(tx, OP).await
                })
            })
            .await
    }

    async fn mark_job_paused(&self, job_id: i64) -> Result<()> {
        self.mark_job("MarkJobPaused", job_id, JobTransition::Pause).await
    }

    async fn mark_job_resumed(&self, job_id: i64) -> Result<()> {
        self.mark_job("MarkJobResumed", job_id, JobTransition::Resume).await
    }

    async fn mark_job_cancelled(&self, job_id: i64) -> Result<()> {
        self.mark_job("MarkJobCancelled", job_id, JobTransition::Cancel).await
    }

    async fn mark_job_finished(&self, job_id: i64) -> Result<()> {
        self.mark_job("MarkJobFinished", job_id, JobTransition::Finish).await
    }

    async fn mark_job_failed(&self, job_id: i64) -> Result<()> {
        self.mark_job("MarkJobFailed", job_id, JobTransition::Fail).await
    }

    async fn mark_job_needs_input(&self, job_id: i64) -> Result<()> {
        self.mark_job("MarkJobNeedsInput", job_id, JobTransition::NeedsInput)
            .await
    }

    async fn get_job_tasks_by_status(
        &self,
        job_id: i64,
        statuses: &[ExecutionStatus],
    ) -> Result<Vec<i64>> {
        const OP: &str = "GetJobTasksByStatus";
        let pool = &self.pool;
        let status_strings: Vec<String> = statuses.iter().map(ToString::to_string).collect();
        let status_strings = &status_strings;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    fetch_job_status(&mut tx, OP, job_id).await?;

                    let rows = sqlx::query(
                        "SELECT id FROM task WHERE job_id = $1 AND status = ANY($2) ORDER BY id",
                    )
                    .bind(job_id)
                    .bind(status_strings)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| row.try_get("id").map_err(|e| classify_storage_error(OP, e)))
                        .collect()
                })
            })
            .await
    }

    async fn get_task_steps_for_start(&self, task_id: i64) -> Result<Vec<StepToRun>> {
        const OP: &str = "GetTaskStepsForStart";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    ensure_exists(&mut tx, OP, "task", task_id).await?;

                    let rows = sqlx::query(
                        "SELECT s.task_id, t.module_short_name, s.name AS step_name, s.parameters \
                         FROM step s JOIN task t ON t.id = s.task_id \
                         WHERE s.task_id = $1 AND s.status = $2 \
                         ORDER BY s.id",
                    )
                    .bind(task_id)
                    .bind(ExecutionStatus::PendingStart.to_string())
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter().map(|row| row_to_step_to_run(OP, row)).collect()
                })
            })
            .await
    }

    async fn get_job_steps_for_resume(&self, job_id: i64) -> Result<Vec<StepToRun>> {
        const OP: &str = "GetJobStepsForResume";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    fetch_job_status(&mut tx, OP, job_id).await?;

                    // Submission order is id order; re-entry after a pause or
                    // crash reproduces the original execution order.
                    let rows = sqlx::query(
                        "SELECT s.task_id, t.module_short_name, s.name AS step_name, s.parameters \
                         FROM step s JOIN task t ON t.id = s.task_id \
                         WHERE t.job_id = $1 AND s.status <> $2 \
                         ORDER BY s.id",
                    )
                    .bind(job_id)
                    .bind(ExecutionStatus::Finished.to_string())
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter().map(|row| row_to_step_to_run(OP, row)).collect()
                })
            })
            .await
    }

    async fn get_task_console_outputs(&self, task_id: i64) -> Result<Vec<StepConsoleOutput>> {
        const OP: &str = "GetTaskConsoleOutputs";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    ensure_exists(&mut tx, OP, "task", task_id).await?;

                    let rows = sqlx::query(
                        "SELECT task_id, name AS step_name, \
                                COALESCE(stdout_text, '') AS stdout_text, \
                                COALESCE(stderr_text, '') AS stderr_text \
                         FROM step \
                         WHERE task_id = $1 \
                           AND (stdout_text IS NOT NULL OR stderr_text IS NOT NULL) \
                         ORDER BY id",
                    )
                    .bind(task_id)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| {
                            Ok(StepConsoleOutput {
                                task_id: try_column(OP, row, "task_id")?,
                                step_name: try_column(OP, row, "step_name")?,
                                stdout_text: try_column(OP, row, "stdout_text")?,
                                stderr_text: try_column(OP, row, "stderr_text")?,
                            })
                        })
                        .collect()
                })
            })
            .await
    }

    async fn get_configuration_set(&self) -> Result<Vec<ConfigurationParameterInfo>> {
        const OP: &str = "GetConfigurationSet";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let rows = sqlx::query(
                        "SELECT m.key, m.category, m.friendly_name, m.data_type, \
                                c.value, m.is_advanced \
                         FROM config_metadata m LEFT JOIN config c ON c.key = m.key \
                         ORDER BY m.category, m.key",
                    )
                    .fetch_all(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| {
                            Ok(ConfigurationParameterInfo {
                                key: try_column(OP, row, "key")?,
                                category: try_column(OP, row, "category")?,
                                friendly_name: try_column(OP, row, "friendly_name")?,
                                data_type: try_column(OP, row, "data_type")?,
                                value: try_column(OP, row, "value")?,
                                is_advanced: try_column(OP, row, "is_advanced")?,
                            })
                        })
                        .collect()
                })
            })
            .await
    }

    async fn get_configuration_parameters(
        &self,
        prefix: &str,
    ) -> Result<Vec<ConfigurationParameterValue>> {
        const OP: &str = "GetConfigurationParameters";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let rows = sqlx::query(
                        "SELECT key, value FROM config WHERE key LIKE $1 || '%' ORDER BY key",
                    )
                    .bind(prefix)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter().map(|row| row_to_parameter_value(OP, row)).collect()
                })
            })
            .await
    }

    async fn get_job_configuration_parameters(
        &self,
        job_id: i64,
        prefix: &str,
    ) -> Result<Vec<ConfigurationParameterValue>> {
        const OP: &str = "GetJobConfigurationParameters";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    fetch_job_status(&mut tx, OP, job_id).await?;

                    let rows = sqlx::query(
                        "SELECT m.key, COALESCE(o.value, c.value) AS value \
                         FROM config_metadata m \
                         LEFT JOIN config c ON c.key = m.key \
                         LEFT JOIN config_job o ON o.key = m.key AND o.job_id = $1 \
                         WHERE m.key LIKE $2 || '%' \
                           AND COALESCE(o.value, c.value) IS NOT NULL \
                         ORDER BY m.key",
                    )
                    .bind(job_id)
                    .bind(prefix)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter().map(|row| row_to_parameter_value(OP, row)).collect()
                })
            })
            .await
    }

    async fn update_configuration_parameters(
        &self,
        actions: &[ConfigurationUpdateAction],
        is_admin: bool,
    ) -> Result<Vec<KeyedMessage>> {
        const OP: &str = "UpdateConfigurationParameters";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    let mut outcomes = Vec::with_capacity(actions.len());

                    for action in actions {
                        let meta =
                            sqlx::query("SELECT is_advanced FROM config_metadata WHERE key = $1")
                                .bind(&action.key)
                                .fetch_optional(&mut *tx)
                                .await
                                .map_err(|e| classify_storage_error(OP, e))?;

                        let Some(meta) = meta else {
                            outcomes.push(KeyedMessage::error(&action.key, UNKNOWN_KEY));
                            continue;
                        };
                        let is_advanced: bool = meta
                            .try_get("is_advanced")
                            .map_err(|e| classify_storage_error(OP, e))?;
                        if is_advanced && !is_admin {
                            outcomes.push(KeyedMessage::error(&action.key, ADMIN_REQUIRED));
                            continue;
                        }

                        match &action.value {
                            Some(value) => {
                                sqlx::query(
                                    "INSERT INTO config (key, value) VALUES ($1, $2) \
                                     ON CONFLICT (key) DO UPDATE \
                                     SET value = EXCLUDED.value, last_updated = now()",
                                )
                                .bind(&action.key)
                                .bind(value)
                                .execute(&mut *tx)
                                .await
                                .map_err(|e| classify_storage_error(OP, e))?;
                            }
                            None => {
                                sqlx::query("DELETE FROM config WHERE key = $1")
                                    .bind(&action.key)
                                    .execute(&mut *tx)
                                    .await
                                    .map_err(|e| classify_storage_error(OP, e))?;
                            }
                        }
                        outcomes.push(KeyedMessage::ok(&action.key));
                    }

                    commit(tx, OP).await?;
                    Ok(outcomes)
                })
            })
            .await
    }

    async fn update_job_configuration_parameters(
        &self,
        job_id: i64,
        actions: &[ConfigurationUpdateAction],
    ) -> Result<Vec<KeyedMessage>> {
        const OP: &str = "UpdateJobConfigurationParameters";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    fetch_job_status(&mut tx, OP, job_id).await?;

                    let mut outcomes = Vec::with_capacity(actions.len());
                    for action in actions {
                        let known = sqlx::query("SELECT 1 FROM config_metadata WHERE key = $1")
                            .bind(&action.key)
                            .fetch_optional(&mut *tx)
                            .await
                            .map_err(|e| classify_storage_error(OP, e))?;
                        if known.is_none() {
                            outcomes.push(KeyedMessage::error(&action.key, UNKNOWN_KEY));
                            continue;
                        }

                        apply_job_override(&mut tx, OP, job_id, action).await?;
                        outcomes.push(KeyedMessage::ok(&action.key));
                    }

                    commit(tx, OP).await?;
                    Ok(outcomes)
                })
            })
            .await
    }

    async fn insert_event(&self, event: &SerializedEvent) -> Result<()> {
        const OP: &str = "InsertEvent";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    sqlx::query("INSERT INTO event (event_type, payload) VALUES ($1, $2)")
                        .bind(event.event_type.as_i16())
                        .bind(&event.payload)
                        .execute(pool)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;
                    Ok(())
                })
            })
            .await
    }

    async fn get_new_events(&self) -> Result<Vec<UnprocessedEvent>> {
        const OP: &str = "GetNewEvents";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let rows = sqlx::query(
                        "SELECT id, event_type, payload, submitted_at FROM event \
                         WHERE processing_started_at IS NULL ORDER BY id",
                    )
                    .fetch_all(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| {
                            let raw_type: i16 = try_column(OP, row, "event_type")?;
                            Ok(UnprocessedEvent {
                                id: try_column(OP, row, "id")?,
                                event_type: EventType::from_i16(raw_type)
                                    .map_err(|e| CoreError::operation(OP, e))?,
                                payload: try_column(OP, row, "payload")?,
                                submitted_at: try_column(OP, row, "submitted_at")?,
                            })
                        })
                        .collect()
                })
            })
            .await
    }

    async fn mark_event_processing_started(&self, event_id: i64) -> Result<()> {
        const OP: &str = "MarkEventProcessingStarted";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let result =
                        sqlx::query("UPDATE event SET processing_started_at = now() WHERE id = $1")
                            .bind(event_id)
                            .execute(pool)
                            .await
                            .map_err(|e| classify_storage_error(OP, e))?;
                    if result.rows_affected() == 0 {
                        return Err(CoreError::validation(format!("unknown event id {event_id}")));
                    }
                    Ok(())
                })
            })
            .await
    }

    async fn mark_event_processing_complete(&self, event_id: i64) -> Result<()> {
        const OP: &str = "MarkEventProcessingComplete";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let result = sqlx::query(
                        "UPDATE event SET processing_completed_at = now() WHERE id = $1",
                    )
                    .bind(event_id)
                    .execute(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;
                    if result.rows_affected() == 0 {
                        return Err(CoreError::validation(format!("unknown event id {event_id}")));
                    }
                    Ok(())
                })
            })
            .await
    }

    async fn insert_scheduled_task(&self, task: &NewScheduledTask) -> Result<i64> {
        const OP: &str = "InsertScheduledTask";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    ensure_exists(&mut tx, OP, "processor", task.processor_id).await?;
                    ensure_exists(&mut tx, OP, "site", task.site_id).await?;

                    let row = sqlx::query(
                        "INSERT INTO scheduled_task \
                         (name, processor_id, site_id, parameters, repeat_type, \
                          repeat_after_days, repeat_on_month_day, first_run_time, \
                          retry_seconds, priority) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
                    )
                    .bind(&task.name)
                    .bind(task.processor_id)
                    .bind(task.site_id)
                    .bind(&task.parameters)
                    .bind(task.repeat_type.as_i16())
                    .bind(task.repeat_after_days)
                    .bind(task.repeat_on_month_day)
                    .bind(task.first_run_time)
                    .bind(task.retry_seconds)
                    .bind(task.priority)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;
                    let id: i64 = row.try_get("id").map_err(|e| classify_storage_error(OP, e))?;

                    commit(tx, OP).await?;
                    Ok(id)
                })
            })
            .await
    }

    async fn get_scheduled_tasks(&self) -> Result<Vec<ScheduledTask>> {
        const OP: &str = "GetScheduledTasks";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let rows = sqlx::query(
                        "SELECT id, name, processor_id, site_id, parameters, repeat_type, \
                                repeat_after_days, repeat_on_month_day, first_run_time, \
                                retry_seconds, priority, last_scheduled_run, last_run_timestamp, \
                                last_retry_timestamp, estimated_next_run \
                         FROM scheduled_task ORDER BY id",
                    )
                    .fetch_all(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter().map(|row| row_to_scheduled_task(OP, row)).collect()
                })
            })
            .await
    }

    async fn update_scheduled_tasks_status(
        &self,
        updates: &[ScheduledTaskStatusUpdate],
    ) -> Result<()> {
        const OP: &str = "UpdateScheduledTasksStatus";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;

                    for update in updates {
                        let result = sqlx::query(
                            "UPDATE scheduled_task SET last_scheduled_run = $2, \
                             last_run_timestamp = $3, last_retry_timestamp = $4, \
                             estimated_next_run = $5 WHERE id = $1",
                        )
                        .bind(update.id)
                        .bind(update.status.last_scheduled_run)
                        .bind(update.status.last_run_timestamp)
                        .bind(update.status.last_retry_timestamp)
                        .bind(update.status.estimated_next_run)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;

                        if result.rows_affected() == 0 {
                            return Err(CoreError::validation(format!(
                                "unknown scheduled task id {}",
                                update.id
                            )));
                        }
                    }

                    commit(tx, OP).await
                })
            })
            .await
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<i64> {
        const OP: &str = "InsertProduct";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    ensure_exists(&mut tx, OP, "processor", product.processor_id).await?;
                    ensure_exists(&mut tx, OP, "site", product.site_id).await?;

                    let row = sqlx::query(
                        "INSERT INTO product \
                         (product_type_id, processor_id, site_id, job_id, name, full_path, \
                          created_at, quicklook_path, footprint) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
                    )
                    .bind(product.product_type_id)
                    .bind(product.processor_id)
                    .bind(product.site_id)
                    .bind(product.job_id)
                    .bind(&product.name)
                    .bind(&product.full_path)
                    .bind(product.created_at)
                    .bind(&product.quicklook_path)
                    .bind(&product.footprint)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;
                    let id: i64 = row.try_get("id").map_err(|e| classify_storage_error(OP, e))?;

                    commit(tx, OP).await?;
                    Ok(id)
                })
            })
            .await
    }

    async fn get_products_to_archive(&self) -> Result<Vec<ProductToArchive>> {
        const OP: &str = "GetProductsToArchive";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;

                    let max_age_days = fetch_config_value(&mut tx, OP, "archiver.max_age_days")
                        .await?
                        .and_then(|v| v.parse::<i64>().ok())
                        .unwrap_or(90);
                    let archive_root = fetch_config_value(&mut tx, OP, "archiver.archive_path")
                        .await?
                        .unwrap_or_else(|| "/mnt/archive".to_string());
                    let cutoff = Utc::now() - Duration::days(max_age_days);

                    let rows = sqlx::query(
                        "SELECT id, name, full_path FROM product \
                         WHERE archived = FALSE AND inserted_at < $1 ORDER BY id",
                    )
                    .bind(cutoff)
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| {
                            let name: String = try_column(OP, row, "name")?;
                            Ok(ProductToArchive {
                                product_id: try_column(OP, row, "id")?,
                                current_path: try_column(OP, row, "full_path")?,
                                archive_path: format!("{archive_root}/{name}"),
                            })
                        })
                        .collect()
                })
            })
            .await
    }

    async fn mark_products_archived(&self, products: &[ArchivedProduct]) -> Result<()> {
        const OP: &str = "MarkProductsArchived";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;

                    for archived in products {
                        let result = sqlx::query(
                            "UPDATE product SET archived = TRUE, archive_path = $2, \
                             full_path = $2, archived_at = now() WHERE id = $1",
                        )
                        .bind(archived.product_id)
                        .bind(&archived.archive_path)
                        .execute(&mut *tx)
                        .await
                        .map_err(|e| classify_storage_error(OP, e))?;

                        if result.rows_affected() == 0 {
                            return Err(CoreError::validation(format!(
                                "unknown product id {}",
                                archived.product_id
                            )));
                        }
                    }

                    commit(tx, OP).await
                })
            })
            .await
    }

    async fn get_products(
        &self,
        site_id: i64,
        product_type_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Product>> {
        const OP: &str = "GetProducts";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let rows = sqlx::query(
                        "SELECT id, product_type_id, processor_id, site_id, job_id, name, \
                                full_path, created_at, inserted_at, quicklook_path, footprint, \
                                archived, archive_path \
                         FROM product \
                         WHERE site_id = $1 AND product_type_id = $2 \
                           AND created_at BETWEEN $3 AND $4 \
                         ORDER BY created_at",
                    )
                    .bind(site_id)
                    .bind(product_type_id)
                    .bind(start)
                    .bind(end)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter().map(|row| row_to_product(OP, row)).collect()
                })
            })
            .await
    }

    async fn get_site_tiles(&self, site_id: i64, satellite: Satellite) -> Result<Vec<Tile>> {
        const OP: &str = "GetSiteTiles";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let mut tx = begin(pool, OP).await?;
                    ensure_exists(&mut tx, OP, "site", site_id).await?;

                    let rows = sqlx::query(
                        "SELECT satellite_id, tile_id FROM site_tile \
                         WHERE site_id = $1 AND satellite_id = $2 ORDER BY tile_id",
                    )
                    .bind(site_id)
                    .bind(satellite.as_i16())
                    .fetch_all(&mut *tx)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| row_to_tile(OP, row, "satellite_id", "tile_id"))
                        .collect()
                })
            })
            .await
    }

    async fn get_intersecting_tiles(
        &self,
        satellite: Satellite,
        tile_id: &str,
    ) -> Result<Vec<Tile>> {
        const OP: &str = "GetIntersectingTiles";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    let rows = sqlx::query(
                        "SELECT other_satellite_id, other_tile_id FROM tile_intersection \
                         WHERE satellite_id = $1 AND tile_id = $2 ORDER BY other_tile_id",
                    )
                    .bind(satellite.as_i16())
                    .bind(tile_id)
                    .fetch_all(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;

                    rows.iter()
                        .map(|row| row_to_tile(OP, row, "other_satellite_id", "other_tile_id"))
                        .collect()
                })
            })
            .await
    }

    async fn insert_node_statistics(&self, statistics: &NodeStatistics) -> Result<()> {
        const OP: &str = "InsertNodeStatistics";
        let pool = &self.pool;
        self.retry
            .execute(OP, move || {
                Box::pin(async move {
                    sqlx::query(
                        "INSERT INTO node_statistics \
                         (node_name, cpu_user_pct, cpu_system_pct, mem_total_kb, mem_used_kb, \
                          swap_total_kb, swap_used_kb, load_avg_1m, load_avg_5m, load_avg_15m, \
                          disk_total_bytes, disk_used_bytes, sampled_at) \
                         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
                    )
                    .bind(&statistics.node_name)
                    .bind(statistics.cpu_user_pct)
                    .bind(statistics.cpu_system_pct)
                    .bind(statistics.mem_total_kb)
                    .bind(statistics.mem_used_kb)
                    .bind(statistics.swap_total_kb)
                    .bind(statistics.swap_used_kb)
                    .bind(statistics.load_avg_1m)
                    .bind(statistics.load_avg_5m)
                    .bind(statistics.load_avg_15m)
                    .bind(statistics.disk_total_bytes)
                    .bind(statistics.disk_used_bytes)
                    .bind(statistics.sampled_at)
                    .execute(pool)
                    .await
                    .map_err(|e| classify_storage_error(OP, e))?;
                    Ok(())
                })
            })
            .await
    }
}

// --- transaction and row helpers ---

type PgTx = Transaction<'static, Postgres>;

/// Open a transaction at REPEATABLE READ so that conflicting concurrent
/// writers are resolved by a serialization failure, which the retry
/// executor turns into a re-run with fresh reads.
async fn begin(pool: &PgPool, operation: &str) -> Result<PgTx> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        .execute(&mut *tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    Ok(tx)
}

async fn commit(tx: PgTx, operation: &str) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| classify_storage_error(operation, e))
}

fn try_column<'r, T>(operation: &str, row: &'r PgRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| classify_storage_error(operation, e))
}

fn parse_execution_status(operation: &str, row: &PgRow) -> Result<ExecutionStatus> {
    let raw: String = try_column(operation, row, "status")?;
    raw.parse()
        .map_err(|e: String| CoreError::operation(operation, e))
}

async fn fetch_job_status(tx: &mut PgTx, operation: &str, job_id: i64) -> Result<JobStatus> {
    let row = sqlx::query("SELECT status FROM job WHERE id = $1")
        .bind(job_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?
        .ok_or_else(|| CoreError::validation(format!("unknown job id {job_id}")))?;
    let raw: String = try_column(operation, &row, "status")?;
    raw.parse()
        .map_err(|e: String| CoreError::operation(operation, e))
}

async fn fetch_step(
    tx: &mut PgTx,
    operation: &str,
    task_id: i64,
    name: &str,
) -> Result<(i64, ExecutionStatus)> {
    let row = sqlx::query("SELECT id, status FROM step WHERE task_id = $1 AND name = $2")
        .bind(task_id)
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?
        .ok_or_else(|| CoreError::validation(format!("unknown step {task_id}/{name}")))?;
    let id: i64 = try_column(operation, &row, "id")?;
    let status = parse_execution_status(operation, &row)?;
    Ok((id, status))
}

/// Referential check for entities the core consumes by identity.
async fn ensure_exists(tx: &mut PgTx, operation: &str, table: &str, id: i64) -> Result<()> {
    let query = format!("SELECT 1 FROM {table} WHERE id = $1");
    let row = sqlx::query(&query)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    if row.is_none() {
        return Err(CoreError::validation(format!("unknown {table} id {id}")));
    }
    Ok(())
}

async fn ensure_known_key(tx: &mut PgTx, operation: &str, key: &str) -> Result<()> {
    let row = sqlx::query("SELECT 1 FROM config_metadata WHERE key = $1")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    if row.is_none() {
        return Err(CoreError::validation(format!(
            "unknown configuration key {key}"
        )));
    }
    Ok(())
}

async fn apply_job_override(
    tx: &mut PgTx,
    operation: &str,
    job_id: i64,
    action: &ConfigurationUpdateAction,
) -> Result<()> {
    match &action.value {
        Some(value) => {
            sqlx::query(
                "INSERT INTO config_job (job_id, key, value) VALUES ($1, $2, $3) \
                 ON CONFLICT (job_id, key) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(job_id)
            .bind(&action.key)
            .bind(value)
            .execute(&mut **tx)
            .await
            .map_err(|e| classify_storage_error(operation, e))?;
        }
        None => {
            sqlx::query("DELETE FROM config_job WHERE job_id = $1 AND key = $2")
                .bind(job_id)
                .bind(&action.key)
                .execute(&mut **tx)
                .await
                .map_err(|e| classify_storage_error(operation, e))?;
        }
    }
    Ok(())
}

async fn enqueue_event(tx: &mut PgTx, operation: &str, event: &SerializedEvent) -> Result<()> {
    sqlx::query("INSERT INTO event (event_type, payload) VALUES ($1, $2)")
        .bind(event.event_type.as_i16())
        .bind(&event.payload)
        .execute(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    Ok(())
}

async fn write_step_terminal(
    tx: &mut PgTx,
    operation: &str,
    step_id: i64,
    status: ExecutionStatus,
    statistics: &ExecutionStatistics,
) -> Result<()> {
    sqlx::query(
        "UPDATE step SET status = $1, finished_at = now(), node_name = $2, exit_code = $3, \
         user_cpu_ms = $4, system_cpu_ms = $5, duration_ms = $6, max_rss_kb = $7, \
         max_vm_size_kb = $8, disk_read_bytes = $9, disk_write_bytes = $10, \
         stdout_text = $11, stderr_text = $12 \
         WHERE id = $13",
    )
    .bind(status.to_string())
    .bind(&statistics.node)
    .bind(statistics.exit_code)
    .bind(statistics.user_cpu_ms)
    .bind(statistics.system_cpu_ms)
    .bind(statistics.duration_ms)
    .bind(statistics.max_rss_kb)
    .bind(statistics.max_vm_size_kb)
    .bind(statistics.disk_read_bytes)
    .bind(statistics.disk_write_bytes)
    .bind(&statistics.stdout_text)
    .bind(&statistics.stderr_text)
    .bind(step_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| classify_storage_error(operation, e))?;
    Ok(())
}

/// After a step reached a terminal state, re-derive the owning task's
/// status and enqueue the `TaskFinished` event when the whole task
/// completed successfully.
async fn propagate_step_terminal(tx: &mut PgTx, operation: &str, task_id: i64) -> Result<()> {
    let rows = sqlx::query("SELECT status FROM step WHERE task_id = $1")
        .bind(task_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    let statuses: Vec<ExecutionStatus> = rows
        .iter()
        .map(|row| parse_execution_status(operation, row))
        .collect::<Result<_>>()?;

    let Some(derived) = derive_task_status(&statuses) else {
        return Ok(());
    };

    let task_row = sqlx::query("SELECT job_id, module_short_name, status FROM task WHERE id = $1")
        .bind(task_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    let task_status = parse_execution_status(operation, &task_row)?;
    if task_status.is_terminal() {
        return Ok(());
    }

    sqlx::query("UPDATE task SET status = $1, status_changed_at = now() WHERE id = $2")
        .bind(derived.to_string())
        .bind(task_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;

    if derived == ExecutionStatus::Finished {
        let job_id: i64 = try_column(operation, &task_row, "job_id")?;
        let module: String = try_column(operation, &task_row, "module_short_name")?;
        let event = SerializedEvent::task_finished(job_id, task_id, &module);
        enqueue_event(tx, operation, &event).await?;
    }
    Ok(())
}

async fn fetch_config_value(tx: &mut PgTx, operation: &str, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM config WHERE key = $1")
        .bind(key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| classify_storage_error(operation, e))?;
    row.map(|r| try_column(operation, &r, "value")).transpose()
}

fn row_to_step_to_run(operation: &str, row: &PgRow) -> Result<StepToRun> {
    Ok(StepToRun {
        task_id: try_column(operation, row, "task_id")?,
        module_short_name: try_column(operation, row, "module_short_name")?,
        step_name: try_column(operation, row, "step_name")?,
        parameters: try_column(operation, row, "parameters")?,
    })
}

fn row_to_parameter_value(operation: &str, row: &PgRow) -> Result<ConfigurationParameterValue> {
    Ok(ConfigurationParameterValue {
        key: try_column(operation, row, "key")?,
        value: try_column(operation, row, "value")?,
    })
}

fn row_to_scheduled_task(operation: &str, row: &PgRow) -> Result<ScheduledTask> {
    let raw_repeat: i16 = try_column(operation, row, "repeat_type")?;
    Ok(ScheduledTask {
        id: try_column(operation, row, "id")?,
        name: try_column(operation, row, "name")?,
        processor_id: try_column(operation, row, "processor_id")?,
        site_id: try_column(operation, row, "site_id")?,
        parameters: try_column(operation, row, "parameters")?,
        repeat_type: crate::models::RepeatType::from_i16(raw_repeat)
            .map_err(|e| CoreError::operation(operation, e))?,
        repeat_after_days: try_column(operation, row, "repeat_after_days")?,
        repeat_on_month_day: try_column(operation, row, "repeat_on_month_day")?,
        first_run_time: try_column(operation, row, "first_run_time")?,
        retry_seconds: try_column(operation, row, "retry_seconds")?,
        priority: try_column(operation, row, "priority")?,
        status: ScheduledTaskStatus {
            last_scheduled_run: try_column(operation, row, "last_scheduled_run")?,
            last_run_timestamp: try_column(operation, row, "last_run_timestamp")?,
            last_retry_timestamp: try_column(operation, row, "last_retry_timestamp")?,
            estimated_next_run: try_column(operation, row, "estimated_next_run")?,
        },
    })
}

fn row_to_product(operation: &str, row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: try_column(operation, row, "id")?,
        product_type_id: try_column(operation, row, "product_type_id")?,
        processor_id: try_column(operation, row, "processor_id")?,
        site_id: try_column(operation, row, "site_id")?,
        job_id: try_column(operation, row, "job_id")?,
        name: try_column(operation, row, "name")?,
        full_path: try_column(operation, row, "full_path")?,
        created_at: try_column(operation, row, "created_at")?,
        inserted_at: try_column(operation, row, "inserted_at")?,
        quicklook_path: try_column(operation, row, "quicklook_path")?,
        footprint: try_column(operation, row, "footprint")?,
        archived: try_column(operation, row, "archived")?,
        archive_path: try_column(operation, row, "archive_path")?,
    })
}

fn row_to_tile(
    operation: &str,
    row: &PgRow,
    satellite_column: &str,
    tile_column: &str,
) -> Result<Tile> {
    let raw: i16 = try_column(operation, row, satellite_column)?;
    Ok(Tile {
        satellite: Satellite::from_i16(raw).map_err(|e| CoreError::operation(operation, e))?,
        tile_id: try_column(operation, row, tile_column)?,
    })
}
