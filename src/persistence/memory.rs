//! # In-Memory Persistence
//!
//! A complete implementation of [`PersistencePort`] over process memory,
//! used for unit testing components against the port without a database.
//! It applies exactly the same transition rules as the Postgres backend;
//! the single store lock makes every operation's check-then-act atomic, the
//! way one storage transaction does.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::persistence::port::PersistencePort;
use crate::models::{
    ArchivedProduct, ConfigurationParameterInfo, ConfigurationParameterValue,
    ConfigurationUpdateAction, EventType, ExecutionStatistics, Job, KeyedMessage, NewJob,
    NewProduct, NewScheduledTask, NewStep, NewTask, NodeStatistics, Processor, Product,
    ProductToArchive, Satellite, ScheduledTask, ScheduledTaskStatus, ScheduledTaskStatusUpdate,
    SerializedEvent, Site, Step, StepConsoleOutput, StepToRun, Task, Tile, UnprocessedEvent,
};
use crate::state_machine::{
    derive_task_status, job_running_on_step_start, validate_job_transition, validate_step_fail,
    validate_step_finish, validate_step_pending_start, validate_step_start, ExecutionStatus,
    JobStatus, JobTransition, JobTransitionOutcome,
};

const UNKNOWN_KEY: &str = "unknown configuration key";
const ADMIN_REQUIRED: &str = "parameter requires administrative privileges";

#[derive(Debug, Clone)]
struct EventRecord {
    id: i64,
    event_type: EventType,
    payload: serde_json::Value,
    submitted_at: DateTime<Utc>,
    processing_started_at: Option<DateTime<Utc>>,
    processing_completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct ParameterMetadata {
    category: String,
    friendly_name: String,
    data_type: String,
    is_advanced: bool,
}

#[derive(Debug, Default)]
struct MemoryStore {
    next_job_id: i64,
    next_task_id: i64,
    next_step_id: i64,
    next_event_id: i64,
    next_scheduled_task_id: i64,
    next_product_id: i64,

    jobs: BTreeMap<i64, Job>,
    tasks: BTreeMap<i64, Task>,
    // BTreeMap keyed by id keeps submission order for resume queries
    steps: BTreeMap<i64, Step>,
    events: BTreeMap<i64, EventRecord>,
    scheduled_tasks: BTreeMap<i64, ScheduledTask>,

    metadata: BTreeMap<String, ParameterMetadata>,
    global_values: BTreeMap<String, String>,
    job_overrides: BTreeMap<(i64, String), String>,

    processors: BTreeMap<i64, Processor>,
    sites: BTreeMap<i64, Site>,
    site_tiles: Vec<(i64, Tile)>,
    tile_intersections: Vec<(Tile, Tile)>,
    products: BTreeMap<i64, Product>,
    node_statistics: Vec<NodeStatistics>,
}

impl MemoryStore {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn job_mut(&mut self, job_id: i64) -> Result<&mut Job> {
        self.jobs
            .get_mut(&job_id)
            .ok_or_else(|| CoreError::validation(format!("unknown job id {job_id}")))
    }

    fn step_id(&self, task_id: i64, name: &str) -> Result<i64> {
        self.steps
            .values()
            .find(|s| s.task_id == task_id && s.name == name)
            .map(|s| s.id)
            .ok_or_else(|| CoreError::validation(format!("unknown step {task_id}/{name}")))
    }

    fn enqueue(&mut self, event: SerializedEvent) {
        let id = Self::next_id(&mut self.next_event_id);
        self.events.insert(
            id,
            EventRecord {
                id,
                event_type: event.event_type,
                payload: event.payload,
                submitted_at: Utc::now(),
                processing_started_at: None,
                processing_completed_at: None,
            },
        );
    }

    fn validate_known_key(&self, action: &ConfigurationUpdateAction) -> Option<KeyedMessage> {
        if !self.metadata.contains_key(&action.key) {
            return Some(KeyedMessage::error(&action.key, UNKNOWN_KEY));
        }
        None
    }

    /// Re-derive and store the owning task's status after a step reached a
    /// terminal state, enqueueing the `TaskFinished` event when the whole
    /// task completed successfully.
    fn propagate_step_terminal(&mut self, task_id: i64) {
        let statuses: Vec<ExecutionStatus> = self
            .steps
            .values()
            .filter(|s| s.task_id == task_id)
            .map(|s| s.status)
            .collect();

        let Some(derived) = derive_task_status(&statuses) else {
            return;
        };

        let Some(task) = self.tasks.get_mut(&task_id) else {
            return;
        };
        if task.status.is_terminal() {
            return;
        }
        task.status = derived;
        task.status_changed_at = Utc::now();

        if derived == ExecutionStatus::Finished {
            let event =
                SerializedEvent::task_finished(task.job_id, task.id, &task.module_short_name);
            self.enqueue(event);
        }
    }
}

/// In-memory [`PersistencePort`] backend.
///
/// # Example
///
/// ```rust
/// use geopipe_core::models::{EventType, SerializedEvent};
/// use geopipe_core::persistence::{InMemoryPersistence, PersistencePort};
///
/// # tokio_test::block_on(async {
/// let persistence = InMemoryPersistence::new();
/// persistence
///     .insert_event(&SerializedEvent::new(
///         EventType::ProductAvailable,
///         serde_json::json!({ "product": "l3a_20260801" }),
///     ))
///     .await
///     .unwrap();
/// assert_eq!(persistence.get_new_events().await.unwrap().len(), 1);
/// # });
/// ```
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    store: Mutex<MemoryStore>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    // Seeding helpers for catalog entities the core only consumes.

    pub fn register_processor(&self, processor: Processor) {
        self.store.lock().processors.insert(processor.id, processor);
    }

    pub fn register_site(&self, site: Site) {
        self.store.lock().sites.insert(site.id, site);
    }

    pub fn register_parameter(&self, info: ConfigurationParameterInfo) {
        let mut store = self.store.lock();
        if let Some(value) = info.value {
            store.global_values.insert(info.key.clone(), value);
        }
        store.metadata.insert(
            info.key,
            ParameterMetadata {
                category: info.category,
                friendly_name: info.friendly_name,
                data_type: info.data_type,
                is_advanced: info.is_advanced,
            },
        );
    }

    pub fn register_site_tile(&self, site_id: i64, tile: Tile) {
        self.store.lock().site_tiles.push((site_id, tile));
    }

    pub fn register_tile_intersection(&self, tile: Tile, other: Tile) {
        self.store.lock().tile_intersections.push((tile, other));
    }

    fn mark_job(&self, job_id: i64, transition: JobTransition) -> Result<()> {
        let mut store = self.store.lock();
        let entity = format!("job {job_id}");
        let job = store.job_mut(job_id)?;

        let outcome = validate_job_transition(&entity, job.status, transition)?;
        if let JobTransitionOutcome::Applied(new_status) = outcome {
            job.status = new_status;
            job.status_changed_at = Utc::now();

            let terminal_event = match new_status {
                JobStatus::Cancelled => Some(EventType::JobCancelled),
                JobStatus::Finished => Some(EventType::JobFinished),
                JobStatus::Failed => Some(EventType::JobFailed),
                _ => None,
            };
            if let Some(event_type) = terminal_event {
                store.enqueue(SerializedEvent::job_terminal(event_type, job_id));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for InMemoryPersistence {
    async fn submit_job(&self, job: &NewJob) -> Result<i64> {
        let mut store = self.store.lock();

        if !store.processors.contains_key(&job.processor_id) {
            return Err(CoreError::validation(format!(
                "unknown processor id {}",
                job.processor_id
            )));
        }
        if !store.sites.contains_key(&job.site_id) {
            return Err(CoreError::validation(format!(
                "unknown site id {}",
                job.site_id
            )));
        }
        for action in &job.configuration {
            if !store.metadata.contains_key(&action.key) {
                return Err(CoreError::validation(format!(
                    "unknown configuration key {}",
                    action.key
                )));
            }
        }

        let now = Utc::now();
        let job_id = MemoryStore::next_id(&mut store.next_job_id);
        store.jobs.insert(
            job_id,
            Job {
                id: job_id,
                processor_id: job.processor_id,
                site_id: job.site_id,
                name: job.name.clone(),
                description: job.description.clone(),
                start_type: job.start_type,
                parameters: job.parameters.clone(),
                status: JobStatus::Submitted,
                submitted_at: now,
                status_changed_at: now,
            },
        );

        for action in &job.configuration {
            match &action.value {
                Some(value) => {
                    store
                        .job_overrides
                        .insert((job_id, action.key.clone()), value.clone());
                }
                None => {
                    store.job_overrides.remove(&(job_id, action.key.clone()));
                }
            }
        }

        for new_task in &job.tasks {
            let task_id = MemoryStore::next_id(&mut store.next_task_id);
            store.tasks.insert(
                task_id,
                Task {
                    id: task_id,
                    job_id,
                    module_short_name: new_task.module_short_name.clone(),
                    parameters: new_task.parameters.clone(),
                    preceding_task_ids: Vec::new(),
                    status: ExecutionStatus::PendingStart,
                    submitted_at: now,
                    status_changed_at: now,
                },
            );
            for new_step in &new_task.steps {
                let step_id = MemoryStore::next_id(&mut store.next_step_id);
                store.steps.insert(
                    step_id,
                    Step {
                        id: step_id,
                        task_id,
                        name: new_step.name.clone(),
                        parameters: new_step.parameters.clone(),
                        status: ExecutionStatus::PendingStart,
                        submitted_at: now,
                        started_at: None,
                        finished_at: None,
                        statistics: None,
                    },
                );
            }
        }

        Ok(job_id)
    }

    async fn submit_task(&self, task: &NewTask) -> Result<i64> {
        let mut store = self.store.lock();

        let job = store
            .jobs
            .get(&task.job_id)
            .ok_or_else(|| CoreError::validation(format!("unknown job id {}", task.job_id)))?;
        if job.status.is_terminal() {
            return Err(CoreError::validation(format!(
                "job {} is already {}",
                task.job_id, job.status
            )));
        }

        let now = Utc::now();
        let task_id = MemoryStore::next_id(&mut store.next_task_id);
        store.tasks.insert(
            task_id,
            Task {
                id: task_id,
                job_id: task.job_id,
                module_short_name: task.module_short_name.clone(),
                parameters: task.parameters.clone(),
                preceding_task_ids: task.preceding_task_ids.clone(),
                status: ExecutionStatus::PendingStart,
                submitted_at: now,
                status_changed_at: now,
            },
        );
        Ok(task_id)
    }

    async fn submit_steps(&self, steps: &[NewStep]) -> Result<()> {
        let mut store = self.store.lock();

        for step in steps {
            if !store.tasks.contains_key(&step.task_id) {
                return Err(CoreError::validation(format!(
                    "unknown task id {}",
                    step.task_id
                )));
            }
            if store
                .steps
                .values()
                .any(|s| s.task_id == step.task_id && s.name == step.name)
            {
                return Err(CoreError::operation(
                    "SubmitSteps",
                    format!("step {}/{} already exists", step.task_id, step.name),
                ));
            }
        }

        let now = Utc::now();
        for step in steps {
            let step_id = MemoryStore::next_id(&mut store.next_step_id);
            store.steps.insert(
                step_id,
                Step {
                    id: step_id,
                    task_id: step.task_id,
                    name: step.name.clone(),
                    parameters: step.parameters.clone(),
                    status: ExecutionStatus::PendingStart,
                    submitted_at: now,
                    started_at: None,
                    finished_at: None,
                    statistics: None,
                },
            );
        }
        Ok(())
    }

    async fn mark_step_pending_start(&self, task_id: i64, name: &str) -> Result<()> {
        let store = self.store.lock();
        let entity = format!("step {task_id}/{name}");
        let step_id = store.step_id(task_id, name)?;
        validate_step_pending_start(&entity, store.steps[&step_id].status)
    }

    async fn mark_step_started(&self, task_id: i64, name: &str) -> Result<()> {
        let mut store = self.store.lock();
        let entity = format!("step {task_id}/{name}");
        let step_id = store.step_id(task_id, name)?;

        validate_step_start(&entity, store.steps[&step_id].status)?;

        let now = Utc::now();
        let step = store.steps.get_mut(&step_id).expect("step looked up above");
        step.status = ExecutionStatus::Started;
        step.started_at = Some(now);

        let job_id = {
            let task = store.tasks.get_mut(&task_id).expect("step references task");
            if task.status == ExecutionStatus::PendingStart {
                task.status = ExecutionStatus::Started;
                task.status_changed_at = now;
            }
            task.job_id
        };

        let job = store.jobs.get_mut(&job_id).expect("task references job");
        if let Some(new_status) = job_running_on_step_start(job.status) {
            job.status = new_status;
            job.status_changed_at = now;
        }
        Ok(())
    }

    async fn mark_step_finished(
        &self,
        task_id: i64,
        name: &str,
        statistics: &ExecutionStatistics,
    ) -> Result<bool> {
        let mut store = self.store.lock();
        let entity = format!("step {task_id}/{name}");
        let step_id = store.step_id(task_id, name)?;

        if !validate_step_finish(&entity, store.steps[&step_id].status)? {
            return Ok(false);
        }

        let step = store.steps.get_mut(&step_id).expect("step looked up above");
        step.status = ExecutionStatus::Finished;
        step.finished_at = Some(Utc::now());
        step.statistics = Some(statistics.clone());

        store.propagate_step_terminal(task_id);
        Ok(true)
    }

    async fn mark_step_failed(
        &self,
        task_id: i64,
        name: &str,
        statistics: &ExecutionStatistics,
    ) -> Result<()> {
        let mut store = self.store.lock();
        let entity = format!("step {task_id}/{name}");
        let step_id = store.step_id(task_id, name)?;

        validate_step_fail(&entity, store.steps[&step_id].status)?;

        let now = Utc::now();
        let step = store.steps.get_mut(&step_id).expect("step looked up above");
        step.status = ExecutionStatus::Failed;
        step.finished_at = Some(now);
        step.statistics = Some(statistics.clone());

        let task = store.tasks.get_mut(&task_id).expect("step references task");
        if !task.status.is_terminal() {
            task.status = ExecutionStatus::Failed;
            task.status_changed_at = now;
        }
        let event = SerializedEvent::step_failed(task.job_id, task_id, name);
        store.enqueue(event);
        Ok(())
    }

    async fn mark_job_paused(&self, job_id: i64) -> Result<()> {
        self.mark_job(job_id, JobTransition::Pause)
    }

    async fn mark_job_resumed(&self, job_id: i64) -> Result<()> {
        self.mark_job(job_id, JobTransition::Resume)
    }

    async fn mark_job_cancelled(&self, job_id: i64) -> Result<()> {
        self.mark_job(job_id, JobTransition::Cancel)
    }

    async fn mark_job_finished(&self, job_id: i64) -> Result<()> {
        self.mark_job(job_id, JobTransition::Finish)
    }

    async fn mark_job_failed(&self, job_id: i64) -> Result<()> {
        self.mark_job(job_id, JobTransition::Fail)
    }

    async fn mark_job_needs_input(&self, job_id: i64) -> Result<()> {
        self.mark_job(job_id, JobTransition::NeedsInput)
    }

    async fn get_job_tasks_by_status(
        &self,
        job_id: i64,
        statuses: &[ExecutionStatus],
    ) -> Result<Vec<i64>> {
        let store = self.store.lock();
        if !store.jobs.contains_key(&job_id) {
            return Err(CoreError::validation(format!("unknown job id {job_id}")));
        }
        Ok(store
            .tasks
            .values()
            .filter(|t| t.job_id == job_id && statuses.contains(&t.status))
            .map(|t| t.id)
            .collect())
    }

    async fn get_task_steps_for_start(&self, task_id: i64) -> Result<Vec<StepToRun>> {
        let store = self.store.lock();
        let task = store
            .tasks
            .get(&task_id)
            .ok_or_else(|| CoreError::validation(format!("unknown task id {task_id}")))?;

        Ok(store
            .steps
            .values()
            .filter(|s| s.task_id == task_id && s.status == ExecutionStatus::PendingStart)
            .map(|s| StepToRun {
                task_id,
                module_short_name: task.module_short_name.clone(),
                step_name: s.name.clone(),
                parameters: s.parameters.clone(),
            })
            .collect())
    }

    async fn get_job_steps_for_resume(&self, job_id: i64) -> Result<Vec<StepToRun>> {
        let store = self.store.lock();
        if !store.jobs.contains_key(&job_id) {
            return Err(CoreError::validation(format!("unknown job id {job_id}")));
        }

        // BTreeMap iteration order is id order, which is submission order.
        Ok(store
            .steps
            .values()
            .filter(|s| s.status != ExecutionStatus::Finished)
            .filter_map(|s| {
                let task = store.tasks.get(&s.task_id)?;
                (task.job_id == job_id).then(|| StepToRun {
                    task_id: s.task_id,
                    module_short_name: task.module_short_name.clone(),
                    step_name: s.name.clone(),
                    parameters: s.parameters.clone(),
                })
            })
            .collect())
    }

    async fn get_task_console_outputs(&self, task_id: i64) -> Result<Vec<StepConsoleOutput>> {
        let store = self.store.lock();
        if !store.tasks.contains_key(&task_id) {
            return Err(CoreError::validation(format!("unknown task id {task_id}")));
        }

        Ok(store
            .steps
            .values()
            .filter(|s| s.task_id == task_id)
            .filter_map(|s| {
                s.statistics.as_ref().map(|stats| StepConsoleOutput {
                    task_id,
                    step_name: s.name.clone(),
                    stdout_text: stats.stdout_text.clone(),
                    stderr_text: stats.stderr_text.clone(),
                })
            })
            .collect())
    }

    async fn get_configuration_set(&self) -> Result<Vec<ConfigurationParameterInfo>> {
        let store = self.store.lock();
        let mut set: Vec<ConfigurationParameterInfo> = store
            .metadata
            .iter()
            .map(|(key, meta)| ConfigurationParameterInfo {
                key: key.clone(),
                category: meta.category.clone(),
                friendly_name: meta.friendly_name.clone(),
                data_type: meta.data_type.clone(),
                value: store.global_values.get(key).cloned(),
                is_advanced: meta.is_advanced,
            })
            .collect();
        set.sort_by(|a, b| (&a.category, &a.key).cmp(&(&b.category, &b.key)));
        Ok(set)
    }

    async fn get_configuration_parameters(
        &self,
        prefix: &str,
    ) -> Result<Vec<ConfigurationParameterValue>> {
        let store = self.store.lock();
        Ok(store
            .global_values
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| ConfigurationParameterValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn get_job_configuration_parameters(
        &self,
        job_id: i64,
        prefix: &str,
    ) -> Result<Vec<ConfigurationParameterValue>> {
        let store = self.store.lock();
        if !store.jobs.contains_key(&job_id) {
            return Err(CoreError::validation(format!("unknown job id {job_id}")));
        }

        Ok(store
            .metadata
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter_map(|key| {
                let value = store
                    .job_overrides
                    .get(&(job_id, key.clone()))
                    .or_else(|| store.global_values.get(key))?;
                Some(ConfigurationParameterValue {
                    key: key.clone(),
                    value: value.clone(),
                })
            })
            .collect())
    }

    async fn update_configuration_parameters(
        &self,
        actions: &[ConfigurationUpdateAction],
        is_admin: bool,
    ) -> Result<Vec<KeyedMessage>> {
        let mut store = self.store.lock();
        let mut outcomes = Vec::with_capacity(actions.len());

        for action in actions {
            if let Some(outcome) = store.validate_known_key(action) {
                outcomes.push(outcome);
                continue;
            }
            if store.metadata[&action.key].is_advanced && !is_admin {
                outcomes.push(KeyedMessage::error(&action.key, ADMIN_REQUIRED));
                continue;
            }

            match &action.value {
                Some(value) => {
                    store
                        .global_values
                        .insert(action.key.clone(), value.clone());
                }
                None => {
                    store.global_values.remove(&action.key);
                }
            }
            outcomes.push(KeyedMessage::ok(&action.key));
        }
        Ok(outcomes)
    }

    async fn update_job_configuration_parameters(
        &self,
        job_id: i64,
        actions: &[ConfigurationUpdateAction],
    ) -> Result<Vec<KeyedMessage>> {
        let mut store = self.store.lock();
        if !store.jobs.contains_key(&job_id) {
            return Err(CoreError::validation(format!("unknown job id {job_id}")));
        }

        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            if let Some(outcome) = store.validate_known_key(action) {
                outcomes.push(outcome);
                continue;
            }

            match &action.value {
                Some(value) => {
                    store
                        .job_overrides
                        .insert((job_id, action.key.clone()), value.clone());
                }
                None => {
                    store.job_overrides.remove(&(job_id, action.key.clone()));
                }
            }
            outcomes.push(KeyedMessage::ok(&action.key));
        }
        Ok(outcomes)
    }

    async fn insert_event(&self, event: &SerializedEvent) -> Result<()> {
        self.store.lock().enqueue(event.clone());
        Ok(())
    }

    async fn get_new_events(&self) -> Result<Vec<UnprocessedEvent>> {
        let store = self.store.lock();
        Ok(store
            .events
            .values()
            .filter(|e| e.processing_started_at.is_none())
            .map(|e| UnprocessedEvent {
                id: e.id,
                event_type: e.event_type,
                payload: e.payload.clone(),
                submitted_at: e.submitted_at,
            })
            .collect())
    }

    async fn mark_event_processing_started(&self, event_id: i64) -> Result<()> {
        let mut store = self.store.lock();
        let event = store
            .events
            .get_mut(&event_id)
            .ok_or_else(|| CoreError::validation(format!("unknown event id {event_id}")))?;
        event.processing_started_at = Some(Utc::now());
        Ok(())
    }

    async fn mark_event_processing_complete(&self, event_id: i64) -> Result<()> {
        let mut store = self.store.lock();
        let event = store
            .events
            .get_mut(&event_id)
            .ok_or_else(|| CoreError::validation(format!("unknown event id {event_id}")))?;
        if event.processing_completed_at.is_some() {
            // At-least-once delivery: a second consumer may re-complete.
            tracing::debug!(event_id, "event completed more than once");
        }
        event.processing_completed_at = Some(Utc::now());
        Ok(())
    }

    async fn insert_scheduled_task(&self, task: &NewScheduledTask) -> Result<i64> {
        let mut store = self.store.lock();
        if !store.processors.contains_key(&task.processor_id) {
            return Err(CoreError::validation(format!(
                "unknown processor id {}",
                task.processor_id
            )));
        }
        if !store.sites.contains_key(&task.site_id) {
            return Err(CoreError::validation(format!(
                "unknown site id {}",
                task.site_id
            )));
        }
        if store.scheduled_tasks.values().any(|t| t.name == task.name) {
            return Err(CoreError::operation(
                "InsertScheduledTask",
                format!("scheduled task {} already exists", task.name),
            ));
        }

        let id = MemoryStore::next_id(&mut store.next_scheduled_task_id);
        store.scheduled_tasks.insert(
            id,
            ScheduledTask {
                id,
                name: task.name.clone(),
                processor_id: task.processor_id,
                site_id: task.site_id,
                parameters: task.parameters.clone(),
                repeat_type: task.repeat_type,
                repeat_after_days: task.repeat_after_days,
                repeat_on_month_day: task.repeat_on_month_day,
                first_run_time: task.first_run_time,
                retry_seconds: task.retry_seconds,
                priority: task.priority,
                status: ScheduledTaskStatus::default(),
            },
        );
        Ok(id)
    }

    async fn get_scheduled_tasks(&self) -> Result<Vec<ScheduledTask>> {
        Ok(self.store.lock().scheduled_tasks.values().cloned().collect())
    }

    async fn update_scheduled_tasks_status(
        &self,
        updates: &[ScheduledTaskStatusUpdate],
    ) -> Result<()> {
        let mut store = self.store.lock();

        // Validate the whole batch before writing anything, mirroring the
        // transactional all-or-nothing of the Postgres backend.
        for update in updates {
            if !store.scheduled_tasks.contains_key(&update.id) {
                return Err(CoreError::validation(format!(
                    "unknown scheduled task id {}",
                    update.id
                )));
            }
        }

        for update in updates {
            let task = store
                .scheduled_tasks
                .get_mut(&update.id)
                .expect("validated above");
            task.status = update.status.clone();
        }
        Ok(())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<i64> {
        let mut store = self.store.lock();

        if !store.processors.contains_key(&product.processor_id) {
            return Err(CoreError::validation(format!(
                "unknown processor id {}",
                product.processor_id
            )));
        }
        if !store.sites.contains_key(&product.site_id) {
            return Err(CoreError::validation(format!(
                "unknown site id {}",
                product.site_id
            )));
        }
        if store
            .products
            .values()
            .any(|p| p.site_id == product.site_id && p.name == product.name)
        {
            return Err(CoreError::operation(
                "InsertProduct",
                format!("product {} already exists for site {}", product.name, product.site_id),
            ));
        }

        let id = MemoryStore::next_id(&mut store.next_product_id);
        store.products.insert(
            id,
            Product {
                id,
                product_type_id: product.product_type_id,
                processor_id: product.processor_id,
                site_id: product.site_id,
                job_id: product.job_id,
                name: product.name.clone(),
                full_path: product.full_path.clone(),
                created_at: product.created_at,
                inserted_at: Utc::now(),
                quicklook_path: product.quicklook_path.clone(),
                footprint: product.footprint.clone(),
                archived: false,
                archive_path: None,
            },
        );
        Ok(id)
    }

    async fn get_products_to_archive(&self) -> Result<Vec<ProductToArchive>> {
        let store = self.store.lock();

        let max_age_days: i64 = store
            .global_values
            .get("archiver.max_age_days")
            .and_then(|v| v.parse().ok())
            .unwrap_or(90);
        let archive_root = store
            .global_values
            .get("archiver.archive_path")
            .cloned()
            .unwrap_or_else(|| "/mnt/archive".to_string());
        let cutoff = Utc::now() - Duration::days(max_age_days);

        Ok(store
            .products
            .values()
            .filter(|p| !p.archived && p.inserted_at < cutoff)
            .map(|p| ProductToArchive {
                product_id: p.id,
                current_path: p.full_path.clone(),
                archive_path: format!("{}/{}", archive_root, p.name),
            })
            .collect())
    }

    async fn mark_products_archived(&self, products: &[ArchivedProduct]) -> Result<()> {
        let mut store = self.store.lock();

        for archived in products {
            if !store.products.contains_key(&archived.product_id) {
                return Err(CoreError::validation(format!(
                    "unknown product id {}",
                    archived.product_id
                )));
            }
        }

        for archived in products {
            let product = store
                .products
                .get_mut(&archived.product_id)
                .expect("validated above");
            product.archived = true;
            product.archive_path = Some(archived.archive_path.clone());
            product.full_path = archived.archive_path.clone();
        }
        Ok(())
    }

    async fn get_products(
        &self,
        site_id: i64,
        product_type_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Product>> {
        let store = self.store.lock();
        Ok(store
            .products
            .values()
            .filter(|p| {
                p.site_id == site_id
                    && p.product_type_id == product_type_id
                    && p.created_at >= start
                    && p.created_at <= end
            })
            .cloned()
            .collect())
    }

    async fn get_site_tiles(&self, site_id: i64, satellite: Satellite) -> Result<Vec<Tile>> {
        let store = self.store.lock();
        if !store.sites.contains_key(&site_id) {
            return Err(CoreError::validation(format!("unknown site id {site_id}")));
        }

        let mut tiles: Vec<Tile> = store
            .site_tiles
            .iter()
            .filter(|(id, tile)| *id == site_id && tile.satellite == satellite)
            .map(|(_, tile)| tile.clone())
            .collect();
        tiles.sort_by(|a, b| a.tile_id.cmp(&b.tile_id));
        Ok(tiles)
    }

    async fn get_intersecting_tiles(
        &self,
        satellite: Satellite,
        tile_id: &str,
    ) -> Result<Vec<Tile>> {
        let store = self.store.lock();
        let mut tiles: Vec<Tile> = store
            .tile_intersections
            .iter()
            .filter(|(tile, _)| tile.satellite == satellite && tile.tile_id == tile_id)
            .map(|(_, other)| other.clone())
            .collect();
        tiles.sort_by(|a, b| a.tile_id.cmp(&b.tile_id));
        Ok(tiles)
    }

    async fn insert_node_statistics(&self, statistics: &NodeStatistics) -> Result<()> {
        self.store.lock().node_statistics.push(statistics.clone());
        Ok(())
    }
}
