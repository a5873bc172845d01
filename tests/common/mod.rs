//! Shared fixtures for the port contract tests: a seeded in-memory backend
//! plus builders for the entities most tests need.

#![allow(dead_code)]

use geopipe_core::models::{
    ConfigurationParameterInfo, ExecutionStatistics, NewJob, NewJobStep, NewJobTask, Processor,
    Site, StartType,
};
use geopipe_core::persistence::{InMemoryPersistence, PersistencePort};
use geopipe_core::state_machine::ExecutionStatus;

pub const PROCESSOR_ID: i64 = 1;
pub const SITE_ID: i64 = 1;

/// Admin-only parameter used by the gating tests.
pub const ADVANCED_KEY: &str = "executor.max_parallel_steps";

/// An in-memory backend with the catalog entries job submission validates
/// against.
pub fn seeded() -> InMemoryPersistence {
    let persistence = InMemoryPersistence::new();

    persistence.register_processor(Processor {
        id: PROCESSOR_ID,
        name: "Composite Builder".to_string(),
        short_name: "composite".to_string(),
        description: None,
    });
    persistence.register_site(Site {
        id: SITE_ID,
        name: "South Field".to_string(),
        short_name: "south_field".to_string(),
        enabled: true,
    });

    persistence.register_parameter(parameter(
        "executor.wrapper_path",
        "general",
        Some("/usr/bin/step-wrapper"),
        false,
    ));
    persistence.register_parameter(parameter(ADVANCED_KEY, "general", Some("4"), true));
    persistence.register_parameter(parameter(
        "archiver.max_age_days",
        "archiver",
        Some("90"),
        false,
    ));
    persistence.register_parameter(parameter(
        "archiver.archive_path",
        "archiver",
        Some("/mnt/archive"),
        false,
    ));

    persistence
}

pub fn parameter(
    key: &str,
    category: &str,
    value: Option<&str>,
    is_advanced: bool,
) -> ConfigurationParameterInfo {
    ConfigurationParameterInfo {
        key: key.to_string(),
        category: category.to_string(),
        friendly_name: key.replace('.', " "),
        data_type: "string".to_string(),
        value: value.map(str::to_string),
        is_advanced,
    }
}

/// A job with one "composite" task carrying the given steps.
pub fn job_with_steps(step_names: &[&str]) -> NewJob {
    NewJob {
        name: "composite south_field".to_string(),
        description: None,
        processor_id: PROCESSOR_ID,
        site_id: SITE_ID,
        start_type: StartType::Requested,
        parameters: serde_json::json!({ "resolution": 10 }),
        configuration: Vec::new(),
        tasks: vec![NewJobTask {
            module_short_name: "composite".to_string(),
            parameters: None,
            steps: step_names
                .iter()
                .map(|name| NewJobStep {
                    name: (*name).to_string(),
                    parameters: None,
                })
                .collect(),
        }],
    }
}

pub fn stats(node: &str) -> ExecutionStatistics {
    ExecutionStatistics {
        node: node.to_string(),
        exit_code: 0,
        user_cpu_ms: 1_200,
        system_cpu_ms: 300,
        duration_ms: 1_500,
        max_rss_kb: 65_536,
        max_vm_size_kb: 131_072,
        disk_read_bytes: 1 << 20,
        disk_write_bytes: 1 << 18,
        stdout_text: format!("step ran on {node}"),
        stderr_text: String::new(),
    }
}

/// Submit a job and return `(job_id, task_id)` of its single task.
pub async fn submit_single_task_job(
    persistence: &InMemoryPersistence,
    step_names: &[&str],
) -> (i64, i64) {
    let job_id = persistence
        .submit_job(&job_with_steps(step_names))
        .await
        .expect("job submission");
    let task_ids = persistence
        .get_job_tasks_by_status(job_id, &[ExecutionStatus::PendingStart])
        .await
        .expect("task lookup");
    assert_eq!(task_ids.len(), 1);
    (job_id, task_ids[0])
}
