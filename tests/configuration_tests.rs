//! Port contract tests for the configuration store.

mod common;

use common::*;
use geopipe_core::error::CoreError;
use geopipe_core::models::ConfigurationUpdateAction;
use geopipe_core::persistence::PersistencePort;

#[tokio::test]
async fn update_then_read_roundtrip() {
    let persistence = seeded();

    let outcomes = persistence
        .update_configuration_parameters(
            &[ConfigurationUpdateAction::set(
                "executor.wrapper_path",
                "/opt/bin/step-wrapper",
            )],
            true,
        )
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_ok());

    let values = persistence
        .get_configuration_parameters("executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, "/opt/bin/step-wrapper");
}

#[tokio::test]
async fn advanced_keys_are_admin_gated_per_key() {
    let persistence = seeded();

    let outcomes = persistence
        .update_configuration_parameters(
            &[
                ConfigurationUpdateAction::set(ADVANCED_KEY, "16"),
                ConfigurationUpdateAction::set("executor.wrapper_path", "/opt/bin/w"),
            ],
            false,
        )
        .await
        .unwrap();

    // The gated key fails, the plain key in the same batch still applies.
    assert_eq!(outcomes.len(), 2);
    assert!(!outcomes[0].is_ok());
    assert!(outcomes[1].is_ok());

    let advanced = persistence
        .get_configuration_parameters(ADVANCED_KEY)
        .await
        .unwrap();
    assert_eq!(advanced[0].value, "4", "gated value must be unchanged");

    let outcomes = persistence
        .update_configuration_parameters(&[ConfigurationUpdateAction::set(ADVANCED_KEY, "16")], true)
        .await
        .unwrap();
    assert!(outcomes[0].is_ok());
}

#[tokio::test]
async fn unknown_keys_fail_per_key_not_batch_fatal() {
    let persistence = seeded();

    let outcomes = persistence
        .update_configuration_parameters(
            &[
                ConfigurationUpdateAction::set("no.such.key", "x"),
                ConfigurationUpdateAction::set("executor.wrapper_path", "/opt/bin/w"),
            ],
            true,
        )
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].key, "no.such.key");
    assert!(!outcomes[0].is_ok());
    assert!(outcomes[1].is_ok());

    let values = persistence
        .get_configuration_parameters("executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(values[0].value, "/opt/bin/w");
}

#[tokio::test]
async fn deleting_a_value_clears_it() {
    let persistence = seeded();

    let outcomes = persistence
        .update_configuration_parameters(
            &[ConfigurationUpdateAction::delete("executor.wrapper_path")],
            true,
        )
        .await
        .unwrap();
    assert!(outcomes[0].is_ok());

    let values = persistence
        .get_configuration_parameters("executor.wrapper_path")
        .await
        .unwrap();
    assert!(values.is_empty());

    // Metadata survives: the key is still listed in the full snapshot.
    let set = persistence.get_configuration_set().await.unwrap();
    let entry = set.iter().find(|p| p.key == "executor.wrapper_path").unwrap();
    assert_eq!(entry.value, None);
}

#[tokio::test]
async fn job_overrides_shadow_globals_without_mutating_them() {
    let persistence = seeded();
    let (job_id, _) = submit_single_task_job(&persistence, &["warp"]).await;
    let (other_job_id, _) = submit_single_task_job(&persistence, &["warp"]).await;

    let outcomes = persistence
        .update_job_configuration_parameters(
            job_id,
            &[ConfigurationUpdateAction::set(
                "executor.wrapper_path",
                "/job/specific/wrapper",
            )],
        )
        .await
        .unwrap();
    assert!(outcomes[0].is_ok());

    let effective = persistence
        .get_job_configuration_parameters(job_id, "executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(effective[0].value, "/job/specific/wrapper");

    // The other job and the global store still see the default.
    let other = persistence
        .get_job_configuration_parameters(other_job_id, "executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(other[0].value, "/usr/bin/step-wrapper");

    let globals = persistence
        .get_configuration_parameters("executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(globals[0].value, "/usr/bin/step-wrapper");

    // Removing the override falls back to the global value.
    persistence
        .update_job_configuration_parameters(
            job_id,
            &[ConfigurationUpdateAction::delete("executor.wrapper_path")],
        )
        .await
        .unwrap();
    let effective = persistence
        .get_job_configuration_parameters(job_id, "executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(effective[0].value, "/usr/bin/step-wrapper");
}

#[tokio::test]
async fn job_scope_requires_an_existing_job() {
    let persistence = seeded();
    let err = persistence
        .update_job_configuration_parameters(
            999,
            &[ConfigurationUpdateAction::set("executor.wrapper_path", "x")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn submission_applies_configuration_overrides() {
    let persistence = seeded();

    let mut job = job_with_steps(&["warp"]);
    job.configuration = vec![ConfigurationUpdateAction::set(
        "executor.wrapper_path",
        "/submitted/wrapper",
    )];
    let job_id = persistence.submit_job(&job).await.unwrap();

    let effective = persistence
        .get_job_configuration_parameters(job_id, "executor.wrapper_path")
        .await
        .unwrap();
    assert_eq!(effective[0].value, "/submitted/wrapper");
}

#[tokio::test]
async fn configuration_set_is_ordered_by_category_then_key() {
    let persistence = seeded();
    let set = persistence.get_configuration_set().await.unwrap();

    let keys: Vec<(&str, &str)> = set
        .iter()
        .map(|p| (p.category.as_str(), p.key.as_str()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}
