//! Port contract tests for the event inbox, the scheduled task registry and
//! the catalog boundary.

mod common;

use chrono::{Duration, Utc};
use common::*;
use geopipe_core::error::CoreError;
use geopipe_core::models::{
    ArchivedProduct, ConfigurationUpdateAction, EventType, NewProduct, NewScheduledTask,
    RepeatType, Satellite, ScheduledTaskStatus, ScheduledTaskStatusUpdate, SerializedEvent, Tile,
};
use geopipe_core::models::NodeStatistics;
use geopipe_core::persistence::PersistencePort;

fn event(label: &str) -> SerializedEvent {
    SerializedEvent::new(
        EventType::ProductAvailable,
        serde_json::json!({ "product": label }),
    )
}

#[tokio::test]
async fn events_are_returned_in_insertion_order() {
    let persistence = seeded();

    for label in ["e1", "e2", "e3"] {
        persistence.insert_event(&event(label)).await.unwrap();
    }

    let events = persistence.get_new_events().await.unwrap();
    let labels: Vec<&str> = events
        .iter()
        .map(|e| e.payload["product"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["e1", "e2", "e3"]);
}

#[tokio::test]
async fn claimed_events_leave_the_inbox() {
    let persistence = seeded();
    persistence.insert_event(&event("e1")).await.unwrap();
    persistence.insert_event(&event("e2")).await.unwrap();

    let events = persistence.get_new_events().await.unwrap();
    persistence
        .mark_event_processing_started(events[0].id)
        .await
        .unwrap();

    let remaining = persistence.get_new_events().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, events[1].id);

    persistence
        .mark_event_processing_complete(events[0].id)
        .await
        .unwrap();
}

#[tokio::test]
async fn claiming_an_unknown_event_is_a_validation_failure() {
    let persistence = seeded();
    let err = persistence
        .mark_event_processing_started(42)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn claim_is_advisory_until_taken() {
    let persistence = seeded();
    persistence.insert_event(&event("e1")).await.unwrap();

    // Two consumers polling before either claims both observe the event;
    // at-least-once delivery is the contract.
    let first_poll = persistence.get_new_events().await.unwrap();
    let second_poll = persistence.get_new_events().await.unwrap();
    assert_eq!(first_poll, second_poll);
}

fn nightly_composite() -> NewScheduledTask {
    NewScheduledTask {
        name: "nightly composite".to_string(),
        processor_id: PROCESSOR_ID,
        site_id: SITE_ID,
        parameters: Some(serde_json::json!({ "resolution": 10 })),
        repeat_type: RepeatType::Cyclic,
        repeat_after_days: 1,
        repeat_on_month_day: 0,
        first_run_time: Utc::now(),
        retry_seconds: 600,
        priority: 5,
    }
}

#[tokio::test]
async fn scheduled_task_registry_roundtrip() {
    let persistence = seeded();

    let id = persistence
        .insert_scheduled_task(&nightly_composite())
        .await
        .unwrap();

    let tasks = persistence.get_scheduled_tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, id);
    assert_eq!(tasks[0].status, ScheduledTaskStatus::default());

    let ran_at = Utc::now();
    persistence
        .update_scheduled_tasks_status(&[ScheduledTaskStatusUpdate {
            id,
            status: ScheduledTaskStatus {
                last_scheduled_run: Some(ran_at),
                last_run_timestamp: Some(ran_at),
                last_retry_timestamp: None,
                estimated_next_run: Some(ran_at + Duration::days(1)),
            },
        }])
        .await
        .unwrap();

    let tasks = persistence.get_scheduled_tasks().await.unwrap();
    assert_eq!(tasks[0].status.last_run_timestamp, Some(ran_at));
}

#[tokio::test]
async fn duplicate_scheduled_task_names_are_rejected() {
    let persistence = seeded();
    persistence
        .insert_scheduled_task(&nightly_composite())
        .await
        .unwrap();
    let err = persistence
        .insert_scheduled_task(&nightly_composite())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Operation { .. }));
}

#[tokio::test]
async fn status_write_back_rejects_unknown_ids_without_partial_writes() {
    let persistence = seeded();
    let id = persistence
        .insert_scheduled_task(&nightly_composite())
        .await
        .unwrap();

    let err = persistence
        .update_scheduled_tasks_status(&[
            ScheduledTaskStatusUpdate {
                id,
                status: ScheduledTaskStatus {
                    last_run_timestamp: Some(Utc::now()),
                    ..Default::default()
                },
            },
            ScheduledTaskStatusUpdate {
                id: 999,
                status: ScheduledTaskStatus::default(),
            },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    let tasks = persistence.get_scheduled_tasks().await.unwrap();
    assert_eq!(
        tasks[0].status.last_run_timestamp, None,
        "failed batch must not leave partial writes"
    );
}

fn product(name: &str) -> NewProduct {
    NewProduct {
        product_type_id: 1,
        processor_id: PROCESSOR_ID,
        site_id: SITE_ID,
        job_id: None,
        name: name.to_string(),
        full_path: format!("/mnt/products/{name}"),
        created_at: Utc::now(),
        quicklook_path: None,
        footprint: Some("POLYGON((0 0,1 0,1 1,0 1,0 0))".to_string()),
    }
}

#[tokio::test]
async fn product_insert_and_window_query() {
    let persistence = seeded();
    persistence.insert_product(&product("l3a_20260801")).await.unwrap();

    let now = Utc::now();
    let found = persistence
        .get_products(SITE_ID, 1, now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "l3a_20260801");

    let outside = persistence
        .get_products(SITE_ID, 1, now - Duration::days(9), now - Duration::days(8))
        .await
        .unwrap();
    assert!(outside.is_empty());

    let err = persistence
        .insert_product(&product("l3a_20260801"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Operation { .. }));
}

#[tokio::test]
async fn archive_flow_respects_retention_configuration() {
    let persistence = seeded();
    persistence.insert_product(&product("l3a_old")).await.unwrap();

    // Nothing is old enough under the default 90-day retention.
    assert!(persistence.get_products_to_archive().await.unwrap().is_empty());

    persistence
        .update_configuration_parameters(
            &[ConfigurationUpdateAction::set("archiver.max_age_days", "0")],
            true,
        )
        .await
        .unwrap();

    let to_archive = persistence.get_products_to_archive().await.unwrap();
    assert_eq!(to_archive.len(), 1);
    assert_eq!(to_archive[0].archive_path, "/mnt/archive/l3a_old");

    persistence
        .mark_products_archived(&[ArchivedProduct {
            product_id: to_archive[0].product_id,
            archive_path: to_archive[0].archive_path.clone(),
        }])
        .await
        .unwrap();

    assert!(persistence.get_products_to_archive().await.unwrap().is_empty());

    let now = Utc::now();
    let products = persistence
        .get_products(SITE_ID, 1, now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap();
    assert!(products[0].archived);
    assert_eq!(products[0].full_path, "/mnt/archive/l3a_old");
}

#[tokio::test]
async fn site_and_intersecting_tile_lookups() {
    let persistence = seeded();

    persistence.register_site_tile(
        SITE_ID,
        Tile {
            satellite: Satellite::Sentinel2,
            tile_id: "T35TNK".to_string(),
        },
    );
    persistence.register_site_tile(
        SITE_ID,
        Tile {
            satellite: Satellite::Landsat8,
            tile_id: "183029".to_string(),
        },
    );
    persistence.register_tile_intersection(
        Tile {
            satellite: Satellite::Sentinel2,
            tile_id: "T35TNK".to_string(),
        },
        Tile {
            satellite: Satellite::Landsat8,
            tile_id: "183029".to_string(),
        },
    );

    let s2_tiles = persistence
        .get_site_tiles(SITE_ID, Satellite::Sentinel2)
        .await
        .unwrap();
    assert_eq!(s2_tiles.len(), 1);
    assert_eq!(s2_tiles[0].tile_id, "T35TNK");

    let intersecting = persistence
        .get_intersecting_tiles(Satellite::Sentinel2, "T35TNK")
        .await
        .unwrap();
    assert_eq!(intersecting.len(), 1);
    assert_eq!(intersecting[0].satellite, Satellite::Landsat8);
    assert_eq!(intersecting[0].tile_id, "183029");
}

#[tokio::test]
async fn node_statistics_are_accepted() {
    let persistence = seeded();
    persistence
        .insert_node_statistics(&NodeStatistics {
            node_name: "proc-node-01".to_string(),
            cpu_user_pct: 42.5,
            cpu_system_pct: 7.1,
            mem_total_kb: 16 * 1024 * 1024,
            mem_used_kb: 9 * 1024 * 1024,
            swap_total_kb: 4 * 1024 * 1024,
            swap_used_kb: 0,
            load_avg_1m: 3.2,
            load_avg_5m: 2.8,
            load_avg_15m: 2.1,
            disk_total_bytes: 2_000_000_000_000,
            disk_used_bytes: 1_200_000_000_000,
            sampled_at: Utc::now(),
        })
        .await
        .unwrap();
}
