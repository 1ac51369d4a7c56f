//! Postgres store tests against a throwaway container.
//!
//! Run with: cargo test --features integration-tests --test pg_store

use beacon_status::{
    db::{PgStatusStore, migrate, new_pool},
    reading::Attributes,
    status::{OperationalState, StatusRecord},
    store::StatusStore,
};
use chrono::{DateTime, SubsecRound as _, TimeDelta, Utc};
use serde_json::json;
use testcontainers::ContainerAsync;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::postgres::Postgres;

async fn setup_test_db() -> (ContainerAsync<Postgres>, PgStatusStore) {
    let postgres = Postgres::default().start().await.unwrap();
    let host = postgres.get_host().await.unwrap();
    let port = postgres.get_host_port_ipv4(5432).await.unwrap();

    let database_url = format!("postgres://postgres:postgres@{host}:{port}/postgres");
    let pool = new_pool(&database_url, 5).await.expect("Failed to connect");
    migrate(&pool).await.expect("Migrations failed");

    (postgres, PgStatusStore::new(pool))
}

fn record(
    device_id: &str,
    state: OperationalState,
    payload: serde_json::Value,
    observed_at: DateTime<Utc>,
) -> StatusRecord {
    let payload: Attributes = serde_json::from_value(payload).unwrap();
    StatusRecord {
        device_id: device_id.to_string(),
        state,
        payload,
        observed_at: observed_at.trunc_subsecs(6),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_upsert_replaces_without_merging() {
    let (_container, store) = setup_test_db().await;
    let now = Utc::now();

    store
        .upsert(record(
            "AA:BB",
            OperationalState::Running,
            json!({"acceleration": 1500, "battery": 2977}),
            now,
        ))
        .await
        .unwrap();

    let newer = record(
        "AA:BB",
        OperationalState::Idle,
        json!({"temperature": 19.5}),
        now + TimeDelta::seconds(1),
    );
    store.upsert(newer.clone()).await.unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(records, vec![newer]);
    assert!(!records[0].payload.contains_key("battery"));
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_list_all_orders_by_observed_at_desc() {
    let (_container, store) = setup_test_db().await;
    let now = Utc::now();

    for (id, age) in [("old", 10), ("new", 0), ("mid", 5)] {
        store
            .upsert(record(
                id,
                OperationalState::Idle,
                json!({}),
                now - TimeDelta::minutes(age),
            ))
            .await
            .unwrap();
    }

    let ids: Vec<String> = store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.device_id)
        .collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_clear_returns_removed_count() {
    let (_container, store) = setup_test_db().await;
    let now = Utc::now();

    for id in ["AA:01", "AA:02", "AA:03"] {
        store
            .upsert(record(id, OperationalState::Running, json!({}), now))
            .await
            .unwrap();
    }

    assert_eq!(store.clear().await.unwrap(), 3);
    assert!(store.list_all().await.unwrap().is_empty());
    assert_eq!(store.clear().await.unwrap(), 0);
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_payload_round_trips_verbatim() {
    let (_container, store) = setup_test_db().await;

    let stored = record(
        "AA:BB",
        OperationalState::Idle,
        json!({"z_last": 1, "a_first": 2, "name": "nul\u{0}byte", "nested": {"x": [1, 2]}}),
        Utc::now(),
    );
    store.upsert(stored.clone()).await.unwrap();

    let records = store.list_all().await.unwrap();
    assert_eq!(records, vec![stored]);
    let keys: Vec<&str> = records[0].payload.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z_last", "a_first", "name", "nested"]);
}
