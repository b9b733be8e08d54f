// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore store tests.
//!
//! The emulator tests require the Firestore emulator to be running
//! (FIRESTORE_EMULATOR_HOST); they are skipped otherwise. The offline
//! mock tests always run.

use serde_json::json;
use std::sync::Arc;
use weekly_checkins::db::{
    Condition, FirestoreStore, Item, ItemQuery, ItemStore, ItemUpdate, PutMode, StoreError,
    UpdateOp,
};
use weekly_checkins::error::AppError;
use weekly_checkins::keys::{Index, ItemKey};

mod common;
use common::{test_firestore, TestEnv};

/// Unique partition per test run; the emulator keeps state between runs.
fn unique(prefix: &str) -> String {
    format!("{}#{}", prefix, uuid::Uuid::new_v4())
}

fn item(value: serde_json::Value) -> Item {
    serde_json::from_value(value).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// OFFLINE MOCK
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_offline_store_fails_cleanly() {
    let store = FirestoreStore::new_mock();
    let err = store
        .get(&ItemKey::metadata("ATH#1"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend(_)));
}

#[tokio::test]
async fn test_offline_store_surfaces_as_database_error() {
    let env = TestEnv::with_store(Arc::new(FirestoreStore::new_mock()));
    let err = env.state.athletes.get("a1").await.unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
}

// ═══════════════════════════════════════════════════════════════════════════
// EMULATOR
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_put_get_delete() {
    require_emulator!();

    let store = test_firestore().await;
    let pk = unique("ATH");
    let key = ItemKey::metadata(pk.as_str());

    assert!(store.get(&key).await.unwrap().is_none());

    store
        .put(
            &item(json!({"pk": pk, "sk": "METADATA", "fn": "Ada", "gc": 0})),
            PutMode::Upsert,
        )
        .await
        .unwrap();
    let fetched = store.get(&key).await.unwrap().unwrap();
    assert_eq!(fetched.get_str("fn"), Some("Ada"));

    store.delete(&key).await.unwrap();
    assert!(store.get(&key).await.unwrap().is_none());
    // Deleting again is fine
    store.delete(&key).await.unwrap();
}

#[tokio::test]
async fn test_create_only_rejects_duplicate_event() {
    require_emulator!();

    let store = test_firestore().await;
    let pk = unique("ATH");
    let event = item(json!({"pk": pk, "sk": "CHK#2026-03-11T15:00:00.000Z", "act": "run"}));

    store.put(&event, PutMode::CreateOnly).await.unwrap();
    let err = store.put(&event, PutMode::CreateOnly).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(_)));
}

#[tokio::test]
async fn test_guarded_update_checks_revision() {
    require_emulator!();

    let store = test_firestore().await;
    let pk = unique("ATH");
    let key = ItemKey::metadata(pk.as_str());
    store
        .put(
            &item(json!({"pk": pk, "sk": "METADATA", "gc": 0, "rv": 0, "hc": {}})),
            PutMode::Upsert,
        )
        .await
        .unwrap();

    let update = ItemUpdate::guarded(
        vec![
            UpdateOp::add("gc", 1),
            UpdateOp::add_entry("hc", "h1", 1),
            UpdateOp::add("rv", 1),
        ],
        Condition::equals("rv", 0),
    );
    let updated = store.update(&key, &update).await.unwrap();
    assert_eq!(updated.get("gc"), Some(&json!(1)));
    assert_eq!(updated.get("hc"), Some(&json!({"h1": 1})));

    // Same guard again is stale
    let err = store.update(&key, &update).await.unwrap_err();
    assert!(matches!(err, StoreError::ConditionFailed(_)));

    let missing = ItemKey::metadata(unique("ATH"));
    let err = store
        .update(&missing, &ItemUpdate::new(vec![UpdateOp::add("gc", 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_index_query_orders_and_pages() {
    require_emulator!();

    let store = test_firestore().await;
    let host = unique("HOST");
    for (i, ts) in ["10:00", "11:00", "12:00"].iter().enumerate() {
        store
            .put(
                &item(json!({
                    "pk": format!("ATH#{}", i),
                    "sk": format!("CHK#2026-03-11T{}:00.000Z", ts),
                    "g1pk": host,
                    "g1sk": format!("CHK#2026-03-11T{}:00.000Z", ts),
                })),
                PutMode::Upsert,
            )
            .await
            .unwrap();
    }

    let query = ItemQuery::new(Index::ByOwner, host.as_str())
        .begins_with("CHK#")
        .newest_first()
        .limit(2);
    let first = store.query(&query).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].get_str("g1sk"), Some("CHK#2026-03-11T12:00:00.000Z"));

    let cursor = first[1].get_str("g1sk").map(str::to_string);
    let rest = store.query(&query.clone().start_after(cursor)).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].get_str("g1sk"), Some("CHK#2026-03-11T10:00:00.000Z"));
}

#[tokio::test]
async fn test_check_in_flow_on_firestore() {
    require_emulator!();

    let env = TestEnv::with_store(Arc::new(test_firestore().await));
    let (host, location) = env.host(&unique("Host").replace('#', "-")).await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 1);
    assert_eq!(athlete.host_count(host.id()), 1);

    env.state
        .check_ins
        .delete(athlete.id(), &check_in.timestamp)
        .await
        .unwrap();
    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 0);
    assert_eq!(athlete.host_count(host.id()), 0);
}
