// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in engine scenarios against the in-memory store.
//!
//! These tests verify that:
//! 1. The weekly counter moves once per week, whatever the number of hosts
//! 2. Undo mirrors create
//! 3. Preconditions fail before anything is written

use chrono::Duration;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use weekly_checkins::db::UpdateOp;
use weekly_checkins::error::AppError;
use weekly_checkins::models::{fields, WeekState};
use weekly_checkins::time_utils::parse_timestamp;

mod common;
use common::{FlakyStore, TestEnv};

#[tokio::test]
async fn test_first_check_in_of_week_counts_the_week() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    assert_eq!(check_in.activity_id, run.id());

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 1);
    assert_eq!(athlete.host_count(host.id()), 1);

    let week = env
        .state
        .check_ins
        .week_state(athlete.id(), host.id())
        .await
        .unwrap();
    assert!(matches!(
        week,
        WeekState::CheckedInThisWeek { activity_id, .. } if activity_id == run.id()
    ));
}

#[tokio::test]
async fn test_second_host_same_week_does_not_count_again() {
    let env = TestEnv::new();
    let (north, north_loc) = env.host("Northside").await;
    let (south, south_loc) = env.host("Southside").await;
    let run = env.offered(&north, &north_loc, "Run").await;
    let bike = env.activity("Bike").await;
    env.state
        .hosts
        .assign_activity(south.id(), south_loc.id(), bike.id())
        .await
        .unwrap();

    let athlete = env.member(&north, "Ada", "Lovelace").await;
    env.state
        .disclaimers
        .sign(athlete.id(), south.id())
        .await
        .unwrap();

    env.state
        .check_ins
        .create(athlete.id(), north.id(), north_loc.id(), run.id())
        .await
        .unwrap();
    env.tick();
    env.state
        .check_ins
        .create(athlete.id(), south.id(), south_loc.id(), bike.id())
        .await
        .unwrap();

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 1, "one week, however many hosts");
    assert_eq!(athlete.host_count(north.id()), 1);
    assert_eq!(athlete.host_count(south.id()), 1);
}

#[tokio::test]
async fn test_next_week_counts_again() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    env.clock.advance(Duration::days(7));
    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 2);
    assert_eq!(athlete.host_count(host.id()), 2);
}

#[tokio::test]
async fn test_week_boundary_is_monday() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();

    // Sunday night is still the same week
    env.clock.advance(Duration::days(4) + Duration::hours(8));
    let err = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AlreadyCheckedIn { .. }));

    // Monday morning is not
    env.clock.advance(Duration::hours(1));
    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_already_checked_in_this_week() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    env.tick();
    let err = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::AlreadyCheckedIn { ref activity_id, .. } if activity_id == run.id()
    ));

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.host_count(host.id()), 1);
    let records = env
        .state
        .check_ins
        .list_for_athlete(athlete.id())
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_unsigned_disclaimer_blocks_check_in() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.athlete("Ada", "Lovelace").await;

    let err = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DisclaimerRequired { .. }));
    assert!(err.is_precondition());

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 0);
    assert!(athlete.last_week.is_empty());
    assert!(env
        .state
        .check_ins
        .list_for_athlete(athlete.id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_activity_must_be_offered_at_location() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    env.offered(&host, &location, "Run").await;
    let swim = env.activity("Swim").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let err = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), swim.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_location_of_another_host_is_not_found() {
    let env = TestEnv::new();
    let (north, _) = env.host("Northside").await;
    let (south, south_loc) = env.host("Southside").await;
    let run = env.offered(&south, &south_loc, "Run").await;
    let athlete = env.member(&north, "Ada", "Lovelace").await;

    let err = env
        .state
        .check_ins
        .create(athlete.id(), north.id(), south_loc.id(), run.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_undo_restores_counters() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    env.state
        .check_ins
        .delete(athlete.id(), &check_in.timestamp)
        .await
        .unwrap();

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 0);
    assert_eq!(athlete.host_count(host.id()), 0);
    assert!(athlete.last_week.get(host.id()).is_none());
    assert_eq!(
        env.state
            .check_ins
            .week_state(athlete.id(), host.id())
            .await
            .unwrap(),
        WeekState::Eligible
    );

    // Eligible again the same week
    env.tick();
    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    assert_eq!(env.reload(&athlete).await.global_count, 1);
}

#[tokio::test]
async fn test_undo_keeps_week_while_another_host_is_active() {
    let env = TestEnv::new();
    let (north, north_loc) = env.host("Northside").await;
    let (south, south_loc) = env.host("Southside").await;
    let run = env.offered(&north, &north_loc, "Run").await;
    env.state
        .hosts
        .assign_activity(south.id(), south_loc.id(), run.id())
        .await
        .unwrap();
    let athlete = env.member(&north, "Ada", "Lovelace").await;
    env.state
        .disclaimers
        .sign(athlete.id(), south.id())
        .await
        .unwrap();

    let first = env
        .state
        .check_ins
        .create(athlete.id(), north.id(), north_loc.id(), run.id())
        .await
        .unwrap();
    env.tick();
    env.state
        .check_ins
        .create(athlete.id(), south.id(), south_loc.id(), run.id())
        .await
        .unwrap();

    env.state
        .check_ins
        .delete(athlete.id(), &first.timestamp)
        .await
        .unwrap();

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 1);
    assert_eq!(athlete.host_count(north.id()), 0);
    assert_eq!(athlete.host_count(south.id()), 1);
}

#[tokio::test]
async fn test_undo_of_past_week_keeps_week_count() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let old = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    env.clock.advance(Duration::days(7));
    env.state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();

    env.state
        .check_ins
        .delete(athlete.id(), &old.timestamp)
        .await
        .unwrap();

    let athlete = env.reload(&athlete).await;
    assert_eq!(athlete.global_count, 2);
    assert_eq!(athlete.host_count(host.id()), 1);
    assert!(matches!(
        athlete.marker(host.id()).unwrap(),
        Some(marker) if marker.timestamp > parse_timestamp(&old.timestamp).unwrap()
    ));
}

#[tokio::test]
async fn test_undo_missing_check_in_is_not_found() {
    let env = TestEnv::new();
    let (host, _) = env.host("Northside").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let err = env
        .state
        .check_ins
        .delete(athlete.id(), "2026-03-11T15:00:00.000Z")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = env
        .state
        .check_ins
        .delete(athlete.id(), "yesterday")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_update_changes_activity_this_week() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let bike = env.offered(&host, &location, "Bike").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    env.tick();

    let updated = env
        .state
        .check_ins
        .update(athlete.id(), host.id(), &check_in.timestamp, bike.id())
        .await
        .unwrap();
    assert_eq!(updated.activity_id, bike.id());
    assert_eq!(updated.timestamp, check_in.timestamp);

    let athlete = env.reload(&athlete).await;
    let marker = athlete.marker(host.id()).unwrap().unwrap();
    assert_eq!(marker.activity_id, bike.id());
    assert_eq!(athlete.global_count, 1);
    assert_eq!(athlete.host_count(host.id()), 1);
}

#[tokio::test]
async fn test_update_last_week_is_rejected() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let bike = env.offered(&host, &location, "Bike").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();
    env.clock.advance(Duration::days(7));

    let err = env
        .state
        .check_ins
        .update(athlete.id(), host.id(), &check_in.timestamp, bike.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotCurrentWeek(_)));

    let records = env
        .state
        .check_ins
        .list_for_athlete(athlete.id())
        .await
        .unwrap();
    assert_eq!(records[0].activity_id, run.id());
}

#[tokio::test]
async fn test_deleted_athlete_cannot_check_in() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    env.state.athletes.soft_delete(athlete.id()).await.unwrap();

    let err = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Still resolvable for history
    assert!(env.reload(&athlete).await.deleted);
}

#[tokio::test]
async fn test_recount_repairs_host_counter() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;

    for _ in 0..3 {
        env.state
            .check_ins
            .create(athlete.id(), host.id(), location.id(), run.id())
            .await
            .unwrap();
        env.clock.advance(Duration::days(7));
    }

    // Simulate drift by zeroing the counter behind the engine's back
    env.state
        .repos
        .athletes
        .mutate(athlete.id(), |_| {
            Ok(vec![UpdateOp::set(
                fields::HOST_COUNTS,
                serde_json::json!({}),
            )])
        })
        .await
        .unwrap();
    assert_eq!(env.reload(&athlete).await.host_count(host.id()), 0);

    let repaired = env.state.check_ins.recount_athlete(athlete.id()).await.unwrap();
    assert_eq!(repaired.host_count(host.id()), 3);
    assert_eq!(repaired.global_count, 3);
}

#[tokio::test]
async fn test_pet_check_in_needs_owner_and_disclaimer() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let owner = env.member(&host, "Ada", "Lovelace").await;
    let stranger = env.member(&host, "Alan", "Turing").await;
    let pet = env.state.athletes.add_pet(owner.id(), "Rex").await.unwrap();

    let err = env
        .state
        .check_ins
        .create_pet_check_in(stranger.id(), pet.id(), host.id(), location.id())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let pet_check_in = env
        .state
        .check_ins
        .create_pet_check_in(owner.id(), pet.id(), host.id(), location.id())
        .await
        .unwrap();
    assert_eq!(pet_check_in.pet_id, pet.id());

    // Companion visits leave the athlete's counters alone
    let owner = env.reload(&owner).await;
    assert_eq!(owner.global_count, 0);
    assert!(owner.host_counts.is_empty());

    env.state
        .check_ins
        .delete_pet_check_in(pet.id(), &pet_check_in.timestamp)
        .await
        .unwrap();
    let progress = env.state.rewards.pet_reward_progress(pet.id()).await.unwrap();
    assert!(progress.is_empty());
}

#[tokio::test]
async fn test_list_for_host_is_newest_first_and_paged() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;

    let mut timestamps = Vec::new();
    for (first, last) in [("Ada", "Lovelace"), ("Alan", "Turing"), ("Grace", "Hopper")] {
        let athlete = env.member(&host, first, last).await;
        let check_in = env
            .state
            .check_ins
            .create(athlete.id(), host.id(), location.id(), run.id())
            .await
            .unwrap();
        timestamps.push(check_in.timestamp);
        env.tick();
    }

    let page = env
        .state
        .check_ins
        .list_for_host(host.id(), Some(2), None)
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].timestamp, timestamps[2]);
    assert_eq!(page.items[1].timestamp, timestamps[1]);

    let rest = env
        .state
        .check_ins
        .list_for_host(host.id(), Some(2), page.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].timestamp, timestamps[0]);
    assert!(rest.next_cursor.is_none());

    let today = env
        .state
        .check_ins
        .list_on_date(common::wednesday().date_naive())
        .await
        .unwrap();
    assert_eq!(today.len(), 3);
}

#[tokio::test]
async fn test_same_millisecond_check_ins_page_separately() {
    let env = TestEnv::new();
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let ada = env.member(&host, "Ada", "Lovelace").await;
    let alan = env.member(&host, "Alan", "Turing").await;

    // No tick: both events share a timestamp
    for athlete in [&ada, &alan] {
        env.state
            .check_ins
            .create(athlete.id(), host.id(), location.id(), run.id())
            .await
            .unwrap();
    }

    let first = env
        .state
        .check_ins
        .list_for_host(host.id(), Some(1), None)
        .await
        .unwrap();
    assert_eq!(first.items.len(), 1);
    let second = env
        .state
        .check_ins
        .list_for_host(host.id(), Some(1), first.next_cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(second.items.len(), 1);

    let mut seen = vec![
        first.items[0].athlete_id.clone(),
        second.items[0].athlete_id.clone(),
    ];
    seen.sort();
    let mut expected = vec![ada.id().to_string(), alan.id().to_string()];
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_failed_record_delete_leaves_athlete_untouched() {
    let store = Arc::new(FlakyStore::new());
    let env = TestEnv::with_store(store.clone());
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;
    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();

    store.fail_deletes.store(true, Ordering::SeqCst);
    let err = env
        .state
        .check_ins
        .delete(athlete.id(), &check_in.timestamp)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));

    let unchanged = env.reload(&athlete).await;
    assert_eq!(unchanged.global_count, 1);
    assert_eq!(unchanged.host_count(host.id()), 1);
    assert!(unchanged.last_week.contains_key(host.id()));

    // Retry once storage recovers: counters drop exactly once
    store.fail_deletes.store(false, Ordering::SeqCst);
    env.state
        .check_ins
        .delete(athlete.id(), &check_in.timestamp)
        .await
        .unwrap();
    let undone = env.reload(&athlete).await;
    assert_eq!(undone.global_count, 0);
    assert_eq!(undone.host_count(host.id()), 0);
}

#[tokio::test]
async fn test_failed_athlete_update_restores_record() {
    let store = Arc::new(FlakyStore::new());
    let env = TestEnv::with_store(store.clone());
    let (host, location) = env.host("Northside").await;
    let run = env.offered(&host, &location, "Run").await;
    let athlete = env.member(&host, "Ada", "Lovelace").await;
    let check_in = env
        .state
        .check_ins
        .create(athlete.id(), host.id(), location.id(), run.id())
        .await
        .unwrap();

    store.fail_updates.store(true, Ordering::SeqCst);
    let err = env
        .state
        .check_ins
        .delete(athlete.id(), &check_in.timestamp)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Database(_)));
    store.fail_updates.store(false, Ordering::SeqCst);

    let restored = env
        .state
        .repos
        .check_ins
        .get(athlete.id(), &check_in.timestamp)
        .await
        .unwrap();
    assert_eq!(restored, Some(check_in.clone()));
    assert_eq!(env.reload(&athlete).await.host_count(host.id()), 1);

    env.state
        .check_ins
        .delete(athlete.id(), &check_in.timestamp)
        .await
        .unwrap();
    assert_eq!(env.reload(&athlete).await.host_count(host.id()), 0);
}
