// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use weekly_checkins::config::Config;
use weekly_checkins::db::{
    FirestoreStore, Item, ItemQuery, ItemStore, ItemUpdate, MemoryStore, PutMode, StoreError,
};
use weekly_checkins::keys::ItemKey;
use weekly_checkins::middleware::auth::{create_jwt, HOSTS_GROUP, SUPER_ADMINS_GROUP};
use weekly_checkins::models::{Activity, Athlete, Host, Location, NewAthlete};
use weekly_checkins::routes::create_router;
use weekly_checkins::services::HostRegistration;
use weekly_checkins::time_utils::FixedClock;
use weekly_checkins::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a store connected to the Firestore emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreStore {
    FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Wednesday afternoon, mid ISO week 11 of 2026.
#[allow(dead_code)]
pub fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 11, 15, 0, 0).unwrap()
}

/// In-memory store whose updates and deletes can be made to fail.
#[allow(dead_code)]
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_updates: AtomicBool,
    pub fail_deletes: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn unavailable(&self, flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, item: &Item, mode: PutMode) -> Result<(), StoreError> {
        self.inner.put(item, mode).await
    }

    async fn update(&self, key: &ItemKey, update: &ItemUpdate) -> Result<Item, StoreError> {
        self.unavailable(&self.fail_updates)?;
        self.inner.update(key, update).await
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
        self.unavailable(&self.fail_deletes)?;
        self.inner.delete(key).await
    }

    async fn query(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError> {
        self.inner.query(query).await
    }
}

/// App state over an in-memory store with a settable clock.
pub struct TestEnv {
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
}

#[allow(dead_code)]
impl TestEnv {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn ItemStore>) -> Self {
        let clock = Arc::new(FixedClock::new(wednesday()));
        let state = AppState::new(Config::test_default(), store, clock.clone())
            .expect("test config is valid");
        Self {
            state: Arc::new(state),
            clock,
        }
    }

    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    /// Move the clock forward; check-in keys are unique per millisecond.
    pub fn tick(&self) {
        self.clock.advance(Duration::minutes(1));
    }

    /// A host with one location.
    pub async fn host(&self, name: &str) -> (Host, Location) {
        let host = self
            .state
            .hosts
            .create_host(HostRegistration {
                name: name.to_string(),
                email: format!("{}@example.org", name.to_lowercase()),
                identity_ref: None,
                passphrase: "correct horse".to_string(),
                disclaimer: format!("I ride at {} at my own risk.", name),
            })
            .await
            .expect("create host");
        let location = self
            .state
            .hosts
            .create_location(host.id(), "Main", "1 Trail Rd")
            .await
            .expect("create location");
        (host, location)
    }

    pub async fn activity(&self, name: &str) -> Activity {
        self.state
            .hosts
            .create_activity(name, "")
            .await
            .expect("create activity")
    }

    /// Activity offered at `location`.
    pub async fn offered(&self, host: &Host, location: &Location, name: &str) -> Activity {
        let activity = self.activity(name).await;
        self.state
            .hosts
            .assign_activity(host.id(), location.id(), activity.id())
            .await
            .expect("assign activity");
        activity
    }

    pub async fn athlete(&self, first: &str, last: &str) -> Athlete {
        self.state
            .athletes
            .register(NewAthlete {
                first_name: first.to_string(),
                last_name: last.to_string(),
                email: None,
                emergency_contact_name: None,
                emergency_contact_phone: None,
            })
            .await
            .expect("register athlete")
    }

    /// Athlete who has signed `host`'s disclaimer.
    pub async fn member(&self, host: &Host, first: &str, last: &str) -> Athlete {
        let athlete = self.athlete(first, last).await;
        self.state
            .disclaimers
            .sign(athlete.id(), host.id())
            .await
            .expect("sign disclaimer")
    }

    pub async fn reload(&self, athlete: &Athlete) -> Athlete {
        self.state
            .athletes
            .get(athlete.id())
            .await
            .expect("get athlete")
            .expect("athlete exists")
    }

    pub fn host_token(&self, host: &Host) -> String {
        create_jwt(
            "staff@example.org",
            &[HOSTS_GROUP],
            Some(host.id()),
            &self.state.config.jwt_signing_key,
        )
        .expect("create jwt")
    }

    pub fn admin_token(&self) -> String {
        create_jwt(
            "root@example.org",
            &[SUPER_ADMINS_GROUP],
            None,
            &self.state.config.jwt_signing_key,
        )
        .expect("create jwt")
    }
}
