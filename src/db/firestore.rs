// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed item store.
//!
//! Every item is one document in the `items` collection, addressed by the
//! url-encoded `pk|sk`. Index attributes are plain fields; each index needs
//! a composite Firestore index on (partition attr, sort attr).

use async_trait::async_trait;
use firestore::FirestoreQueryDirection;

use crate::db::collections;
use crate::db::{Item, ItemQuery, ItemStore, ItemUpdate, PutMode, SortCondition, StoreError};
use crate::keys::ItemKey;

/// Highest code point, used to turn a prefix into a range upper bound.
const PREFIX_UPPER_BOUND: char = '\u{f8ff}';

/// Firestore item store.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, StoreError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, StoreError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, StoreError> {
        self.client
            .as_ref()
            .ok_or_else(|| StoreError::Backend("Database not connected (offline mode)".to_string()))
    }

    async fn read(&self, doc_id: &str) -> Result<Option<Item>, StoreError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::ITEMS)
            .obj()
            .one(doc_id)
            .await
            .map_err(map_firestore_error)
    }
}

fn map_firestore_error(e: firestore::errors::FirestoreError) -> StoreError {
    match e {
        firestore::errors::FirestoreError::DataConflictError(conflict) => {
            StoreError::AlreadyExists(conflict.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl ItemStore for FirestoreStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        self.read(&key.doc_id()).await
    }

    async fn put(&self, item: &Item, mode: PutMode) -> Result<(), StoreError> {
        let key = item
            .key()
            .ok_or_else(|| StoreError::InvalidUpdate("item has no pk/sk".to_string()))?;
        let client = self.get_client()?;

        match mode {
            PutMode::Upsert => {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::ITEMS)
                    .document_id(key.doc_id())
                    .object(item)
                    .execute()
                    .await
                    .map_err(map_firestore_error)?;
            }
            PutMode::CreateOnly => {
                let _: () = client
                    .fluent()
                    .insert()
                    .into(collections::ITEMS)
                    .document_id(key.doc_id())
                    .object(item)
                    .execute()
                    .await
                    .map_err(|e| match map_firestore_error(e) {
                        StoreError::AlreadyExists(_) => StoreError::AlreadyExists(key.to_string()),
                        other => other,
                    })?;
            }
        }
        Ok(())
    }

    /// Read, check the guard and write back inside one transaction.
    async fn update(&self, key: &ItemKey, update: &ItemUpdate) -> Result<Item, StoreError> {
        let client = self.get_client()?;
        let doc_id = key.doc_id();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to begin transaction: {}", e)))?;

        let Some(mut item) = self.read(&doc_id).await? else {
            let _ = transaction.rollback().await;
            return Err(StoreError::NotFound(key.to_string()));
        };

        if let Some(condition) = &update.condition {
            if !item.satisfies(condition) {
                let _ = transaction.rollback().await;
                return Err(StoreError::ConditionFailed(key.to_string()));
            }
        }

        if let Err(e) = item.apply(&update.ops) {
            let _ = transaction.rollback().await;
            return Err(e);
        }

        client
            .fluent()
            .update()
            .in_col(collections::ITEMS)
            .document_id(&doc_id)
            .object(&item)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                StoreError::Backend(format!("Failed to add update to transaction: {}", e))
            })?;

        transaction.commit().await.map_err(|e| {
            StoreError::ConditionFailed(format!("{} (commit failed: {})", key, e))
        })?;

        Ok(item)
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::ITEMS)
            .document_id(key.doc_id())
            .execute()
            .await
            .map_err(map_firestore_error)?;
        Ok(())
    }

    async fn query(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError> {
        let partition_attr = query.index.partition_attr();
        let sort_attr = query.index.sort_attr();
        let partition = query.partition.clone();

        let (lower, upper_exclusive, upper_inclusive) = match &query.sort {
            Some(SortCondition::BeginsWith(prefix)) => (
                Some(prefix.clone()),
                Some(format!("{}{}", prefix, PREFIX_UPPER_BOUND)),
                None,
            ),
            Some(SortCondition::Between(low, high)) => {
                (Some(low.clone()), None, Some(high.clone()))
            }
            None => (None, None, None),
        };
        let (after, before) = match (&query.start_after, query.descending) {
            (Some(cursor), false) => (Some(cursor.clone()), None),
            (Some(cursor), true) => (None, Some(cursor.clone())),
            (None, _) => (None, None),
        };

        let direction = if query.descending {
            FirestoreQueryDirection::Descending
        } else {
            FirestoreQueryDirection::Ascending
        };

        let builder = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ITEMS)
            .filter(move |q| {
                q.for_all([
                    q.field(partition_attr).eq(partition.clone()),
                    lower
                        .clone()
                        .and_then(|v| q.field(sort_attr).greater_than_or_equal(v)),
                    upper_exclusive
                        .clone()
                        .and_then(|v| q.field(sort_attr).less_than(v)),
                    upper_inclusive
                        .clone()
                        .and_then(|v| q.field(sort_attr).less_than_or_equal(v)),
                    after.clone().and_then(|v| q.field(sort_attr).greater_than(v)),
                    before.clone().and_then(|v| q.field(sort_attr).less_than(v)),
                ])
            })
            .order_by([(sort_attr, direction)]);

        let builder = match query.limit {
            Some(limit) => builder.limit(limit as u32),
            None => builder,
        };

        builder
            .obj()
            .query()
            .await
            .map_err(map_firestore_error)
    }
}
