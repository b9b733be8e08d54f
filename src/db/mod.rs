// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: the single item table and its backends.

pub mod firestore;
pub mod item;
pub mod memory;

pub use firestore::FirestoreStore;
pub use item::{Condition, Item, ItemUpdate, UpdateOp};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::keys::{Index, ItemKey};

/// Collection names as constants.
pub mod collections {
    /// Every entity and event item lives in this one collection.
    pub const ITEMS: &str = "items";
}

/// Storage-layer errors. Never retried here.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Item already exists: {0}")]
    AlreadyExists(String),

    #[error("Condition failed on {0}")]
    ConditionFailed(String),

    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Write semantics for `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// Replace any existing item with the same key.
    Upsert,
    /// Fail with `AlreadyExists` if the key is taken.
    CreateOnly,
}

/// Sort-key restriction within one index partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    BeginsWith(String),
    /// Inclusive on both ends.
    Between(String, String),
}

impl SortCondition {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            SortCondition::BeginsWith(prefix) => value.starts_with(prefix.as_str()),
            SortCondition::Between(low, high) => value >= low.as_str() && value <= high.as_str(),
        }
    }
}

/// A query against one index partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    pub index: Index,
    pub partition: String,
    pub sort: Option<SortCondition>,
    pub descending: bool,
    pub limit: Option<usize>,
    /// Exclusive cursor on the index sort attribute.
    pub start_after: Option<String>,
}

impl ItemQuery {
    pub fn new(index: Index, partition: impl Into<String>) -> Self {
        Self {
            index,
            partition: partition.into(),
            sort: None,
            descending: false,
            limit: None,
            start_after: None,
        }
    }

    pub fn begins_with(mut self, prefix: impl Into<String>) -> Self {
        self.sort = Some(SortCondition::BeginsWith(prefix.into()));
        self
    }

    pub fn between(mut self, low: impl Into<String>, high: impl Into<String>) -> Self {
        self.sort = Some(SortCondition::Between(low.into(), high.into()));
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_after(mut self, cursor: Option<String>) -> Self {
        self.start_after = cursor;
        self
    }

    /// Whether a sort value lies past the cursor in query direction.
    pub fn after_cursor(&self, value: &str) -> bool {
        match &self.start_after {
            None => true,
            Some(cursor) if self.descending => value < cursor.as_str(),
            Some(cursor) => value > cursor.as_str(),
        }
    }
}

/// Keyed access to the item table.
///
/// Single-item reads return `Ok(None)` on absence. Index queries may lag
/// behind writes on eventually consistent backends.
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, StoreError>;

    async fn put(&self, item: &Item, mode: PutMode) -> Result<(), StoreError>;

    /// Apply field operations to an existing item and return the new state.
    async fn update(&self, key: &ItemKey, update: &ItemUpdate) -> Result<Item, StoreError>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError>;

    async fn query(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError>;
}
