// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory item store for local development and tests.
//!
//! Updates hold the per-key shard lock for the whole read-check-write, so
//! guarded updates are atomic per item.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::db::{Item, ItemQuery, ItemStore, ItemUpdate, PutMode, StoreError};
use crate::keys::ItemKey;

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<ItemKey, Item>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        Ok(self.items.get(key).map(|item| item.value().clone()))
    }

    async fn put(&self, item: &Item, mode: PutMode) -> Result<(), StoreError> {
        let key = item
            .key()
            .ok_or_else(|| StoreError::InvalidUpdate("item has no pk/sk".to_string()))?;

        match (self.items.entry(key.clone()), mode) {
            (Entry::Occupied(_), PutMode::CreateOnly) => {
                Err(StoreError::AlreadyExists(key.to_string()))
            }
            (Entry::Occupied(mut entry), PutMode::Upsert) => {
                entry.insert(item.clone());
                Ok(())
            }
            (Entry::Vacant(entry), _) => {
                entry.insert(item.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, key: &ItemKey, update: &ItemUpdate) -> Result<Item, StoreError> {
        let mut entry = self
            .items
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        if let Some(condition) = &update.condition {
            if !entry.satisfies(condition) {
                return Err(StoreError::ConditionFailed(key.to_string()));
            }
        }

        entry.apply(&update.ops)?;
        Ok(entry.value().clone())
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }

    async fn query(&self, query: &ItemQuery) -> Result<Vec<Item>, StoreError> {
        let partition_attr = query.index.partition_attr();
        let sort_attr = query.index.sort_attr();

        let mut matches: Vec<(String, Item)> = self
            .items
            .iter()
            .filter(|entry| entry.get_str(partition_attr) == Some(query.partition.as_str()))
            .filter_map(|entry| {
                let sort_value = entry.get_str(sort_attr)?.to_string();
                let in_range = query
                    .sort
                    .as_ref()
                    .map_or(true, |cond| cond.matches(&sort_value));
                (in_range && query.after_cursor(&sort_value))
                    .then(|| (sort_value, entry.value().clone()))
            })
            .collect();

        matches.sort_by(|a, b| a.0.cmp(&b.0));
        if query.descending {
            matches.reverse();
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }

        Ok(matches.into_iter().map(|(_, item)| item).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Condition, UpdateOp};
    use crate::keys::Index;
    use serde_json::json;

    fn item(value: serde_json::Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_create_only_rejects_existing_key() {
        let store = MemoryStore::new();
        let it = item(json!({"pk": "ATH#1", "sk": "CHK#t1"}));

        store.put(&it, PutMode::CreateOnly).await.unwrap();
        let err = store.put(&it, PutMode::CreateOnly).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));

        store.put(&it, PutMode::Upsert).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_guarded_update_rejects_stale_revision() {
        let store = MemoryStore::new();
        store
            .put(
                &item(json!({"pk": "ATH#1", "sk": "METADATA", "rv": 1})),
                PutMode::Upsert,
            )
            .await
            .unwrap();
        let key = ItemKey::metadata("ATH#1");

        let bump = ItemUpdate::guarded(vec![UpdateOp::add("rv", 1)], Condition::equals("rv", 1));
        store.update(&key, &bump).await.unwrap();

        let err = store.update(&key, &bump).await.unwrap_err();
        assert!(matches!(err, StoreError::ConditionFailed(_)));
    }

    #[tokio::test]
    async fn test_update_missing_item_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update(
                &ItemKey::metadata("ATH#missing"),
                &ItemUpdate::new(vec![UpdateOp::add("gc", 1)]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_query_orders_filters_and_pages() {
        let store = MemoryStore::new();
        for (sk, owner) in [("CHK#1", "HOST#a"), ("CHK#2", "HOST#a"), ("CHK#3", "HOST#b")] {
            store
                .put(
                    &item(json!({"pk": "ATH#1", "sk": sk, "g1pk": owner, "g1sk": sk})),
                    PutMode::Upsert,
                )
                .await
                .unwrap();
        }

        let newest = store
            .query(&ItemQuery::new(Index::ByOwner, "HOST#a").newest_first())
            .await
            .unwrap();
        let sks: Vec<_> = newest.iter().map(|i| i.get_str("sk").unwrap()).collect();
        assert_eq!(sks, vec!["CHK#2", "CHK#1"]);

        let page = store
            .query(
                &ItemQuery::new(Index::Primary, "ATH#1")
                    .begins_with("CHK#")
                    .start_after(Some("CHK#1".to_string()))
                    .limit(1),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].get_str("sk"), Some("CHK#2"));
    }
}
