// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Location repository.

use crate::db::{Condition, ItemQuery, ItemUpdate, PutMode, UpdateOp};
use crate::error::Result;
use crate::keys::{self, prefix, Index, ItemKey, Keys};
use crate::models::{
    fields, new_id, EntityType, ItemMeta, Location, LocationPatch, NewLocation, Patch,
};
use crate::repo::Table;

#[derive(Clone)]
pub struct LocationRepo {
    table: Table,
}

impl LocationRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::metadata(keys::location_pk(id))
    }

    pub async fn create(&self, new: NewLocation) -> Result<Location> {
        let id = new_id();
        let now = self.table.now();
        let location = Location {
            meta: ItemMeta::new(
                Keys::location(&id, &new.host_id, &now),
                EntityType::Location,
                id,
                &now,
            ),
            host_id: new.host_id,
            name: new.name,
            address: new.address,
            activity_ids: Vec::new(),
        };
        self.table.put(&location, PutMode::CreateOnly).await?;
        Ok(location)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Location>> {
        self.table.get(&Self::key(id)).await
    }

    /// A host's locations, oldest first.
    pub async fn list_for_host(&self, host_id: &str) -> Result<Vec<Location>> {
        let query =
            ItemQuery::new(Index::ByOwner, keys::host_pk(host_id)).begins_with(prefix::LOCATION);
        self.table.query(&query).await
    }

    pub async fn update(&self, id: &str, patch: LocationPatch) -> Result<Location> {
        self.table.patch(&Self::key(id), patch.into_ops()).await
    }

    /// Replace the activity list only if it still equals `expected`.
    ///
    /// Fails with `Conflict` when another writer changed it first.
    pub async fn replace_activities(
        &self,
        id: &str,
        expected: &[String],
        activity_ids: Vec<String>,
    ) -> Result<Location> {
        let update = ItemUpdate::guarded(
            vec![
                UpdateOp::set(fields::ACTIVITY_IDS, activity_ids),
                UpdateOp::set(fields::UPDATED_AT, self.table.now()),
            ],
            Condition::equals(fields::ACTIVITY_IDS, expected.to_vec()),
        );
        self.table.update(&Self::key(id), &update).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table.delete(&Self::key(id)).await
    }
}
