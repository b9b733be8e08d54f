// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity catalog repository.

use crate::db::{ItemQuery, PutMode, UpdateOp};
use crate::error::Result;
use crate::keys::{self, partition, Index, ItemKey, Keys};
use crate::models::{
    fields, new_id, Activity, ActivityPatch, EntityType, ItemMeta, NewActivity, Patch,
};
use crate::repo::Table;

#[derive(Clone)]
pub struct ActivityRepo {
    table: Table,
}

impl ActivityRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::metadata(keys::activity_pk(id))
    }

    pub async fn create(&self, new: NewActivity) -> Result<Activity> {
        let id = new_id();
        let now = self.table.now();
        let activity = Activity {
            meta: ItemMeta::new(
                Keys::activity(&id, &new.name),
                EntityType::Activity,
                id,
                &now,
            ),
            name: new.name,
            icon: new.icon,
            enabled: true,
        };
        self.table.put(&activity, PutMode::CreateOnly).await?;
        Ok(activity)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Activity>> {
        self.table.get(&Self::key(id)).await
    }

    /// Whole catalog in name order, disabled entries included.
    pub async fn list(&self) -> Result<Vec<Activity>> {
        self.table
            .query(&ItemQuery::new(Index::ByName, partition::ACTIVITIES))
            .await
    }

    pub async fn update(&self, id: &str, patch: ActivityPatch) -> Result<Activity> {
        let name_key = patch
            .name
            .as_deref()
            .map(|name| name.trim().to_uppercase());
        let mut ops = patch.into_ops();
        if let Some(name_key) = name_key {
            ops.push(UpdateOp::set(fields::G2SK, name_key));
        }
        self.table.patch(&Self::key(id), ops).await
    }
}
