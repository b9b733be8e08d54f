// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward definition repository.
//!
//! Rewards are listed per owner (a host, the global catalog or the pet
//! catalog) in ascending threshold order.

use crate::db::{ItemQuery, PutMode};
use crate::error::Result;
use crate::keys::{self, prefix, Index, ItemKey, Keys};
use crate::models::{new_id, EntityType, ItemMeta, NewReward, Patch, Reward, RewardPatch, RewardScope};
use crate::repo::Table;

#[derive(Clone)]
pub struct RewardRepo {
    table: Table,
}

impl RewardRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::metadata(keys::reward_pk(id))
    }

    pub async fn create(&self, new: NewReward) -> Result<Reward> {
        let id = new_id();
        let now = self.table.now();
        let reward = Reward {
            meta: ItemMeta::new(
                Keys::reward(&id, new.scope, new.host_id.as_deref(), new.threshold),
                EntityType::Reward,
                id,
                &now,
            ),
            threshold: new.threshold,
            name: new.name,
            icon: new.icon,
            scope: new.scope,
            host_id: new.host_id,
        };
        self.table.put(&reward, PutMode::CreateOnly).await?;
        Ok(reward)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Reward>> {
        self.table.get(&Self::key(id)).await
    }

    pub async fn update(&self, id: &str, patch: RewardPatch) -> Result<Reward> {
        self.table.patch(&Self::key(id), patch.into_ops()).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table.delete(&Self::key(id)).await
    }

    async fn list_owned_by(&self, owner: String) -> Result<Vec<Reward>> {
        let query = ItemQuery::new(Index::ByOwner, owner).begins_with(prefix::REWARD);
        self.table.query(&query).await
    }

    pub async fn list_global(&self) -> Result<Vec<Reward>> {
        self.list_owned_by(keys::reward_owner(RewardScope::Global, None))
            .await
    }

    pub async fn list_for_host(&self, host_id: &str) -> Result<Vec<Reward>> {
        self.list_owned_by(keys::reward_owner(RewardScope::Host, Some(host_id)))
            .await
    }

    pub async fn list_pet(&self) -> Result<Vec<Reward>> {
        self.list_owned_by(keys::reward_owner(RewardScope::Pet, None))
            .await
    }
}
