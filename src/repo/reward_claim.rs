// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward claim repository. Claims are append-only.

use crate::db::{ItemQuery, PutMode};
use crate::error::Result;
use crate::keys::{self, prefix, Index};
use crate::models::{new_id, EntityType, ItemMeta, NewRewardClaim, RewardClaim};
use crate::repo::{Page, Table};

#[derive(Clone)]
pub struct RewardClaimRepo {
    table: Table,
}

impl RewardClaimRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    /// Record a claim at the current instant.
    ///
    /// Prior claims of the same reward are not consulted.
    pub async fn create(&self, new: NewRewardClaim) -> Result<RewardClaim> {
        let now = self.table.now();
        let claim = RewardClaim {
            meta: ItemMeta::new(new.keys(&now), EntityType::RewardClaim, new_id(), &now),
            athlete_id: new.athlete_id,
            reward_id: new.reward_id,
            host_id: new.host_id,
            location_id: new.location_id,
            pet_id: new.pet_id,
            timestamp: now,
        };
        self.table.put(&claim, PutMode::CreateOnly).await?;
        Ok(claim)
    }

    /// Every claim of one athlete, newest first.
    pub async fn list_for_athlete(&self, athlete_id: &str) -> Result<Vec<RewardClaim>> {
        let query = ItemQuery::new(Index::Primary, keys::athlete_pk(athlete_id))
            .begins_with(prefix::CLAIM)
            .newest_first();
        self.table.query(&query).await
    }

    pub async fn list_for_host(
        &self,
        host_id: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<RewardClaim>> {
        let mut query = ItemQuery::new(Index::ByOwner, keys::host_pk(host_id))
            .begins_with(prefix::CLAIM)
            .newest_first();
        query.limit = limit;
        self.table.page(query, cursor).await
    }
}
