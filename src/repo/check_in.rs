// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in and pet check-in event repositories.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::db::{ItemQuery, PutMode, UpdateOp};
use crate::error::Result;
use crate::keys::{self, prefix, Index, ItemKey};
use crate::models::{fields, CheckIn, PetCheckIn};
use crate::repo::{Page, Table};

#[derive(Clone)]
pub struct CheckInRepo {
    table: Table,
}

impl CheckInRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(athlete_id: &str, timestamp: &str) -> ItemKey {
        ItemKey::new(keys::athlete_pk(athlete_id), keys::check_in_sk(timestamp))
    }

    /// Write a new event. Fails with `Conflict` if one exists at that instant.
    pub async fn create(&self, check_in: &CheckIn) -> Result<()> {
        self.table.put(check_in, PutMode::CreateOnly).await
    }

    pub async fn get(&self, athlete_id: &str, timestamp: &str) -> Result<Option<CheckIn>> {
        self.table.get(&Self::key(athlete_id, timestamp)).await
    }

    pub async fn set_activity(
        &self,
        athlete_id: &str,
        timestamp: &str,
        activity_id: &str,
    ) -> Result<CheckIn> {
        self.table
            .patch(
                &Self::key(athlete_id, timestamp),
                vec![UpdateOp::set(fields::ACTIVITY, activity_id)],
            )
            .await
    }

    pub async fn delete(&self, athlete_id: &str, timestamp: &str) -> Result<()> {
        self.table.delete(&Self::key(athlete_id, timestamp)).await
    }

    /// Full history of one athlete, newest first.
    pub async fn list_for_athlete(&self, athlete_id: &str) -> Result<Vec<CheckIn>> {
        let query = ItemQuery::new(Index::Primary, keys::athlete_pk(athlete_id))
            .begins_with(prefix::CHECK_IN)
            .newest_first();
        self.table.query(&query).await
    }

    /// A host's check-ins, newest first.
    pub async fn list_for_host(
        &self,
        host_id: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<CheckIn>> {
        let mut query = ItemQuery::new(Index::ByOwner, keys::host_pk(host_id))
            .begins_with(prefix::CHECK_IN)
            .newest_first();
        query.limit = limit;
        self.table.page(query, cursor).await
    }

    /// Every check-in on one calendar date, in time order.
    pub async fn list_on_date(&self, date: NaiveDate) -> Result<Vec<CheckIn>> {
        let query = ItemQuery::new(Index::ByDate, keys::date_pk(date)).begins_with(prefix::CHECK_IN);
        self.table.query(&query).await
    }

    /// Count an athlete's check-ins per host by scanning the event partition.
    pub async fn count_by_host(&self, athlete_id: &str) -> Result<HashMap<String, u32>> {
        let mut counts = HashMap::new();
        for check_in in self.list_for_athlete(athlete_id).await? {
            *counts.entry(check_in.host_id).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[derive(Clone)]
pub struct PetCheckInRepo {
    table: Table,
}

impl PetCheckInRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(pet_id: &str, timestamp: &str) -> ItemKey {
        ItemKey::new(keys::pet_pk(pet_id), keys::pet_check_in_sk(timestamp))
    }

    pub async fn create(&self, check_in: &PetCheckIn) -> Result<()> {
        self.table.put(check_in, PutMode::CreateOnly).await
    }

    pub async fn get(&self, pet_id: &str, timestamp: &str) -> Result<Option<PetCheckIn>> {
        self.table.get(&Self::key(pet_id, timestamp)).await
    }

    pub async fn delete(&self, pet_id: &str, timestamp: &str) -> Result<()> {
        self.table.delete(&Self::key(pet_id, timestamp)).await
    }

    pub async fn list_for_pet(&self, pet_id: &str) -> Result<Vec<PetCheckIn>> {
        let query = ItemQuery::new(Index::Primary, keys::pet_pk(pet_id))
            .begins_with(prefix::PET_CHECK_IN)
            .newest_first();
        self.table.query(&query).await
    }

    pub async fn count_for_pet(&self, pet_id: &str) -> Result<u32> {
        Ok(self.list_for_pet(pet_id).await?.len() as u32)
    }

    pub async fn list_on_date(&self, date: NaiveDate) -> Result<Vec<PetCheckIn>> {
        let query =
            ItemQuery::new(Index::ByDate, keys::date_pk(date)).begins_with(prefix::PET_CHECK_IN);
        self.table.query(&query).await
    }
}
