// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete repository.
//!
//! Every write that depends on the current athlete state goes through
//! [`AthleteRepo::mutate`], which guards on the revision `rv` and retries
//! on a lost race.

use crate::db::{Condition, ItemQuery, ItemUpdate, PutMode, UpdateOp};
use crate::error::{AppError, Result};
use crate::keys::{self, partition, Index, ItemKey, Keys};
use crate::models::{
    fields, new_id, Athlete, AthletePatch, EntityType, ItemMeta, NewAthlete, Patch,
};
use crate::repo::{Page, Table, MAX_PAGE_SIZE};

/// Attempts of a guarded athlete write before giving up with `Conflict`.
pub const MAX_MUTATION_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct AthleteRepo {
    table: Table,
}

impl AthleteRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::metadata(keys::athlete_pk(id))
    }

    pub async fn create(&self, new: NewAthlete) -> Result<Athlete> {
        let id = new_id();
        let now = self.table.now();
        let athlete = Athlete {
            meta: ItemMeta::new(
                Keys::athlete(&id, &new.last_name, &new.first_name, false),
                EntityType::Athlete,
                id,
                &now,
            ),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            emergency_contact_name: new.emergency_contact_name,
            emergency_contact_phone: new.emergency_contact_phone,
            last_week: Default::default(),
            global_count: 0,
            host_counts: Default::default(),
            disclaimers: Default::default(),
            deleted: false,
            revision: 0,
        };
        self.table.put(&athlete, PutMode::CreateOnly).await?;
        tracing::info!(athlete_id = %athlete.id(), "Athlete registered");
        Ok(athlete)
    }

    /// Soft-deleted athletes are returned too.
    pub async fn get(&self, id: &str) -> Result<Option<Athlete>> {
        self.table.get(&Self::key(id)).await
    }

    /// Live athletes whose `LAST#FIRST#id` key starts with `prefix`.
    pub async fn search(&self, prefix: &str, limit: usize) -> Result<Vec<Athlete>> {
        let query = ItemQuery::new(Index::ByName, partition::ATHLETES)
            .begins_with(prefix.trim().to_uppercase())
            .limit(limit);
        self.table.query(&query).await
    }

    /// Live athletes in name order.
    pub async fn list(&self, limit: Option<usize>, cursor: Option<&str>) -> Result<Page<Athlete>> {
        let mut query = ItemQuery::new(Index::ByName, partition::ATHLETES);
        query.limit = limit;
        self.table.page(query, cursor).await
    }

    /// Every live athlete, read page by page.
    pub async fn list_all(&self) -> Result<Vec<Athlete>> {
        let mut athletes = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list(Some(MAX_PAGE_SIZE), cursor.as_deref()).await?;
            athletes.extend(page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(athletes)
    }

    /// Read-compute-write with a revision guard.
    ///
    /// `compute` sees a fresh read on every attempt and returns the field
    /// operations to apply; an empty list means nothing to write and the
    /// current state is returned. The revision bump and `ua` are added here.
    pub async fn mutate<F>(&self, id: &str, mut compute: F) -> Result<Athlete>
    where
        F: FnMut(&Athlete) -> Result<Vec<UpdateOp>> + Send,
    {
        let key = Self::key(id);
        for attempt in 1..=MAX_MUTATION_ATTEMPTS {
            let athlete = self
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Athlete {}", id)))?;

            let mut ops = compute(&athlete)?;
            if ops.is_empty() {
                return Ok(athlete);
            }
            ops.push(UpdateOp::add(fields::REVISION, 1));
            ops.push(UpdateOp::set(fields::UPDATED_AT, self.table.now()));

            let update =
                ItemUpdate::guarded(ops, Condition::equals(fields::REVISION, athlete.revision));
            match self.table.update(&key, &update).await {
                Ok(updated) => return Ok(updated),
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(
                        athlete_id = %id,
                        attempt,
                        revision = athlete.revision,
                        "Athlete changed concurrently, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(athlete_id = %id, "Giving up on contended athlete update");
        Err(AppError::Conflict(format!(
            "Athlete {} changed concurrently {} times",
            id, MAX_MUTATION_ATTEMPTS
        )))
    }

    /// Apply a profile patch, keeping the name index in step.
    pub async fn update(&self, id: &str, patch: AthletePatch) -> Result<Athlete> {
        self.mutate(id, |current| {
            let mut ops = Vec::new();
            if patch.changes_name() {
                let last = patch.last_name.as_deref().unwrap_or(&current.last_name);
                let first = patch.first_name.as_deref().unwrap_or(&current.first_name);
                ops.push(UpdateOp::set(
                    fields::G2SK,
                    keys::name_sort_key(last, first, id),
                ));
            }
            ops.extend(patch.clone().into_ops());
            Ok(ops)
        })
        .await
    }

    /// Flag the athlete and move it out of the live name partition.
    pub async fn soft_delete(&self, id: &str) -> Result<Athlete> {
        let athlete = self
            .mutate(id, |current| {
                if current.deleted {
                    return Ok(Vec::new());
                }
                Ok(vec![
                    UpdateOp::set(fields::DELETED, true),
                    UpdateOp::set(fields::G2PK, partition::DELETED_ATHLETES),
                ])
            })
            .await?;
        tracing::info!(athlete_id = %id, "Athlete soft-deleted");
        Ok(athlete)
    }
}
