// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Host repository.

use crate::db::{Condition, ItemQuery, ItemUpdate, PutMode, UpdateOp};
use crate::error::{AppError, Result};
use crate::keys::{self, partition, Index, ItemKey, Keys};
use crate::models::{fields, new_id, EntityType, Host, HostPatch, ItemMeta, NewHost, Patch};
use crate::repo::Table;

/// Attempts of a guarded ID-list rewrite before giving up with `Conflict`.
const MAX_LIST_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct HostRepo {
    table: Table,
}

impl HostRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::metadata(keys::host_pk(id))
    }

    pub async fn create(&self, new: NewHost) -> Result<Host> {
        let id = new_id();
        let now = self.table.now();
        let host = Host {
            meta: ItemMeta::new(Keys::host(&id, &new.email), EntityType::Host, id, &now),
            name: new.name,
            email: new.email,
            identity_ref: new.identity_ref,
            passphrase_hash: new.passphrase_hash,
            location_ids: Vec::new(),
            disclaimer: new.disclaimer,
            reward_ids: Vec::new(),
        };
        self.table.put(&host, PutMode::CreateOnly).await?;
        tracing::info!(host_id = %host.id(), "Host created");
        Ok(host)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Host>> {
        self.table.get(&Self::key(id)).await
    }

    /// Exact (case-insensitive) email lookup through the name index.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Host>> {
        let email = keys::email_sort_key(email);
        let query = ItemQuery::new(Index::ByName, partition::HOSTS)
            .between(email.clone(), email)
            .limit(1);
        Ok(self.table.query(&query).await?.into_iter().next())
    }

    pub async fn list(&self) -> Result<Vec<Host>> {
        self.table
            .query(&ItemQuery::new(Index::ByName, partition::HOSTS))
            .await
    }

    pub async fn update(&self, id: &str, patch: HostPatch) -> Result<Host> {
        let email_key = patch.email.as_deref().map(keys::email_sort_key);
        let mut ops = patch.into_ops();
        if let Some(email_key) = email_key {
            ops.push(UpdateOp::set(fields::G2SK, email_key));
        }
        self.table.patch(&Self::key(id), ops).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table.delete(&Self::key(id)).await
    }

    pub async fn add_location(&self, id: &str, location_id: &str) -> Result<Host> {
        self.rewrite_ids(id, fields::LOCATION_IDS, |h| &h.location_ids, |ids| {
            Ok(appended(ids, location_id))
        })
        .await
    }

    /// Drop a location ID. Fails with `LastLocation` rather than leave none.
    pub async fn remove_location(&self, id: &str, location_id: &str) -> Result<Host> {
        self.rewrite_ids(id, fields::LOCATION_IDS, |h| &h.location_ids, |ids| {
            if !ids.iter().any(|l| l == location_id) {
                return Ok(None);
            }
            let remaining: Vec<String> =
                ids.iter().filter(|l| *l != location_id).cloned().collect();
            if remaining.is_empty() {
                return Err(AppError::LastLocation(id.to_string()));
            }
            Ok(Some(remaining))
        })
        .await
    }

    pub async fn add_reward(&self, id: &str, reward_id: &str) -> Result<Host> {
        self.rewrite_ids(id, fields::REWARD_IDS, |h| &h.reward_ids, |ids| {
            Ok(appended(ids, reward_id))
        })
        .await
    }

    /// Rewrite one ID list under a guard on its current value.
    ///
    /// `edit` sees the list from a fresh read on every attempt and returns
    /// the new list, or `None` to leave the host unchanged.
    async fn rewrite_ids<S, F>(
        &self,
        id: &str,
        field: &str,
        select: S,
        mut edit: F,
    ) -> Result<Host>
    where
        S: Fn(&Host) -> &Vec<String> + Send + Sync,
        F: FnMut(&[String]) -> Result<Option<Vec<String>>> + Send,
    {
        let key = Self::key(id);
        for attempt in 1..=MAX_LIST_ATTEMPTS {
            let host = self
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Host {}", id)))?;
            let current = select(&host);
            let Some(next) = edit(current)? else {
                return Ok(host);
            };

            let update = ItemUpdate::guarded(
                vec![
                    UpdateOp::set(field, next),
                    UpdateOp::set(fields::UPDATED_AT, self.table.now()),
                ],
                Condition::equals(field, current.clone()),
            );
            match self.table.update(&key, &update).await {
                Ok(updated) => return Ok(updated),
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(host_id = %id, field, attempt, "Host list changed concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::Conflict(format!(
            "Host {} {} changed concurrently {} times",
            id, field, MAX_LIST_ATTEMPTS
        )))
    }
}

fn appended(ids: &[String], id: &str) -> Option<Vec<String>> {
    if ids.iter().any(|existing| existing == id) {
        return None;
    }
    let mut next = ids.to_vec();
    next.push(id.to_string());
    Some(next)
}
