// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Repository access layer: one module per entity type.
//!
//! Repositories turn domain operations into keyed reads and writes. Lookups
//! return `Ok(None)` on absence; every storage error propagates unchanged.

pub mod activity;
pub mod athlete;
pub mod check_in;
pub mod host;
pub mod location;
pub mod pet;
pub mod reward;
pub mod reward_claim;

pub use activity::ActivityRepo;
pub use athlete::AthleteRepo;
pub use check_in::{CheckInRepo, PetCheckInRepo};
pub use host::HostRepo;
pub use location::LocationRepo;
pub use pet::PetRepo;
pub use reward::RewardRepo;
pub use reward_claim::RewardClaimRepo;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::db::{Item, ItemQuery, ItemStore, ItemUpdate, PutMode, UpdateOp};
use crate::error::{AppError, Result};
use crate::keys::ItemKey;
use crate::models::fields;
use crate::time_utils::{format_timestamp, Clock};

/// Default and maximum page size for cursor listings.
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

/// One page of a cursor listing.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page, absent on the last page.
    pub next_cursor: Option<String>,
}

/// Encode an index sort value as an opaque cursor.
pub fn encode_cursor(sort_value: &str) -> String {
    URL_SAFE_NO_PAD.encode(sort_value.as_bytes())
}

pub fn decode_cursor(cursor: Option<&str>) -> Result<Option<String>> {
    cursor
        .map(|c| {
            URL_SAFE_NO_PAD
                .decode(c)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .ok_or_else(|| AppError::BadRequest("Invalid cursor".to_string()))
        })
        .transpose()
}

/// Clamp a requested page size.
pub fn page_size(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

/// Store and clock shared by all repositories.
#[derive(Clone)]
pub(crate) struct Table {
    store: Arc<dyn ItemStore>,
    clock: Arc<dyn Clock>,
}

impl Table {
    pub(crate) fn new(store: Arc<dyn ItemStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Current time as a stored timestamp string.
    pub(crate) fn now(&self) -> String {
        format_timestamp(self.clock.now_millis())
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, key: &ItemKey) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(item) => Ok(Some(item.into_entity()?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn put<T: Serialize>(&self, entity: &T, mode: PutMode) -> Result<()> {
        let item = Item::from_entity(entity)?;
        self.store.put(&item, mode).await?;
        Ok(())
    }

    pub(crate) async fn delete(&self, key: &ItemKey) -> Result<()> {
        self.store.delete(key).await?;
        Ok(())
    }

    pub(crate) async fn query<T: DeserializeOwned>(&self, query: &ItemQuery) -> Result<Vec<T>> {
        self.store
            .query(query)
            .await?
            .into_iter()
            .map(|item| item.into_entity().map_err(AppError::from))
            .collect()
    }

    /// Run a limited query and build a page, with a cursor on the last sort value.
    pub(crate) async fn page<T: DeserializeOwned>(
        &self,
        query: ItemQuery,
        cursor: Option<&str>,
    ) -> Result<Page<T>> {
        let limit = page_size(query.limit);
        let sort_attr = query.index.sort_attr();
        let query = query.limit(limit).start_after(decode_cursor(cursor)?);

        let items = self.store.query(&query).await?;
        let next_cursor = if items.len() == limit {
            items.last().and_then(|i| i.get_str(sort_attr)).map(encode_cursor)
        } else {
            None
        };

        let items = items
            .into_iter()
            .map(|item| item.into_entity().map_err(AppError::from))
            .collect::<Result<Vec<T>>>()?;
        Ok(Page { items, next_cursor })
    }

    /// Apply `ops` plus an `ua` timestamp and return the updated entity.
    pub(crate) async fn patch<T: DeserializeOwned>(
        &self,
        key: &ItemKey,
        mut ops: Vec<UpdateOp>,
    ) -> Result<T> {
        ops.push(UpdateOp::set(fields::UPDATED_AT, self.now()));
        let item = self.store.update(key, &ItemUpdate::new(ops)).await?;
        Ok(item.into_entity()?)
    }

    /// Apply a pre-built update (guard included) and return the updated entity.
    pub(crate) async fn update<T: DeserializeOwned>(
        &self,
        key: &ItemKey,
        update: &ItemUpdate,
    ) -> Result<T> {
        let item = self.store.update(key, update).await?;
        Ok(item.into_entity()?)
    }
}

/// All repositories over one store.
#[derive(Clone)]
pub struct Repositories {
    pub hosts: HostRepo,
    pub locations: LocationRepo,
    pub activities: ActivityRepo,
    pub athletes: AthleteRepo,
    pub pets: PetRepo,
    pub check_ins: CheckInRepo,
    pub pet_check_ins: PetCheckInRepo,
    pub rewards: RewardRepo,
    pub claims: RewardClaimRepo,
}

impl Repositories {
    pub fn new(store: Arc<dyn ItemStore>, clock: Arc<dyn Clock>) -> Self {
        let table = Table::new(store, clock);
        Self {
            hosts: HostRepo::new(table.clone()),
            locations: LocationRepo::new(table.clone()),
            activities: ActivityRepo::new(table.clone()),
            athletes: AthleteRepo::new(table.clone()),
            pets: PetRepo::new(table.clone()),
            check_ins: CheckInRepo::new(table.clone()),
            pet_check_ins: PetCheckInRepo::new(table.clone()),
            rewards: RewardRepo::new(table.clone()),
            claims: RewardClaimRepo::new(table),
        }
    }
}
