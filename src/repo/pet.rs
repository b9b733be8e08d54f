// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pet repository.

use crate::db::{ItemQuery, PutMode};
use crate::error::Result;
use crate::keys::{self, prefix, Index, ItemKey, Keys};
use crate::models::{new_id, EntityType, ItemMeta, NewPet, Patch, Pet, PetPatch};
use crate::repo::Table;

#[derive(Clone)]
pub struct PetRepo {
    table: Table,
}

impl PetRepo {
    pub(crate) fn new(table: Table) -> Self {
        Self { table }
    }

    fn key(id: &str) -> ItemKey {
        ItemKey::metadata(keys::pet_pk(id))
    }

    pub async fn create(&self, new: NewPet) -> Result<Pet> {
        let id = new_id();
        let now = self.table.now();
        let pet = Pet {
            meta: ItemMeta::new(
                Keys::pet(&id, &new.athlete_id, &now),
                EntityType::Pet,
                id,
                &now,
            ),
            athlete_id: new.athlete_id,
            name: new.name,
        };
        self.table.put(&pet, PutMode::CreateOnly).await?;
        Ok(pet)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Pet>> {
        self.table.get(&Self::key(id)).await
    }

    pub async fn list_for_athlete(&self, athlete_id: &str) -> Result<Vec<Pet>> {
        let query =
            ItemQuery::new(Index::ByOwner, keys::athlete_pk(athlete_id)).begins_with(prefix::PET);
        self.table.query(&query).await
    }

    pub async fn update(&self, id: &str, patch: PetPatch) -> Result<Pet> {
        self.table.patch(&Self::key(id), patch.into_ops()).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.table.delete(&Self::key(id)).await
    }
}
