// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete directory: registration, lookup, search, pets.

use crate::error::{AppError, Result};
use crate::models::{Athlete, AthletePatch, NewAthlete, NewPet, Patch, Pet};
use crate::repo::{Page, Repositories};

/// Search results are capped at this many athletes.
pub const MAX_SEARCH_RESULTS: usize = 25;

#[derive(Clone)]
pub struct AthleteService {
    repos: Repositories,
}

impl AthleteService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn register(&self, new: NewAthlete) -> Result<Athlete> {
        if new.first_name.trim().is_empty() || new.last_name.trim().is_empty() {
            return Err(AppError::BadRequest(
                "First and last name are required".to_string(),
            ));
        }
        self.repos.athletes.create(new).await
    }

    /// Resolves soft-deleted athletes too.
    pub async fn get(&self, athlete_id: &str) -> Result<Option<Athlete>> {
        self.repos.athletes.get(athlete_id).await
    }

    /// Prefix search on `LAST#FIRST`, e.g. `"smi"` or `"smith#ja"`.
    pub async fn search(&self, prefix: &str) -> Result<Vec<Athlete>> {
        if prefix.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.repos
            .athletes
            .search(prefix, MAX_SEARCH_RESULTS)
            .await
    }

    pub async fn list(&self, limit: Option<usize>, cursor: Option<&str>) -> Result<Page<Athlete>> {
        self.repos.athletes.list(limit, cursor).await
    }

    pub async fn update_profile(&self, athlete_id: &str, patch: AthletePatch) -> Result<Athlete> {
        if patch.is_empty() {
            return self
                .get(athlete_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Athlete {}", athlete_id)));
        }
        self.repos.athletes.update(athlete_id, patch).await
    }

    pub async fn soft_delete(&self, athlete_id: &str) -> Result<Athlete> {
        self.repos.athletes.soft_delete(athlete_id).await
    }

    pub async fn add_pet(&self, athlete_id: &str, name: &str) -> Result<Pet> {
        match self.repos.athletes.get(athlete_id).await? {
            Some(athlete) if !athlete.deleted => {}
            _ => return Err(AppError::NotFound(format!("Athlete {}", athlete_id))),
        }
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Pet name is required".to_string()));
        }
        self.repos
            .pets
            .create(NewPet {
                athlete_id: athlete_id.to_string(),
                name: name.trim().to_string(),
            })
            .await
    }

    pub async fn list_pets(&self, athlete_id: &str) -> Result<Vec<Pet>> {
        self.repos.pets.list_for_athlete(athlete_id).await
    }
}
