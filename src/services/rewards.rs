// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reward eligibility engine.
//!
//! Counting domains:
//! - global rewards against the athlete's lifetime weekly counter `gc`
//! - host rewards against the athlete's check-ins at that host (`hc`)
//! - pet rewards against a pet's companion check-ins
//!
//! Evaluation happens at read time; nothing here writes counters.

use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{
    Athlete, NewReward, NewRewardClaim, Pet, Reward, RewardClaim, RewardScope,
};
use crate::repo::{Page, Repositories};

/// Limit for concurrent per-pet reads.
const MAX_CONCURRENT_DB_OPS: usize = 16;

/// An athlete exactly one count short of a reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OneAwayEntry {
    pub athlete_id: String,
    pub reward_id: String,
    pub count: u32,
    pub required: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OneAway {
    pub global_one_away: Vec<OneAwayEntry>,
    pub host_one_away: Vec<OneAwayEntry>,
}

/// Standing of one athlete (or pet) against one reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardProgress {
    pub reward_id: String,
    pub name: String,
    pub scope: RewardScope,
    pub count: u32,
    pub required: u32,
    pub met: bool,
}

impl RewardProgress {
    fn new(reward: &Reward, count: u32) -> Self {
        Self {
            reward_id: reward.id().to_string(),
            name: reward.name.clone(),
            scope: reward.scope,
            count,
            required: reward.threshold,
            met: reward.is_met(count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PetProgress {
    pub pet_id: String,
    pub name: String,
    pub rewards: Vec<RewardProgress>,
}

/// Evaluate every (athlete, reward) pair for one host.
///
/// Deleted athletes are skipped. Host counts come from the per-host
/// counter, which equals the number of the athlete's check-ins there.
pub fn find_one_away(
    host_id: &str,
    athletes: &[Athlete],
    global_rewards: &[Reward],
    host_rewards: &[Reward],
) -> OneAway {
    let mut result = OneAway::default();
    for athlete in athletes.iter().filter(|a| !a.deleted) {
        let host_count = athlete.host_count(host_id);
        for reward in global_rewards {
            if reward.is_one_away(athlete.global_count) {
                result.global_one_away.push(OneAwayEntry {
                    athlete_id: athlete.id().to_string(),
                    reward_id: reward.id().to_string(),
                    count: athlete.global_count,
                    required: reward.threshold,
                });
            }
        }
        for reward in host_rewards {
            if reward.is_one_away(host_count) {
                result.host_one_away.push(OneAwayEntry {
                    athlete_id: athlete.id().to_string(),
                    reward_id: reward.id().to_string(),
                    count: host_count,
                    required: reward.threshold,
                });
            }
        }
    }
    result
}

#[derive(Clone)]
pub struct RewardEngine {
    repos: Repositories,
}

impl RewardEngine {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn athlete(&self, athlete_id: &str) -> Result<Athlete> {
        match self.repos.athletes.get(athlete_id).await? {
            Some(athlete) if !athlete.deleted => Ok(athlete),
            _ => Err(AppError::NotFound(format!("Athlete {}", athlete_id))),
        }
    }

    /// Members of the host (athletes who signed its disclaimer) one short
    /// of a global or host reward.
    pub async fn one_away_for_host(&self, host_id: &str) -> Result<OneAway> {
        let (athletes, global_rewards, host_rewards) = tokio::try_join!(
            self.repos.athletes.list_all(),
            self.repos.rewards.list_global(),
            self.repos.rewards.list_for_host(host_id),
        )?;
        let members: Vec<Athlete> = athletes
            .into_iter()
            .filter(|a| a.has_signed(host_id))
            .collect();

        let result = find_one_away(host_id, &members, &global_rewards, &host_rewards);
        tracing::debug!(
            host_id = %host_id,
            members = members.len(),
            global = result.global_one_away.len(),
            host = result.host_one_away.len(),
            "One-away evaluated"
        );
        Ok(result)
    }

    /// Global and host-scoped progress of one athlete.
    pub async fn reward_progress(
        &self,
        athlete_id: &str,
        host_id: &str,
    ) -> Result<Vec<RewardProgress>> {
        let athlete = self.athlete(athlete_id).await?;
        let (global_rewards, host_rewards) = tokio::try_join!(
            self.repos.rewards.list_global(),
            self.repos.rewards.list_for_host(host_id),
        )?;

        let host_count = athlete.host_count(host_id);
        Ok(global_rewards
            .iter()
            .map(|r| RewardProgress::new(r, athlete.global_count))
            .chain(
                host_rewards
                    .iter()
                    .map(|r| RewardProgress::new(r, host_count)),
            )
            .collect())
    }

    pub async fn pet_reward_progress(&self, pet_id: &str) -> Result<Vec<RewardProgress>> {
        if self.repos.pets.get(pet_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Pet {}", pet_id)));
        }
        let (count, pet_rewards) = tokio::try_join!(
            self.repos.pet_check_ins.count_for_pet(pet_id),
            self.repos.rewards.list_pet(),
        )?;
        Ok(pet_rewards
            .iter()
            .map(|r| RewardProgress::new(r, count))
            .collect())
    }

    /// Progress of every pet of an athlete, counted concurrently.
    pub async fn pet_progress_for_athlete(&self, athlete_id: &str) -> Result<Vec<PetProgress>> {
        let (pets, pet_rewards) = tokio::try_join!(
            self.repos.pets.list_for_athlete(athlete_id),
            self.repos.rewards.list_pet(),
        )?;
        let pet_rewards = &pet_rewards;

        stream::iter(pets)
            .map(|pet: Pet| async move {
                let count = self.repos.pet_check_ins.count_for_pet(pet.id()).await?;
                Ok::<_, AppError>(PetProgress {
                    pet_id: pet.id().to_string(),
                    rewards: pet_rewards
                        .iter()
                        .map(|r| RewardProgress::new(r, count))
                        .collect(),
                    name: pet.name,
                })
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<PetProgress>>>()
            .await
            .into_iter()
            .collect()
    }

    /// Record that a reward was granted.
    ///
    /// Earlier claims of the same reward are allowed to exist.
    pub async fn create_claim(&self, new: NewRewardClaim) -> Result<RewardClaim> {
        self.athlete(&new.athlete_id).await?;
        let reward = self
            .repos
            .rewards
            .get(&new.reward_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reward {}", new.reward_id)))?;

        match reward.scope {
            RewardScope::Host if reward.host_id.as_deref() != Some(new.host_id.as_str()) => {
                return Err(AppError::BadRequest(format!(
                    "Reward {} belongs to another host",
                    reward.id()
                )));
            }
            RewardScope::Pet => {
                let pet_id = new.pet_id.as_deref().ok_or_else(|| {
                    AppError::BadRequest("Pet rewards need a pet".to_string())
                })?;
                self.repos
                    .pets
                    .get(pet_id)
                    .await?
                    .filter(|pet| pet.athlete_id == new.athlete_id)
                    .ok_or_else(|| AppError::NotFound(format!("Pet {}", pet_id)))?;
            }
            _ => {}
        }

        self.repos
            .locations
            .get(&new.location_id)
            .await?
            .filter(|location| location.host_id == new.host_id)
            .ok_or_else(|| AppError::NotFound(format!("Location {}", new.location_id)))?;

        let claim = self.repos.claims.create(new).await?;
        tracing::info!(
            athlete_id = %claim.athlete_id,
            reward_id = %claim.reward_id,
            host_id = %claim.host_id,
            location_id = %claim.location_id,
            "Reward claimed"
        );
        Ok(claim)
    }

    /// Define a reward. Host rewards are also listed on the host record.
    pub async fn create_reward(&self, mut new: NewReward) -> Result<Reward> {
        if new.threshold == 0 {
            return Err(AppError::BadRequest(
                "Reward threshold must be at least 1".to_string(),
            ));
        }
        if new.name.trim().is_empty() {
            return Err(AppError::BadRequest("Reward name is required".to_string()));
        }

        match new.scope {
            RewardScope::Host => {
                let host_id = new.host_id.as_deref().ok_or_else(|| {
                    AppError::BadRequest("Host rewards need a host".to_string())
                })?;
                self.repos
                    .hosts
                    .get(host_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Host {}", host_id)))?;
            }
            RewardScope::Global | RewardScope::Pet => new.host_id = None,
        }

        let reward = self.repos.rewards.create(new).await?;
        if let Some(host_id) = reward.host_id.as_deref() {
            if let Err(e) = self.repos.hosts.add_reward(host_id, reward.id()).await {
                if let Err(cleanup) = self.repos.rewards.delete(reward.id()).await {
                    tracing::error!(
                        reward_id = %reward.id(),
                        error = %e,
                        cleanup_error = %cleanup,
                        "Host update failed and reward could not be removed"
                    );
                }
                return Err(e);
            }
        }

        tracing::info!(
            reward_id = %reward.id(),
            scope = ?reward.scope,
            threshold = reward.threshold,
            "Reward created"
        );
        Ok(reward)
    }

    pub async fn list_claims_for_host(
        &self,
        host_id: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<RewardClaim>> {
        self.repos.claims.list_for_host(host_id, limit, cursor).await
    }

    pub async fn list_claims_for_athlete(&self, athlete_id: &str) -> Result<Vec<RewardClaim>> {
        self.repos.claims.list_for_athlete(athlete_id).await
    }
}
