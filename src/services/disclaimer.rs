// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Disclaimer gate: per-host liability disclaimer signatures.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::db::UpdateOp;
use crate::error::{AppError, Result};
use crate::models::{fields, Athlete};
use crate::repo::Repositories;
use crate::time_utils::{format_timestamp, parse_timestamp, Clock};

/// Signature state of one (athlete, host) pair, with the text to sign.
#[derive(Debug, Clone, PartialEq)]
pub struct DisclaimerStatus {
    pub signed_at: Option<DateTime<Utc>>,
    pub text: String,
}

#[derive(Clone)]
pub struct DisclaimerGate {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl DisclaimerGate {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    async fn athlete(&self, athlete_id: &str) -> Result<Athlete> {
        match self.repos.athletes.get(athlete_id).await? {
            Some(athlete) if !athlete.deleted => Ok(athlete),
            _ => Err(AppError::NotFound(format!("Athlete {}", athlete_id))),
        }
    }

    pub async fn has_signed(&self, athlete_id: &str, host_id: &str) -> Result<bool> {
        Ok(self.athlete(athlete_id).await?.has_signed(host_id))
    }

    pub async fn status(&self, athlete_id: &str, host_id: &str) -> Result<DisclaimerStatus> {
        let host = self
            .repos
            .hosts
            .get(host_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Host {}", host_id)))?;
        let athlete = self.athlete(athlete_id).await?;

        let signed_at = match athlete.disclaimers.get(host_id) {
            Some(raw) => Some(parse_timestamp(raw).map_err(|e| {
                AppError::Database(format!("Bad disclaimer timestamp for {}: {}", athlete_id, e))
            })?),
            None => None,
        };
        Ok(DisclaimerStatus {
            signed_at,
            text: host.disclaimer,
        })
    }

    /// Record a signature at the current time.
    ///
    /// Signing again overwrites the timestamp; there is still one signature.
    pub async fn sign(&self, athlete_id: &str, host_id: &str) -> Result<Athlete> {
        if self.repos.hosts.get(host_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Host {}", host_id)));
        }
        let signed_at = format_timestamp(self.clock.now_millis());

        let athlete = self
            .repos
            .athletes
            .mutate(athlete_id, |athlete| {
                if athlete.deleted {
                    return Err(AppError::NotFound(format!("Athlete {}", athlete_id)));
                }
                Ok(vec![UpdateOp::set_entry(
                    fields::DISCLAIMERS,
                    host_id,
                    signed_at.as_str(),
                )])
            })
            .await?;

        tracing::info!(athlete_id = %athlete_id, host_id = %host_id, "Disclaimer signed");
        Ok(athlete)
    }
}
