// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Host administration: hosts, their locations, and the activity catalog.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::{
    Activity, ActivityPatch, Host, HostPatch, Location, NewActivity, NewHost, NewLocation,
    MAX_ACTIVITIES_PER_LOCATION,
};
use crate::repo::Repositories;

type HmacSha256 = Hmac<Sha256>;

/// Input for [`HostAdmin::create_host`]. The passphrase is plaintext here
/// and only its keyed hash is stored.
#[derive(Debug, Clone)]
pub struct HostRegistration {
    pub name: String,
    pub email: String,
    pub identity_ref: Option<String>,
    pub passphrase: String,
    pub disclaimer: String,
}

#[derive(Clone)]
pub struct HostAdmin {
    repos: Repositories,
    passphrase_key: Vec<u8>,
}

impl HostAdmin {
    pub fn new(repos: Repositories, passphrase_key: Vec<u8>) -> Self {
        Self {
            repos,
            passphrase_key,
        }
    }

    fn hash_passphrase(&self, passphrase: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.passphrase_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid passphrase key: {}", e)))?;
        mac.update(passphrase.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn host(&self, host_id: &str) -> Result<Host> {
        self.repos
            .hosts
            .get(host_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Host {}", host_id)))
    }

    async fn location_of(&self, host_id: &str, location_id: &str) -> Result<Location> {
        self.repos
            .locations
            .get(location_id)
            .await?
            .filter(|location| location.host_id == host_id)
            .ok_or_else(|| AppError::NotFound(format!("Location {}", location_id)))
    }

    pub async fn create_host(&self, registration: HostRegistration) -> Result<Host> {
        if registration.passphrase.is_empty() {
            return Err(AppError::BadRequest("Passphrase is required".to_string()));
        }
        if self
            .repos
            .hosts
            .find_by_email(&registration.email)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "A host with email {} exists",
                registration.email
            )));
        }

        let passphrase_hash = self.hash_passphrase(&registration.passphrase)?;
        self.repos
            .hosts
            .create(NewHost {
                name: registration.name,
                email: registration.email,
                identity_ref: registration.identity_ref,
                passphrase_hash,
                disclaimer: registration.disclaimer,
            })
            .await
    }

    /// Constant-time check of an admin passphrase.
    pub async fn verify_passphrase(&self, host_id: &str, passphrase: &str) -> Result<bool> {
        let host = self.host(host_id).await?;
        let candidate = self.hash_passphrase(passphrase)?;
        let matches: bool = candidate
            .as_bytes()
            .ct_eq(host.passphrase_hash.as_bytes())
            .into();
        if !matches {
            tracing::warn!(host_id = %host_id, "Admin passphrase rejected");
        }
        Ok(matches)
    }

    pub async fn set_passphrase(&self, host_id: &str, passphrase: &str) -> Result<Host> {
        if passphrase.is_empty() {
            return Err(AppError::BadRequest("Passphrase is required".to_string()));
        }
        let passphrase_hash = self.hash_passphrase(passphrase)?;
        self.repos
            .hosts
            .update(
                host_id,
                HostPatch {
                    passphrase_hash: Some(passphrase_hash),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn set_disclaimer_text(&self, host_id: &str, text: &str) -> Result<Host> {
        self.host(host_id).await?;
        let host = self
            .repos
            .hosts
            .update(
                host_id,
                HostPatch {
                    disclaimer: Some(text.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        tracing::info!(host_id = %host_id, "Disclaimer text updated");
        Ok(host)
    }

    pub async fn create_location(
        &self,
        host_id: &str,
        name: &str,
        address: &str,
    ) -> Result<Location> {
        self.host(host_id).await?;
        let location = self
            .repos
            .locations
            .create(NewLocation {
                host_id: host_id.to_string(),
                name: name.to_string(),
                address: address.to_string(),
            })
            .await?;

        if let Err(e) = self.repos.hosts.add_location(host_id, location.id()).await {
            if let Err(cleanup) = self.repos.locations.delete(location.id()).await {
                tracing::error!(
                    host_id = %host_id,
                    location_id = %location.id(),
                    error = %e,
                    cleanup_error = %cleanup,
                    "Host update failed and location could not be removed"
                );
            }
            return Err(e);
        }

        tracing::info!(host_id = %host_id, location_id = %location.id(), "Location created");
        Ok(location)
    }

    /// Remove a location. A host always keeps at least one.
    pub async fn delete_location(&self, host_id: &str, location_id: &str) -> Result<()> {
        self.location_of(host_id, location_id).await?;
        self.repos.hosts.remove_location(host_id, location_id).await?;
        self.repos.locations.delete(location_id).await?;

        tracing::info!(host_id = %host_id, location_id = %location_id, "Location deleted");
        Ok(())
    }

    pub async fn list_locations(&self, host_id: &str) -> Result<Vec<Location>> {
        self.repos.locations.list_for_host(host_id).await
    }

    /// Offer an activity at a location, up to the per-location limit.
    ///
    /// Assigning an already offered activity is a no-op.
    pub async fn assign_activity(
        &self,
        host_id: &str,
        location_id: &str,
        activity_id: &str,
    ) -> Result<Location> {
        let location = self.location_of(host_id, location_id).await?;
        if location.offers(activity_id) {
            return Ok(location);
        }
        match self.repos.activities.get(activity_id).await? {
            Some(activity) if activity.enabled => {}
            Some(_) => {
                return Err(AppError::BadRequest(format!(
                    "Activity {} is disabled",
                    activity_id
                )))
            }
            None => return Err(AppError::NotFound(format!("Activity {}", activity_id))),
        }
        if location.activity_ids.len() >= MAX_ACTIVITIES_PER_LOCATION {
            return Err(AppError::ActivityLimit {
                location_id: location_id.to_string(),
                max: MAX_ACTIVITIES_PER_LOCATION,
            });
        }

        let mut activity_ids = location.activity_ids.clone();
        activity_ids.push(activity_id.to_string());
        let updated = self
            .repos
            .locations
            .replace_activities(location_id, &location.activity_ids, activity_ids)
            .await?;

        tracing::info!(location_id = %location_id, activity_id = %activity_id, "Activity assigned");
        Ok(updated)
    }

    pub async fn unassign_activity(
        &self,
        host_id: &str,
        location_id: &str,
        activity_id: &str,
    ) -> Result<Location> {
        let location = self.location_of(host_id, location_id).await?;
        if !location.offers(activity_id) {
            return Ok(location);
        }

        let activity_ids = location
            .activity_ids
            .iter()
            .filter(|id| id.as_str() != activity_id)
            .cloned()
            .collect();
        let updated = self
            .repos
            .locations
            .replace_activities(location_id, &location.activity_ids, activity_ids)
            .await?;

        tracing::info!(location_id = %location_id, activity_id = %activity_id, "Activity unassigned");
        Ok(updated)
    }

    pub async fn create_activity(&self, name: &str, icon: &str) -> Result<Activity> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("Activity name is required".to_string()));
        }
        let activity = self
            .repos
            .activities
            .create(NewActivity {
                name: name.trim().to_string(),
                icon: icon.to_string(),
            })
            .await?;
        tracing::info!(activity_id = %activity.id(), name = %activity.name, "Activity created");
        Ok(activity)
    }

    pub async fn set_activity_enabled(&self, activity_id: &str, enabled: bool) -> Result<Activity> {
        self.repos
            .activities
            .update(
                activity_id,
                ActivityPatch {
                    enabled: Some(enabled),
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.repos.activities.list().await
    }
}
