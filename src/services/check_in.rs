// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Check-in engine.
//!
//! Weekly state per (athlete, host) is derived from the athlete's marker
//! map, never stored as a state machine. Creating a check-in writes the
//! event record first and then updates the athlete under its revision
//! guard; if the athlete update fails the record is removed again.
//!
//! The lifetime counter `gc` counts weeks, not check-ins: it moves only
//! when the athlete goes from no active marker at any host to one (and
//! back, on undo).

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;

use crate::db::UpdateOp;
use crate::error::{AppError, Result};
use crate::keys::Keys;
use crate::models::{
    fields, new_id, Athlete, CheckIn, EntityType, ItemMeta, Location, PetCheckIn, WeekState,
    WeeklyMarker,
};
use crate::repo::{Page, Repositories};
use crate::time_utils::{format_timestamp, parse_timestamp, Clock, WeekCalendar};

#[derive(Clone)]
pub struct CheckInEngine {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    calendar: WeekCalendar,
}

/// Marker at a host, with undecodable values treated as absent.
fn marker_at(athlete: &Athlete, host_id: &str) -> Option<WeeklyMarker> {
    match athlete.marker(host_id) {
        Ok(marker) => marker,
        Err(e) => {
            tracing::warn!(athlete_id = %athlete.id(), host_id = %host_id, error = %e, "Ignoring malformed weekly marker");
            None
        }
    }
}

fn state_at(
    athlete: &Athlete,
    host_id: &str,
    calendar: &WeekCalendar,
    now: DateTime<Utc>,
) -> WeekState {
    match marker_at(athlete, host_id) {
        Some(marker) if calendar.same_week(marker.timestamp, now) => WeekState::CheckedInThisWeek {
            activity_id: marker.activity_id,
            timestamp: marker.timestamp,
        },
        _ => WeekState::Eligible,
    }
}

/// Canonical stored form of a caller-supplied timestamp.
fn canonical_timestamp(raw: &str) -> Result<(DateTime<Utc>, String)> {
    let parsed = parse_timestamp(raw)
        .map_err(|e| AppError::BadRequest(format!("Invalid timestamp '{}': {}", raw, e)))?;
    Ok((parsed, format_timestamp(parsed)))
}

impl CheckInEngine {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>, calendar: WeekCalendar) -> Self {
        Self {
            repos,
            clock,
            calendar,
        }
    }

    pub fn calendar(&self) -> &WeekCalendar {
        &self.calendar
    }

    async fn live_athlete(&self, athlete_id: &str) -> Result<Athlete> {
        match self.repos.athletes.get(athlete_id).await? {
            Some(athlete) if !athlete.deleted => Ok(athlete),
            _ => Err(AppError::NotFound(format!("Athlete {}", athlete_id))),
        }
    }

    async fn location_at(&self, host_id: &str, location_id: &str) -> Result<Location> {
        self.repos
            .locations
            .get(location_id)
            .await?
            .filter(|location| location.host_id == host_id)
            .ok_or_else(|| AppError::NotFound(format!("Location {}", location_id)))
    }

    /// The activity must exist, be enabled, and be offered at the location.
    async fn check_activity_at(
        &self,
        host_id: &str,
        location_id: &str,
        activity_id: &str,
    ) -> Result<()> {
        let location = self.location_at(host_id, location_id).await?;
        if !location.offers(activity_id) {
            return Err(AppError::BadRequest(format!(
                "Activity {} is not offered at location {}",
                activity_id, location_id
            )));
        }
        match self.repos.activities.get(activity_id).await? {
            Some(activity) if activity.enabled => Ok(()),
            Some(_) => Err(AppError::BadRequest(format!(
                "Activity {} is disabled",
                activity_id
            ))),
            None => Err(AppError::NotFound(format!("Activity {}", activity_id))),
        }
    }

    /// Record a check-in and advance the athlete's weekly state.
    pub async fn create(
        &self,
        athlete_id: &str,
        host_id: &str,
        location_id: &str,
        activity_id: &str,
    ) -> Result<CheckIn> {
        let athlete = self.live_athlete(athlete_id).await?;
        if !athlete.has_signed(host_id) {
            return Err(AppError::DisclaimerRequired {
                athlete_id: athlete_id.to_string(),
                host_id: host_id.to_string(),
            });
        }
        self.check_activity_at(host_id, location_id, activity_id)
            .await?;

        let now = self.clock.now_millis();
        if let WeekState::CheckedInThisWeek { activity_id, .. } =
            state_at(&athlete, host_id, &self.calendar, now)
        {
            return Err(AppError::AlreadyCheckedIn {
                athlete_id: athlete_id.to_string(),
                activity_id,
            });
        }

        let timestamp = format_timestamp(now);
        let check_in = CheckIn {
            meta: ItemMeta::new(
                Keys::check_in(
                    athlete_id,
                    host_id,
                    &timestamp,
                    self.calendar.local_date(now),
                ),
                EntityType::CheckIn,
                new_id(),
                &timestamp,
            ),
            athlete_id: athlete_id.to_string(),
            host_id: host_id.to_string(),
            location_id: location_id.to_string(),
            activity_id: activity_id.to_string(),
            timestamp: timestamp.clone(),
        };
        self.repos.check_ins.create(&check_in).await?;

        let calendar = self.calendar;
        let marker = WeeklyMarker::new(now, activity_id).encode();
        let mut first_this_week = false;
        let result = self
            .repos
            .athletes
            .mutate(athlete_id, |current| {
                // Re-validated on every attempt against the fresh read.
                if current.deleted {
                    return Err(AppError::NotFound(format!("Athlete {}", athlete_id)));
                }
                if !current.has_signed(host_id) {
                    return Err(AppError::DisclaimerRequired {
                        athlete_id: athlete_id.to_string(),
                        host_id: host_id.to_string(),
                    });
                }
                if let WeekState::CheckedInThisWeek { activity_id, .. } =
                    state_at(current, host_id, &calendar, now)
                {
                    return Err(AppError::AlreadyCheckedIn {
                        athlete_id: athlete_id.to_string(),
                        activity_id,
                    });
                }

                first_this_week = current.active_hosts(&calendar, now).is_empty();
                let mut ops = vec![
                    UpdateOp::set_entry(fields::LAST_WEEK, host_id, marker.as_str()),
                    UpdateOp::add_entry(fields::HOST_COUNTS, host_id, 1),
                ];
                if first_this_week {
                    ops.push(UpdateOp::add(fields::GLOBAL_COUNT, 1));
                }
                Ok(ops)
            })
            .await;

        match result {
            Ok(updated) => {
                tracing::info!(
                    athlete_id = %athlete_id,
                    host_id = %host_id,
                    location_id = %location_id,
                    activity_id = %activity_id,
                    timestamp = %timestamp,
                    first_this_week,
                    global_count = updated.global_count,
                    "Check-in recorded"
                );
                Ok(check_in)
            }
            Err(e) => {
                match self.repos.check_ins.delete(athlete_id, &timestamp).await {
                    Ok(()) => tracing::warn!(
                        athlete_id = %athlete_id,
                        timestamp = %timestamp,
                        error = %e,
                        "Athlete update failed, check-in record removed"
                    ),
                    Err(cleanup) => tracing::error!(
                        athlete_id = %athlete_id,
                        timestamp = %timestamp,
                        error = %e,
                        cleanup_error = %cleanup,
                        "Athlete update failed and check-in record could not be removed"
                    ),
                }
                Err(e)
            }
        }
    }

    /// Re-assign the activity of a check-in from the current week.
    pub async fn update(
        &self,
        athlete_id: &str,
        host_id: &str,
        timestamp: &str,
        activity_id: &str,
    ) -> Result<CheckIn> {
        let (at, timestamp) = canonical_timestamp(timestamp)?;
        let existing = self
            .repos
            .check_ins
            .get(athlete_id, &timestamp)
            .await?
            .filter(|c| c.host_id == host_id)
            .ok_or_else(|| AppError::NotFound(format!("Check-in {}/{}", athlete_id, timestamp)))?;

        let now = self.clock.now_millis();
        let calendar = self.calendar;
        let marks_this_check_in = |athlete: &Athlete| {
            marker_at(athlete, host_id)
                .filter(|m| m.timestamp == at && calendar.same_week(m.timestamp, now))
        };

        let athlete = self.live_athlete(athlete_id).await?;
        if marks_this_check_in(&athlete).is_none() {
            return Err(AppError::NotCurrentWeek(timestamp));
        }
        if existing.activity_id == activity_id {
            return Ok(existing);
        }
        self.check_activity_at(host_id, &existing.location_id, activity_id)
            .await?;

        let updated = self
            .repos
            .check_ins
            .set_activity(athlete_id, &timestamp, activity_id)
            .await?;

        let result = self
            .repos
            .athletes
            .mutate(athlete_id, |current| match marks_this_check_in(current) {
                Some(marker) => Ok(vec![UpdateOp::set_entry(
                    fields::LAST_WEEK,
                    host_id,
                    marker.with_activity(activity_id).encode(),
                )]),
                None => Err(AppError::NotCurrentWeek(timestamp.clone())),
            })
            .await;

        if let Err(e) = result {
            if let Err(revert) = self
                .repos
                .check_ins
                .set_activity(athlete_id, &timestamp, &existing.activity_id)
                .await
            {
                tracing::error!(
                    athlete_id = %athlete_id,
                    timestamp = %timestamp,
                    error = %revert,
                    "Failed to restore check-in activity"
                );
            }
            return Err(e);
        }

        tracing::info!(
            athlete_id = %athlete_id,
            host_id = %host_id,
            timestamp = %timestamp,
            from = %existing.activity_id,
            to = %activity_id,
            "Check-in activity changed"
        );
        Ok(updated)
    }

    /// Undo a check-in.
    ///
    /// The host counter always drops. The marker is cleared if it points
    /// at this check-in; `gc` drops only if that marker was active and no
    /// other host still has an active one.
    ///
    /// The event record is removed before the athlete is touched, and put
    /// back if the athlete update fails, so a failed undo can be retried.
    pub async fn delete(&self, athlete_id: &str, timestamp: &str) -> Result<()> {
        let (at, timestamp) = canonical_timestamp(timestamp)?;
        let existing = self
            .repos
            .check_ins
            .get(athlete_id, &timestamp)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Check-in {}/{}", athlete_id, timestamp)))?;
        let host_id = existing.host_id.as_str();

        self.repos.check_ins.delete(athlete_id, &timestamp).await?;

        let now = self.clock.now_millis();
        let calendar = self.calendar;
        let mut week_undone = false;
        let result = self
            .repos
            .athletes
            .mutate(athlete_id, |current| {
                week_undone = false;
                let mut ops = Vec::new();
                if current.host_count(host_id) > 0 {
                    ops.push(UpdateOp::add_entry(fields::HOST_COUNTS, host_id, -1));
                }
                if let Some(marker) = marker_at(current, host_id).filter(|m| m.timestamp == at) {
                    ops.push(UpdateOp::remove_entry(fields::LAST_WEEK, host_id));
                    let was_active = calendar.same_week(marker.timestamp, now);
                    let other_active = current
                        .active_hosts(&calendar, now)
                        .into_iter()
                        .any(|h| h != host_id);
                    if was_active && !other_active && current.global_count > 0 {
                        ops.push(UpdateOp::add(fields::GLOBAL_COUNT, -1));
                        week_undone = true;
                    }
                }
                Ok(ops)
            })
            .await;

        let updated = match result {
            Ok(updated) => updated,
            Err(e) => {
                match self.repos.check_ins.create(&existing).await {
                    Ok(()) => tracing::warn!(
                        athlete_id = %athlete_id,
                        timestamp = %timestamp,
                        error = %e,
                        "Athlete update failed, check-in record restored"
                    ),
                    Err(restore) => tracing::error!(
                        athlete_id = %athlete_id,
                        timestamp = %timestamp,
                        error = %e,
                        restore_error = %restore,
                        "Athlete update failed and check-in record could not be restored"
                    ),
                }
                return Err(e);
            }
        };

        tracing::info!(
            athlete_id = %athlete_id,
            host_id = %host_id,
            timestamp = %timestamp,
            week_undone,
            global_count = updated.global_count,
            "Check-in removed"
        );
        Ok(())
    }

    pub async fn week_state(&self, athlete_id: &str, host_id: &str) -> Result<WeekState> {
        let athlete = self
            .repos
            .athletes
            .get(athlete_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Athlete {}", athlete_id)))?;
        Ok(state_at(
            &athlete,
            host_id,
            &self.calendar,
            self.clock.now_millis(),
        ))
    }

    /// Record a companion check-in. Touches no athlete state.
    pub async fn create_pet_check_in(
        &self,
        athlete_id: &str,
        pet_id: &str,
        host_id: &str,
        location_id: &str,
    ) -> Result<PetCheckIn> {
        let athlete = self.live_athlete(athlete_id).await?;
        if !athlete.has_signed(host_id) {
            return Err(AppError::DisclaimerRequired {
                athlete_id: athlete_id.to_string(),
                host_id: host_id.to_string(),
            });
        }
        self.repos
            .pets
            .get(pet_id)
            .await?
            .filter(|pet| pet.athlete_id == athlete_id)
            .ok_or_else(|| AppError::NotFound(format!("Pet {}", pet_id)))?;
        self.location_at(host_id, location_id).await?;

        let now = self.clock.now_millis();
        let timestamp = format_timestamp(now);
        let check_in = PetCheckIn {
            meta: ItemMeta::new(
                Keys::pet_check_in(pet_id, host_id, &timestamp, self.calendar.local_date(now)),
                EntityType::PetCheckIn,
                new_id(),
                &timestamp,
            ),
            athlete_id: athlete_id.to_string(),
            pet_id: pet_id.to_string(),
            host_id: host_id.to_string(),
            location_id: location_id.to_string(),
            timestamp,
        };
        self.repos.pet_check_ins.create(&check_in).await?;

        tracing::info!(
            athlete_id = %athlete_id,
            pet_id = %pet_id,
            host_id = %host_id,
            "Pet check-in recorded"
        );
        Ok(check_in)
    }

    pub async fn delete_pet_check_in(&self, pet_id: &str, timestamp: &str) -> Result<()> {
        let (_, timestamp) = canonical_timestamp(timestamp)?;
        if self
            .repos
            .pet_check_ins
            .get(pet_id, &timestamp)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Pet check-in {}/{}",
                pet_id, timestamp
            )));
        }
        self.repos.pet_check_ins.delete(pet_id, &timestamp).await
    }

    /// Recompute per-host counters from the event partition.
    pub async fn recount_athlete(&self, athlete_id: &str) -> Result<Athlete> {
        let counts = self.repos.check_ins.count_by_host(athlete_id).await?;
        let athlete = self
            .repos
            .athletes
            .mutate(athlete_id, |current| {
                if current.host_counts == counts {
                    return Ok(Vec::new());
                }
                let map = counts
                    .iter()
                    .map(|(host, count)| (host.clone(), Value::from(*count)))
                    .collect::<serde_json::Map<_, _>>();
                Ok(vec![UpdateOp::set(fields::HOST_COUNTS, Value::Object(map))])
            })
            .await?;

        tracing::info!(athlete_id = %athlete_id, hosts = counts.len(), "Athlete counters recounted");
        Ok(athlete)
    }

    pub async fn list_for_host(
        &self,
        host_id: &str,
        limit: Option<usize>,
        cursor: Option<&str>,
    ) -> Result<Page<CheckIn>> {
        self.repos.check_ins.list_for_host(host_id, limit, cursor).await
    }

    pub async fn list_on_date(&self, date: NaiveDate) -> Result<Vec<CheckIn>> {
        self.repos.check_ins.list_on_date(date).await
    }

    pub async fn list_for_athlete(&self, athlete_id: &str) -> Result<Vec<CheckIn>> {
        self.repos.check_ins.list_for_athlete(athlete_id).await
    }
}
