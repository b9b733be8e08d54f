// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Athlete (member) model.
//!
//! Besides the profile, an athlete carries the denormalized state that the
//! check-in engine maintains: per-host weekly markers (`lw`), the lifetime
//! counter (`gc`), per-host check-in counts (`hc`), disclaimer signatures
//! (`ds`) and a revision (`rv`) used to guard concurrent writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::UpdateOp;
use crate::models::{fields, set_if_some, ItemMeta, MarkerError, Patch, WeeklyMarker};
use crate::time_utils::WeekCalendar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    #[serde(flatten)]
    pub meta: ItemMeta,
    #[serde(rename = "fn")]
    pub first_name: String,
    #[serde(rename = "ln")]
    pub last_name: String,
    #[serde(rename = "em", default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Emergency contact name
    #[serde(rename = "ecn", default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_name: Option<String>,
    /// Emergency contact phone
    #[serde(rename = "ecp", default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact_phone: Option<String>,
    /// Host ID -> encoded `WeeklyMarker`
    #[serde(rename = "lw", default)]
    pub last_week: HashMap<String, String>,
    /// Lifetime count of weeks with at least one check-in
    #[serde(rename = "gc", default)]
    pub global_count: u32,
    /// Host ID -> number of check-ins at that host
    #[serde(rename = "hc", default)]
    pub host_counts: HashMap<String, u32>,
    /// Host ID -> disclaimer signed timestamp
    #[serde(rename = "ds", default)]
    pub disclaimers: HashMap<String, String>,
    /// Soft-delete flag
    #[serde(rename = "del", default)]
    pub deleted: bool,
    #[serde(rename = "rv", default)]
    pub revision: u64,
}

/// Weekly state of an (athlete, host) pair, derived from the marker map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeekState {
    Eligible,
    CheckedInThisWeek {
        activity_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl Athlete {
    pub fn id(&self) -> &str {
        &self.meta.id
    }

    /// Decoded marker for a host, if one is stored.
    pub fn marker(&self, host_id: &str) -> Result<Option<WeeklyMarker>, MarkerError> {
        self.last_week
            .get(host_id)
            .map(|raw| raw.parse())
            .transpose()
    }

    pub fn has_signed(&self, host_id: &str) -> bool {
        self.disclaimers.contains_key(host_id)
    }

    pub fn host_count(&self, host_id: &str) -> u32 {
        self.host_counts.get(host_id).copied().unwrap_or(0)
    }

    pub fn week_state(
        &self,
        host_id: &str,
        calendar: &WeekCalendar,
        now: DateTime<Utc>,
    ) -> Result<WeekState, MarkerError> {
        Ok(match self.marker(host_id)? {
            Some(marker) if calendar.same_week(marker.timestamp, now) => {
                WeekState::CheckedInThisWeek {
                    activity_id: marker.activity_id,
                    timestamp: marker.timestamp,
                }
            }
            _ => WeekState::Eligible,
        })
    }

    /// Hosts whose marker falls in the current week.
    ///
    /// Undecodable markers are skipped; they cannot be in any week.
    pub fn active_hosts(&self, calendar: &WeekCalendar, now: DateTime<Utc>) -> Vec<&str> {
        self.last_week
            .iter()
            .filter_map(|(host_id, raw)| {
                let marker: WeeklyMarker = match raw.parse() {
                    Ok(marker) => marker,
                    Err(e) => {
                        tracing::warn!(athlete_id = %self.meta.id, host_id = %host_id, error = %e, "Ignoring malformed weekly marker");
                        return None;
                    }
                };
                calendar
                    .same_week(marker.timestamp, now)
                    .then_some(host_id.as_str())
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct NewAthlete {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

/// Profile fields an athlete or host staff may edit.
///
/// Counters, markers and signatures are deliberately absent.
#[derive(Debug, Clone, Default)]
pub struct AthletePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
}

impl AthletePatch {
    pub fn changes_name(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }
}

impl Patch for AthletePatch {
    fn into_ops(self) -> Vec<UpdateOp> {
        let mut ops = Vec::new();
        set_if_some(&mut ops, fields::FIRST_NAME, self.first_name);
        set_if_some(&mut ops, fields::LAST_NAME, self.last_name);
        set_if_some(&mut ops, fields::EMAIL, self.email);
        set_if_some(&mut ops, fields::EMERGENCY_NAME, self.emergency_contact_name);
        set_if_some(&mut ops, fields::EMERGENCY_PHONE, self.emergency_contact_phone);
        ops
    }

    fn is_empty(&self) -> bool {
        !self.changes_name()
            && self.email.is_none()
            && self.emergency_contact_name.is_none()
            && self.emergency_contact_phone.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Item;
    use crate::keys::Keys;
    use crate::models::EntityType;
    use crate::time_utils::parse_timestamp;

    fn athlete() -> Athlete {
        Athlete {
            meta: ItemMeta::new(
                Keys::athlete("a1", "Smith", "Jane", false),
                EntityType::Athlete,
                "a1".to_string(),
                "2024-01-01T00:00:00.000Z",
            ),
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            email: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            last_week: HashMap::new(),
            global_count: 0,
            host_counts: HashMap::new(),
            disclaimers: HashMap::new(),
            deleted: false,
            revision: 0,
        }
    }

    #[test]
    fn test_persisted_field_names() {
        let mut a = athlete();
        a.global_count = 3;
        a.last_week
            .insert("h1".to_string(), "2024-01-15T10:00:00.000Z#run".to_string());

        let value = serde_json::to_value(&a).unwrap();
        assert_eq!(value["fn"], "Jane");
        assert_eq!(value["ln"], "Smith");
        assert_eq!(value["gc"], 3);
        assert_eq!(value["lw"]["h1"], "2024-01-15T10:00:00.000Z#run");
        assert_eq!(value["pk"], "ATH#a1");
        assert_eq!(value["sk"], "METADATA");
        assert_eq!(value["et"], "ATHLETE");
        assert!(value.get("em").is_none());
    }

    #[test]
    fn test_patch_ops_apply_to_stored_item() {
        let mut item = Item::from_entity(&athlete()).unwrap();
        let patch = AthletePatch {
            email: Some("jane@example.com".to_string()),
            ..Default::default()
        };
        item.apply(&patch.into_ops()).unwrap();

        let updated: Athlete = item.into_entity().unwrap();
        assert_eq!(updated.email.as_deref(), Some("jane@example.com"));
        assert_eq!(updated.first_name, "Jane");
    }

    #[test]
    fn test_week_state_and_active_hosts() {
        let cal = WeekCalendar::utc();
        let now = parse_timestamp("2024-01-17T12:00:00Z").unwrap();
        let mut a = athlete();
        a.last_week
            .insert("h1".to_string(), "2024-01-15T10:00:00.000Z#run".to_string());
        a.last_week
            .insert("h2".to_string(), "2024-01-08T10:00:00.000Z#bike".to_string());

        assert_eq!(
            a.week_state("h1", &cal, now).unwrap(),
            WeekState::CheckedInThisWeek {
                activity_id: "run".to_string(),
                timestamp: parse_timestamp("2024-01-15T10:00:00Z").unwrap(),
            }
        );
        assert_eq!(a.week_state("h2", &cal, now).unwrap(), WeekState::Eligible);
        assert_eq!(a.week_state("h3", &cal, now).unwrap(), WeekState::Eligible);
        assert_eq!(a.active_hosts(&cal, now), vec!["h1"]);
    }
}
