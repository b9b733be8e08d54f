// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance events: member check-ins and companion (pet) check-ins.
//!
//! Both are event items keyed by their creation timestamp inside the owner's
//! partition. The only permitted mutation is re-assigning a member check-in's
//! activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ItemMeta;
use crate::time_utils::parse_timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    #[serde(flatten)]
    pub meta: ItemMeta,
    #[serde(rename = "aid")]
    pub athlete_id: String,
    #[serde(rename = "hid")]
    pub host_id: String,
    #[serde(rename = "lid")]
    pub location_id: String,
    #[serde(rename = "act")]
    pub activity_id: String,
    /// RFC3339 (ms), identical to the sort-key suffix
    #[serde(rename = "ts")]
    pub timestamp: String,
}

impl CheckIn {
    pub fn occurred_at(&self) -> Result<DateTime<Utc>, chrono::ParseError> {
        parse_timestamp(&self.timestamp)
    }
}

/// Companion attendance event. Never counted toward member rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetCheckIn {
    #[serde(flatten)]
    pub meta: ItemMeta,
    #[serde(rename = "aid")]
    pub athlete_id: String,
    #[serde(rename = "pid")]
    pub pet_id: String,
    #[serde(rename = "hid")]
    pub host_id: String,
    #[serde(rename = "lid")]
    pub location_id: String,
    #[serde(rename = "ts")]
    pub timestamp: String,
}
