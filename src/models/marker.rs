// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-host "last week" marker: `<timestamp>#<activityId>`.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::time_utils::{format_timestamp, parse_timestamp};

/// Most recent check-in of an athlete at one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyMarker {
    pub timestamp: DateTime<Utc>,
    pub activity_id: String,
}

impl WeeklyMarker {
    pub fn new(timestamp: DateTime<Utc>, activity_id: impl Into<String>) -> Self {
        Self {
            timestamp,
            activity_id: activity_id.into(),
        }
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Same check-in, different activity.
    pub fn with_activity(&self, activity_id: impl Into<String>) -> Self {
        Self::new(self.timestamp, activity_id)
    }
}

impl fmt::Display for WeeklyMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", format_timestamp(self.timestamp), self.activity_id)
    }
}

impl FromStr for WeeklyMarker {
    type Err = MarkerError;

    /// Timestamps never contain `#`, so the first separator splits the value.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (ts, activity_id) = raw
            .split_once('#')
            .ok_or_else(|| MarkerError::MissingSeparator(raw.to_string()))?;
        if activity_id.is_empty() {
            return Err(MarkerError::EmptyActivity(raw.to_string()));
        }
        let timestamp =
            parse_timestamp(ts).map_err(|e| MarkerError::InvalidTimestamp(format!("{}: {}", ts, e)))?;
        Ok(Self::new(timestamp, activity_id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkerError {
    #[error("Marker has no '#' separator: {0}")]
    MissingSeparator(String),

    #[error("Marker has an empty activity: {0}")]
    EmptyActivity(String),

    #[error("Marker timestamp is invalid: {0}")]
    InvalidTimestamp(String),
}
