// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for timestamps and calendar weeks.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, IsoWeek, NaiveDate, NaiveTime, Offset,
    SecondsFormat, SubsecRound, Utc,
};
use std::sync::Mutex;

/// Format a UTC timestamp as RFC3339 with millisecond precision and a `Z` suffix.
///
/// Fixed width, so lexical order of stored keys matches time order.
pub fn format_timestamp(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time truncated to the precision stored in keys.
    fn now_millis(&self) -> DateTime<Utc> {
        self.now().trunc_subsecs(3)
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Calendar-week boundaries (ISO weeks, Monday start) at a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct WeekCalendar {
    offset: FixedOffset,
}

impl Default for WeekCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl WeekCalendar {
    pub fn utc() -> Self {
        Self {
            offset: Utc.fix(),
        }
    }

    /// Returns `None` for offsets outside ±24h.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(|offset| Self { offset })
    }

    /// Calendar date of `t` at this offset.
    pub fn local_date(&self, t: DateTime<Utc>) -> NaiveDate {
        t.with_timezone(&self.offset).date_naive()
    }

    pub fn iso_week(&self, t: DateTime<Utc>) -> IsoWeek {
        self.local_date(t).iso_week()
    }

    /// True when both instants fall in the same ISO week.
    pub fn same_week(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.iso_week(a) == self.iso_week(b)
    }

    /// Start (Monday 00:00 local) of the week containing `t`, in UTC.
    pub fn week_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let date = self.local_date(t);
        let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let local_midnight = monday.and_time(NaiveTime::default());
        let utc_naive =
            local_midnight - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        DateTime::from_naive_utc_and_offset(utc_naive, Utc)
    }
}
