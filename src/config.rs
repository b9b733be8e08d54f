// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use crate::time_utils::WeekCalendar;

/// Which item store the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    pub store_backend: StoreBackend,
    /// Offset from UTC, in minutes, at which calendar weeks start
    pub week_utc_offset_minutes: i32,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for host admin passphrases (raw bytes)
    pub passphrase_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development. Cloud Run injects
    /// secrets as environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let week_utc_offset_minutes = match env::var("WEEK_UTC_OFFSET_MINUTES") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("WEEK_UTC_OFFSET_MINUTES", raw.clone()))?,
            Err(_) => 0,
        };

        let config = Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend: env::var("STORE_BACKEND")
                .unwrap_or_else(|_| "firestore".to_string())
                .parse()?,
            week_utc_offset_minutes,
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            passphrase_key: env::var("PASSPHRASE_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("PASSPHRASE_KEY"))?
                .into_bytes(),
        };

        // Reject out-of-range offsets at startup rather than per request.
        config.week_calendar()?;
        Ok(config)
    }

    /// Config for tests: in-memory store, UTC weeks, fixed keys.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            week_utc_offset_minutes: 0,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            passphrase_key: b"test_passphrase_key".to_vec(),
        }
    }

    pub fn week_calendar(&self) -> Result<WeekCalendar, ConfigError> {
        WeekCalendar::with_offset_minutes(self.week_utc_offset_minutes).ok_or_else(|| {
            ConfigError::Invalid(
                "WEEK_UTC_OFFSET_MINUTES",
                self.week_utc_offset_minutes.to_string(),
            )
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
