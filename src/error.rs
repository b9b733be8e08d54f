// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Not allowed: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Athlete {athlete_id} must sign the disclaimer of host {host_id} first")]
    DisclaimerRequired { athlete_id: String, host_id: String },

    #[error("Athlete {athlete_id} already checked in this week ({activity_id})")]
    AlreadyCheckedIn {
        athlete_id: String,
        activity_id: String,
    },

    #[error("Check-in {0} is not in the current week")]
    NotCurrentWeek(String),

    #[error("Location {location_id} already offers {max} activities")]
    ActivityLimit { location_id: String, max: usize },

    #[error("No location selected")]
    NoLocationSelected,

    #[error("Cannot delete the last location of host {0}")]
    LastLocation(String),

    #[error("Concurrent modification: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Precondition failures are user-facing and never logged as errors.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            AppError::DisclaimerRequired { .. }
                | AppError::AlreadyCheckedIn { .. }
                | AppError::NotCurrentWeek(_)
                | AppError::ActivityLimit { .. }
                | AppError::NoLocationSelected
                | AppError::LastLocation(_)
        )
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => AppError::NotFound(key),
            StoreError::AlreadyExists(key) => AppError::Conflict(format!("{} already exists", key)),
            StoreError::ConditionFailed(key) => AppError::Conflict(key),
            other => AppError::Database(other.to_string()),
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let details = Some(self.to_string());
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", details),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", details),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request", details),
            AppError::DisclaimerRequired { .. } => (
                StatusCode::PRECONDITION_FAILED,
                "disclaimer_required",
                details,
            ),
            AppError::NoLocationSelected => (
                StatusCode::PRECONDITION_FAILED,
                "no_location_selected",
                details,
            ),
            AppError::AlreadyCheckedIn { .. } => {
                (StatusCode::CONFLICT, "already_checked_in", details)
            }
            AppError::NotCurrentWeek(_) => (StatusCode::CONFLICT, "not_current_week", details),
            AppError::ActivityLimit { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "activity_limit", details)
            }
            AppError::LastLocation(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "last_location", details)
            }
            AppError::Conflict(msg) => {
                tracing::warn!(error = %msg, "Write conflict");
                (StatusCode::CONFLICT, "conflict", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and services
pub type Result<T> = std::result::Result<T, AppError>;
