// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Staff API: check-ins, weekly state, disclaimers, rewards.

use crate::error::{AppError, Result};
use crate::middleware::SessionContext;
use crate::models::{CheckIn, NewRewardClaim, PetCheckIn, RewardClaim, WeekState};
use crate::repo::Page;
use crate::routes::validated;
use crate::services::{OneAway, RewardProgress};
use crate::time_utils::{format_timestamp, parse_timestamp};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/check-ins", post(create_check_in).get(list_check_ins))
        .route(
            "/api/check-ins/{athlete_id}/{ts}",
            put(update_check_in).delete(delete_check_in),
        )
        .route("/api/pet-check-ins", post(create_pet_check_in))
        .route("/api/athletes/{id}/week", get(get_week_state))
        .route("/api/athletes/{id}/rewards", get(get_reward_progress))
        .route("/api/disclaimers", post(sign_disclaimer))
        .route("/api/disclaimers/{athlete_id}", get(get_disclaimer))
        .route("/api/rewards/one-away", get(get_one_away))
        .route("/api/reward-claims", post(create_reward_claim))
}

// ─── Check-ins ───────────────────────────────────────────────

/// Check-in as returned to staff clients.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckInResponse {
    pub athlete_id: String,
    pub host_id: String,
    pub location_id: String,
    pub activity_id: String,
    pub timestamp: String,
}

impl From<CheckIn> for CheckInResponse {
    fn from(c: CheckIn) -> Self {
        Self {
            athlete_id: c.athlete_id,
            host_id: c.host_id,
            location_id: c.location_id,
            activity_id: c.activity_id,
            timestamp: c.timestamp,
        }
    }
}

#[derive(Deserialize, Validate)]
struct CreateCheckInRequest {
    #[validate(length(min = 1, max = 64))]
    athlete_id: String,
    #[validate(length(min = 1, max = 64))]
    activity_id: String,
}

/// Check an athlete in at the session's location.
async fn create_check_in(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateCheckInRequest>,
) -> Result<(StatusCode, Json<CheckInResponse>)> {
    let body = validated(body)?;
    let host_id = session.host_id()?;
    let location_id = session.location_id()?;

    let check_in = state
        .check_ins
        .create(&body.athlete_id, host_id, location_id, &body.activity_id)
        .await?;
    Ok((StatusCode::CREATED, Json(check_in.into())))
}

#[derive(Deserialize, Validate)]
struct UpdateCheckInRequest {
    #[validate(length(min = 1, max = 64))]
    activity_id: String,
}

async fn update_check_in(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path((athlete_id, ts)): Path<(String, String)>,
    Json(body): Json<UpdateCheckInRequest>,
) -> Result<Json<CheckInResponse>> {
    let body = validated(body)?;
    let check_in = state
        .check_ins
        .update(&athlete_id, session.host_id()?, &ts, &body.activity_id)
        .await?;
    Ok(Json(check_in.into()))
}

/// Undo a check-in made at the session's host.
async fn delete_check_in(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path((athlete_id, ts)): Path<(String, String)>,
) -> Result<StatusCode> {
    let host_id = session.host_id()?;
    let at = parse_timestamp(&ts)
        .map_err(|e| AppError::BadRequest(format!("Invalid timestamp '{}': {}", ts, e)))?;
    state
        .repos
        .check_ins
        .get(&athlete_id, &format_timestamp(at))
        .await?
        .filter(|c| c.host_id == host_id)
        .ok_or_else(|| AppError::NotFound(format!("Check-in {}/{}", athlete_id, ts)))?;

    state.check_ins.delete(&athlete_id, &ts).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct CheckInsQuery {
    /// Calendar date (YYYY-MM-DD); lists that day instead of recent history.
    date: Option<NaiveDate>,
    cursor: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CheckInsResponse {
    pub check_ins: Vec<CheckInResponse>,
    pub next_cursor: Option<String>,
}

/// The session host's check-ins: one day, or newest first with a cursor.
async fn list_check_ins(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Query(params): Query<CheckInsQuery>,
) -> Result<Json<CheckInsResponse>> {
    let host_id = session.host_id()?;

    let Page { items, next_cursor } = match params.date {
        Some(date) => Page {
            items: state
                .check_ins
                .list_on_date(date)
                .await?
                .into_iter()
                .filter(|c| c.host_id == host_id)
                .collect(),
            next_cursor: None,
        },
        None => {
            state
                .check_ins
                .list_for_host(host_id, params.limit, params.cursor.as_deref())
                .await?
        }
    };

    Ok(Json(CheckInsResponse {
        check_ins: items.into_iter().map(CheckInResponse::from).collect(),
        next_cursor,
    }))
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PetCheckInResponse {
    pub athlete_id: String,
    pub pet_id: String,
    pub host_id: String,
    pub location_id: String,
    pub timestamp: String,
}

impl From<PetCheckIn> for PetCheckInResponse {
    fn from(c: PetCheckIn) -> Self {
        Self {
            athlete_id: c.athlete_id,
            pet_id: c.pet_id,
            host_id: c.host_id,
            location_id: c.location_id,
            timestamp: c.timestamp,
        }
    }
}

#[derive(Deserialize, Validate)]
struct CreatePetCheckInRequest {
    #[validate(length(min = 1, max = 64))]
    athlete_id: String,
    #[validate(length(min = 1, max = 64))]
    pet_id: String,
}

async fn create_pet_check_in(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreatePetCheckInRequest>,
) -> Result<(StatusCode, Json<PetCheckInResponse>)> {
    let body = validated(body)?;
    let check_in = state
        .check_ins
        .create_pet_check_in(
            &body.athlete_id,
            &body.pet_id,
            session.host_id()?,
            session.location_id()?,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(check_in.into())))
}

// ─── Weekly state ────────────────────────────────────────────

#[derive(Serialize, Debug, PartialEq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct WeekStateResponse {
    pub checked_in_this_week: bool,
    pub activity_id: Option<String>,
    pub timestamp: Option<String>,
}

async fn get_week_state(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(athlete_id): Path<String>,
) -> Result<Json<WeekStateResponse>> {
    let week = state
        .check_ins
        .week_state(&athlete_id, session.host_id()?)
        .await?;
    Ok(Json(match week {
        WeekState::Eligible => WeekStateResponse {
            checked_in_this_week: false,
            activity_id: None,
            timestamp: None,
        },
        WeekState::CheckedInThisWeek {
            activity_id,
            timestamp,
        } => WeekStateResponse {
            checked_in_this_week: true,
            activity_id: Some(activity_id),
            timestamp: Some(format_timestamp(timestamp)),
        },
    }))
}

async fn get_reward_progress(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(athlete_id): Path<String>,
) -> Result<Json<Vec<RewardProgress>>> {
    let progress = state
        .rewards
        .reward_progress(&athlete_id, session.host_id()?)
        .await?;
    Ok(Json(progress))
}

// ─── Disclaimers ─────────────────────────────────────────────

#[derive(Deserialize, Validate)]
struct SignDisclaimerRequest {
    #[validate(length(min = 1, max = 64))]
    athlete_id: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DisclaimerResponse {
    pub signed: bool,
    pub signed_at: Option<String>,
    pub text: String,
}

async fn sign_disclaimer(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<SignDisclaimerRequest>,
) -> Result<Json<DisclaimerResponse>> {
    let body = validated(body)?;
    let host_id = session.host_id()?;
    state.disclaimers.sign(&body.athlete_id, host_id).await?;
    disclaimer_response(&state, &body.athlete_id, host_id).await
}

async fn get_disclaimer(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(athlete_id): Path<String>,
) -> Result<Json<DisclaimerResponse>> {
    disclaimer_response(&state, &athlete_id, session.host_id()?).await
}

async fn disclaimer_response(
    state: &AppState,
    athlete_id: &str,
    host_id: &str,
) -> Result<Json<DisclaimerResponse>> {
    let status = state.disclaimers.status(athlete_id, host_id).await?;
    Ok(Json(DisclaimerResponse {
        signed: status.signed_at.is_some(),
        signed_at: status.signed_at.map(format_timestamp),
        text: status.text,
    }))
}

// ─── Rewards ─────────────────────────────────────────────────

async fn get_one_away(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<OneAway>> {
    Ok(Json(
        state.rewards.one_away_for_host(session.host_id()?).await?,
    ))
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ClaimResponse {
    pub athlete_id: String,
    pub reward_id: String,
    pub host_id: String,
    pub location_id: String,
    pub pet_id: Option<String>,
    pub timestamp: String,
}

impl From<RewardClaim> for ClaimResponse {
    fn from(c: RewardClaim) -> Self {
        Self {
            athlete_id: c.athlete_id,
            reward_id: c.reward_id,
            host_id: c.host_id,
            location_id: c.location_id,
            pet_id: c.pet_id,
            timestamp: c.timestamp,
        }
    }
}

#[derive(Deserialize, Validate)]
struct CreateClaimRequest {
    #[validate(length(min = 1, max = 64))]
    athlete_id: String,
    #[validate(length(min = 1, max = 64))]
    reward_id: String,
    #[validate(length(min = 1, max = 64))]
    pet_id: Option<String>,
}

/// Grant a reward at the session's location.
async fn create_reward_claim(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>)> {
    let body = validated(body)?;
    let claim = state
        .rewards
        .create_claim(NewRewardClaim {
            athlete_id: body.athlete_id,
            reward_id: body.reward_id,
            host_id: session.host_id()?.to_string(),
            location_id: session.location_id()?.to_string(),
            pet_id: body.pet_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}
