// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Directory and host administration routes.

use crate::error::Result;
use crate::middleware::SessionContext;
use crate::models::{Activity, Athlete, Location, NewAthlete, NewReward, Reward, RewardScope};
use crate::routes::validated;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/athletes", get(list_athletes).post(register_athlete))
        .route("/api/locations", get(list_locations).post(create_location))
        .route("/api/locations/{id}", delete(delete_location))
        .route("/api/locations/{id}/activities", post(assign_activity))
        .route(
            "/api/locations/{id}/activities/{activity_id}",
            delete(unassign_activity),
        )
        .route("/api/activities", get(list_activities).post(create_activity))
        .route("/api/rewards", post(create_reward))
}

// ─── Athletes ────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthleteResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub global_count: u32,
}

impl From<Athlete> for AthleteResponse {
    fn from(a: Athlete) -> Self {
        Self {
            id: a.meta.id,
            first_name: a.first_name,
            last_name: a.last_name,
            email: a.email,
            global_count: a.global_count,
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AthletesResponse {
    pub athletes: Vec<AthleteResponse>,
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct AthletesQuery {
    /// Name prefix, `LAST` or `LAST#FIRST`
    q: Option<String>,
    cursor: Option<String>,
    limit: Option<usize>,
}

/// Search by name prefix when `q` is given, otherwise page through everyone.
async fn list_athletes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AthletesQuery>,
) -> Result<Json<AthletesResponse>> {
    let (athletes, next_cursor) = match params.q.as_deref() {
        Some(q) => (state.athletes.search(q).await?, None),
        None => {
            let page = state
                .athletes
                .list(params.limit, params.cursor.as_deref())
                .await?;
            (page.items, page.next_cursor)
        }
    };
    Ok(Json(AthletesResponse {
        athletes: athletes.into_iter().map(AthleteResponse::from).collect(),
        next_cursor,
    }))
}

#[derive(Deserialize, Validate)]
struct RegisterAthleteRequest {
    #[validate(length(min = 1, max = 100))]
    first_name: String,
    #[validate(length(min = 1, max = 100))]
    last_name: String,
    #[validate(email)]
    email: Option<String>,
    #[validate(length(max = 100))]
    emergency_contact_name: Option<String>,
    #[validate(length(max = 32))]
    emergency_contact_phone: Option<String>,
}

async fn register_athlete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterAthleteRequest>,
) -> Result<(StatusCode, Json<AthleteResponse>)> {
    let body = validated(body)?;
    let athlete = state
        .athletes
        .register(NewAthlete {
            first_name: body.first_name,
            last_name: body.last_name,
            email: body.email,
            emergency_contact_name: body.emergency_contact_name,
            emergency_contact_phone: body.emergency_contact_phone,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(athlete.into())))
}

// ─── Locations ───────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub address: String,
    pub activity_ids: Vec<String>,
}

impl From<Location> for LocationResponse {
    fn from(l: Location) -> Self {
        Self {
            id: l.meta.id,
            name: l.name,
            address: l.address,
            activity_ids: l.activity_ids,
        }
    }
}

async fn list_locations(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<Vec<LocationResponse>>> {
    let locations = state.hosts.list_locations(session.host_id()?).await?;
    Ok(Json(locations.into_iter().map(LocationResponse::from).collect()))
}

#[derive(Deserialize, Validate)]
struct CreateLocationRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    address: String,
}

async fn create_location(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<LocationResponse>)> {
    let body = validated(body)?;
    let location = state
        .hosts
        .create_location(session.host_id()?, &body.name, &body.address)
        .await?;
    Ok((StatusCode::CREATED, Json(location.into())))
}

async fn delete_location(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(location_id): Path<String>,
) -> Result<StatusCode> {
    state
        .hosts
        .delete_location(session.host_id()?, &location_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize, Validate)]
struct AssignActivityRequest {
    #[validate(length(min = 1, max = 64))]
    activity_id: String,
}

async fn assign_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path(location_id): Path<String>,
    Json(body): Json<AssignActivityRequest>,
) -> Result<Json<LocationResponse>> {
    let body = validated(body)?;
    let location = state
        .hosts
        .assign_activity(session.host_id()?, &location_id, &body.activity_id)
        .await?;
    Ok(Json(location.into()))
}

async fn unassign_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Path((location_id, activity_id)): Path<(String, String)>,
) -> Result<Json<LocationResponse>> {
    let location = state
        .hosts
        .unassign_activity(session.host_id()?, &location_id, &activity_id)
        .await?;
    Ok(Json(location.into()))
}

// ─── Catalog ─────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityResponse {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub enabled: bool,
}

impl From<Activity> for ActivityResponse {
    fn from(a: Activity) -> Self {
        Self {
            id: a.meta.id,
            name: a.name,
            icon: a.icon,
            enabled: a.enabled,
        }
    }
}

async fn list_activities(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ActivityResponse>>> {
    let activities = state.hosts.list_activities().await?;
    Ok(Json(activities.into_iter().map(ActivityResponse::from).collect()))
}

#[derive(Deserialize, Validate)]
struct CreateActivityRequest {
    #[validate(length(min = 1, max = 50))]
    name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    icon: String,
}

/// The activity catalog is shared by all hosts; only super-admins edit it.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateActivityRequest>,
) -> Result<(StatusCode, Json<ActivityResponse>)> {
    session.require_super_admin()?;
    let body = validated(body)?;
    let activity = state.hosts.create_activity(&body.name, &body.icon).await?;
    Ok((StatusCode::CREATED, Json(activity.into())))
}

// ─── Rewards ─────────────────────────────────────────────────

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RewardResponse {
    pub id: String,
    pub name: String,
    pub icon: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub scope: RewardScope,
    pub host_id: Option<String>,
    pub threshold: u32,
}

impl From<Reward> for RewardResponse {
    fn from(r: Reward) -> Self {
        Self {
            id: r.meta.id,
            name: r.name,
            icon: r.icon,
            scope: r.scope,
            host_id: r.host_id,
            threshold: r.threshold,
        }
    }
}

#[derive(Deserialize, Validate)]
struct CreateRewardRequest {
    scope: RewardScope,
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    icon: String,
    #[validate(range(min = 1))]
    threshold: u32,
}

/// Hosts define rewards for themselves; global and pet rewards are
/// super-admin only.
async fn create_reward(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<CreateRewardRequest>,
) -> Result<(StatusCode, Json<RewardResponse>)> {
    let body = validated(body)?;
    let host_id = match body.scope {
        RewardScope::Host => Some(session.host_id()?.to_string()),
        RewardScope::Global | RewardScope::Pet => {
            session.require_super_admin()?;
            None
        }
    };

    let reward = state
        .rewards
        .create_reward(NewReward {
            scope: body.scope,
            host_id,
            name: body.name,
            icon: body.icon,
            threshold: body.threshold,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(reward.into())))
}
