// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT authentication middleware and the per-request session context.
//!
//! Tokens are issued by the external identity provider and carry group
//! membership. The middleware resolves them into a [`SessionContext`] that
//! handlers receive explicitly; nothing about the caller is kept globally.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "checkin_token";
/// Host chosen by a super-admin.
pub const HOST_HEADER: &str = "x-host-id";
/// Location the staff device is operating at.
pub const LOCATION_HEADER: &str = "x-location-id";

pub const HOSTS_GROUP: &str = "hosts";
pub const SUPER_ADMINS_GROUP: &str = "super-admins";

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject at the identity provider
    pub sub: String,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Host the account belongs to (host staff)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// Default location for the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    SuperAdmin,
}

/// Who is calling and on whose behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub subject: String,
    pub role: Role,
    pub host_id: Option<String>,
    pub location_id: Option<String>,
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SessionContext {
    /// Resolve claims plus request headers into a session.
    pub fn from_claims(claims: Claims, headers: &HeaderMap) -> Result<Self> {
        let role = if claims.groups.iter().any(|g| g == SUPER_ADMINS_GROUP) {
            Role::SuperAdmin
        } else if claims.groups.iter().any(|g| g == HOSTS_GROUP) {
            Role::Host
        } else {
            return Err(AppError::Forbidden("Not a member of a staff group".to_string()));
        };

        let requested_host = header_value(headers, HOST_HEADER);
        let host_id = match role {
            Role::SuperAdmin => requested_host.or(claims.host_id),
            Role::Host => {
                let own = claims.host_id.ok_or_else(|| {
                    AppError::Forbidden("Host account without a host".to_string())
                })?;
                if requested_host.as_deref().is_some_and(|h| h != own) {
                    return Err(AppError::Forbidden(
                        "Hosts may only act on their own host".to_string(),
                    ));
                }
                Some(own)
            }
        };

        Ok(Self {
            subject: claims.sub,
            role,
            host_id,
            location_id: header_value(headers, LOCATION_HEADER).or(claims.location_id),
        })
    }

    pub fn host_id(&self) -> Result<&str> {
        self.host_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest(format!("No host selected (set {})", HOST_HEADER)))
    }

    pub fn location_id(&self) -> Result<&str> {
        self.location_id
            .as_deref()
            .ok_or(AppError::NoLocationSelected)
    }

    pub fn require_super_admin(&self) -> Result<()> {
        match self.role {
            Role::SuperAdmin => Ok(()),
            Role::Host => Err(AppError::Forbidden("Super-admin only".to_string())),
        }
    }
}

/// Middleware that requires valid JWT authentication.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
            Some(token) => token.to_string(),
            None => return Err(AppError::Unauthorized),
        }
    };

    let key = DecodingKey::from_secret(&state.config.jwt_signing_key);
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(&token, &key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        AppError::InvalidToken
    })?;

    let session = SessionContext::from_claims(token_data.claims, request.headers())?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Create a session JWT. Used by tooling and tests; production tokens come
/// from the identity provider.
pub fn create_jwt(
    subject: &str,
    groups: &[&str],
    host_id: Option<&str>,
    signing_key: &[u8],
) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

    let claims = Claims {
        sub: subject.to_string(),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        host_id: host_id.map(str::to_string),
        location_id: None,
        iat: now,
        exp: now + 12 * 60 * 60, // one staff shift
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}
