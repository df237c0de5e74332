//! Login, logout and current-user handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::{Session, SessionStorage, UserStorage};
use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use gea_types::User;
use gea_workflow::password::{generate_token, verify_password};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let invalid = || ApiError::Unauthorized("invalid username or password".to_string());

    let mut user = state
        .storage
        .get_user_by_username(request.username.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!(username = %user.username, "Failed login attempt");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("account is deactivated".to_string()));
    }

    let now = Utc::now();
    let session = Session {
        token: generate_token(),
        user_id: user.id,
        created_at: now,
        expires_at: now + state.session_ttl,
    };
    state.storage.create_session(session.clone()).await?;

    user.last_login = Some(now);
    state.storage.update_user(user.clone()).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.redacted(),
    }))
}

/// Revoke the caller's token
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<StatusCode> {
    state.storage.delete_session(&auth.token).await?;
    tracing::info!(user_id = %auth.user.id, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// The authenticated user
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user.redacted())
}
