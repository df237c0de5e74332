//! Notification inbox handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::NotificationStorage;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use gea_types::{Notification, NotificationId};
use serde::Serialize;

/// Size of the inbox listing
const INBOX_LIMIT: usize = 50;

/// Unread count response
#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: usize,
}

/// Mark-all response
#[derive(Debug, Serialize)]
pub struct MarkedResponse {
    pub marked: usize,
}

/// Latest notifications of the caller
pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(
        state
            .storage
            .list_notifications(&auth.user.id, INBOX_LIMIT)
            .await?,
    ))
}

pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<UnreadCountResponse>> {
    let unread = state.storage.unread_count(&auth.user.id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

/// Mark one of the caller's notifications read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<NotificationId>,
) -> ApiResult<Json<MarkedResponse>> {
    let found = state
        .storage
        .mark_notification_read(&auth.user.id, &id, Utc::now())
        .await?;
    if !found {
        return Err(ApiError::NotFound(format!("Notification {} not found", id)));
    }
    Ok(Json(MarkedResponse { marked: 1 }))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<MarkedResponse>> {
    let marked = state.storage.mark_all_read(&auth.user.id, Utc::now()).await?;
    Ok(Json(MarkedResponse { marked }))
}
