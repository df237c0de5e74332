//! Announcement handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::notify;
use crate::error::{ApiError, ApiResult};
use crate::storage::{AnnouncementStorage, GlabStorage, UserStorage};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use gea_types::{
    Announcement, AnnouncementId, AnnouncementPriority, GlabId, LinkRef, NotificationKind,
};
use serde::Deserialize;

/// Create announcement request
#[derive(Debug, Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: AnnouncementPriority,
    /// `None` broadcasts to every GLAB
    pub target_glab_id: Option<GlabId>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Publish an announcement (GEA) and notify its GLAB audience
pub async fn create_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateAnnouncementRequest>,
) -> ApiResult<(StatusCode, Json<Announcement>)> {
    auth.actor().require_gea().into_result()?;

    let title = request.title.trim();
    let message = request.message.trim();
    if title.is_empty() || message.is_empty() {
        return Err(ApiError::Validation("title and message are required".to_string()));
    }
    if let Some(glab) = request.target_glab_id {
        state
            .storage
            .get_glab(&glab)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("GLAB {} not found", glab)))?;
    }

    let announcement = Announcement {
        id: AnnouncementId::generate(),
        title: title.to_string(),
        message: message.to_string(),
        priority: request.priority,
        target_glab_id: request.target_glab_id,
        created_by: auth.user.id,
        created_at: Utc::now(),
        expires_at: request.expires_at,
        is_active: true,
    };
    state.storage.insert_announcement(announcement.clone()).await?;

    let audience = state
        .storage
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.is_active && u.role.is_glab_side())
        .filter(|u| match announcement.target_glab_id {
            Some(target) => u.glab_id == Some(target),
            None => true,
        })
        .map(|u| u.id);
    let notified = notify(
        &state,
        audience,
        auth.user.id,
        NotificationKind::Announcement,
        &format!("Announcement: {}", announcement.title),
        &announcement.message,
        Some(LinkRef::Announcement(announcement.id)),
    )
    .await?;

    tracing::info!(
        announcement_id = %announcement.id,
        target = ?announcement.target_glab_id,
        notified,
        "Published announcement"
    );

    Ok((StatusCode::CREATED, Json(announcement)))
}

/// Active announcements visible to the caller, newest first
pub async fn list_announcements(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Announcement>>> {
    let now = Utc::now();
    let user = &auth.user;
    let announcements = state
        .storage
        .list_announcements()
        .await?
        .into_iter()
        .filter(|a| {
            if user.role.is_gea() {
                a.visible_to(None, now)
            } else {
                match user.glab_id {
                    Some(glab) => a.visible_to(Some(glab), now),
                    None => a.target_glab_id.is_none() && a.visible_to(None, now),
                }
            }
        })
        .collect();
    Ok(Json(announcements))
}

/// Withdraw an announcement (GEA admin); the record is kept
pub async fn delete_announcement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<AnnouncementId>,
) -> ApiResult<StatusCode> {
    auth.actor().require_gea_admin().into_result()?;

    let mut announcement = state
        .storage
        .get_announcement(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Announcement {} not found", id)))?;
    announcement.is_active = false;
    state.storage.update_announcement(announcement).await?;

    tracing::info!(announcement_id = %id, "Withdrew announcement");

    Ok(StatusCode::NO_CONTENT)
}
