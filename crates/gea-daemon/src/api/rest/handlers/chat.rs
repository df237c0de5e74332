//! Project chat handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{glab_admins, load_project, notify};
use crate::error::{ApiError, ApiResult};
use crate::storage::ChatStorage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gea_types::{ChatMessage, LinkRef, NotificationKind, ProjectId};
use serde::Deserialize;

/// Longest accepted chat message, in characters
const MAX_MESSAGE_CHARS: usize = 5_000;

/// Post message request
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub message: String,
}

/// Thread of a project; marks other users' messages as read.
///
/// Clients poll this endpoint.
pub async fn list_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    let project = load_project(&state, &id).await?;
    auth.actor().chat(&project).into_result()?;

    let messages = state.storage.list_messages(&id).await?;
    let marked = state.storage.mark_messages_read(&id, &auth.user.id).await?;
    if marked > 0 {
        tracing::debug!(project_id = %id, marked, "Marked chat messages read");
    }
    Ok(Json(messages))
}

/// Post to a project's thread
pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<PostMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let project = load_project(&state, &id).await?;
    auth.actor().chat(&project).into_result()?;

    let text = request.message.trim();
    if text.is_empty() {
        return Err(ApiError::Validation("message must not be empty".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::Validation(format!(
            "message exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }

    let message = ChatMessage::new(project.id, auth.user.id, text);
    state.storage.insert_message(message.clone()).await?;

    let mut recipients = project.participants();
    recipients.extend(glab_admins(&state, project.glab_id).await?);
    notify(
        &state,
        recipients,
        auth.user.id,
        NotificationKind::ChatMessage,
        "New Chat Message",
        &format!(
            "{} posted on project {}.",
            auth.user.display_name(),
            project.reference_number
        ),
        Some(LinkRef::Project(project.id)),
    )
    .await?;

    tracing::info!(project_id = %id, message_id = %message.id, "Posted chat message");

    Ok((StatusCode::CREATED, Json(message)))
}
