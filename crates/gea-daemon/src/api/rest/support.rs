//! Helpers shared by the request handlers

use super::auth::AuthUser;
use super::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::files::{content_type, FileArea};
use crate::storage::{NotificationStorage, ProjectStorage, UserStorage};
use axum::{
    extract::Multipart,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use gea_types::{
    GlabId, LinkRef, Notification, NotificationKind, Project, ProjectId, Role, User, UserId,
};
use gea_workflow::Actor;
use std::collections::HashMap;

pub async fn load_project(state: &AppState, id: &ProjectId) -> ApiResult<Project> {
    state
        .storage
        .get_project(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}

/// Load a project the caller may view
pub async fn visible_project(
    state: &AppState,
    auth: &AuthUser,
    id: &ProjectId,
) -> ApiResult<Project> {
    let project = load_project(state, id).await?;
    auth.actor().view_project(&project).into_result()?;
    Ok(project)
}

pub async fn load_user(state: &AppState, id: &UserId) -> ApiResult<User> {
    state
        .storage
        .get_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", id)))
}

/// Projects the actor may view, newest first
pub async fn visible_projects(state: &AppState, actor: &Actor) -> ApiResult<Vec<Project>> {
    let projects = match (actor.role.is_glab_side(), actor.glab_id) {
        (true, Some(glab)) => state.storage.list_projects_for_glab(&glab).await?,
        (true, None) => Vec::new(),
        (false, _) => state.storage.list_projects().await?,
    };
    Ok(projects
        .into_iter()
        .filter(|p| actor.view_project(p).is_allowed())
        .collect())
}

/// Active administrators of a GLAB
pub async fn glab_admins(state: &AppState, glab: GlabId) -> ApiResult<Vec<UserId>> {
    Ok(state
        .storage
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.is_active && u.role == Role::GlabAdmin && u.glab_id == Some(glab))
        .map(|u| u.id)
        .collect())
}

/// Notify each recipient once, never the acting user
pub async fn notify(
    state: &AppState,
    recipients: impl IntoIterator<Item = UserId>,
    actor: UserId,
    kind: NotificationKind,
    title: &str,
    message: &str,
    link: Option<LinkRef>,
) -> ApiResult<usize> {
    let mut seen: Vec<UserId> = Vec::new();
    for user in recipients {
        if user != actor && !seen.contains(&user) {
            seen.push(user);
        }
    }
    let notifications: Vec<Notification> = seen
        .into_iter()
        .map(|user| Notification::new(user, kind, title, message, link))
        .collect();
    let count = notifications.len();
    if count > 0 {
        state.storage.insert_notifications(notifications).await?;
    }
    Ok(count)
}

/// A file part of a multipart body
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Text fields and the `file` part of a multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
    }

    pub fn require_field(&self, name: &str) -> ApiResult<&str> {
        self.field(name)
            .ok_or_else(|| ApiError::BadRequest(format!("missing form field '{}'", name)))
    }

    pub fn take_file(&mut self) -> ApiResult<UploadedFile> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest("no file uploaded".to_string()))
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::BadRequest(e.body_text())
    }
}

pub async fn read_multipart(mut multipart: Multipart) -> ApiResult<MultipartForm> {
    let mut form = MultipartForm::default();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(multipart_error)?;
            form.file = Some(UploadedFile {
                filename,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }
    Ok(form)
}

pub async fn save_file(
    state: &AppState,
    area: FileArea,
    stored: &str,
    bytes: &[u8],
) -> ApiResult<()> {
    state
        .files
        .save(area, stored, bytes)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to store file: {}", e)))
}

/// Stored file as an attachment under its original name
pub async fn file_response(
    state: &AppState,
    area: FileArea,
    stored: &str,
    original: &str,
) -> ApiResult<Response> {
    let bytes = state.files.read(area, stored).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ApiError::NotFound(format!("File {} not found", original)),
        _ => ApiError::Internal(format!("failed to read file: {}", e)),
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        original.replace(['"', '\\', '\r', '\n'], "_")
    );
    Ok((
        [
            (header::CONTENT_TYPE, content_type(original).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
