//! Project document handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{
    file_response, load_project, notify, read_multipart, save_file, visible_project,
};
use crate::error::{ApiError, ApiResult};
use crate::files::FileArea;
use crate::storage::DocumentStorage;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use gea_types::{
    Document, DocumentId, LinkRef, NotificationKind, ProjectId, ReviewDecision, ReviewStatus,
};
use gea_workflow::{upload, WorkflowError};
use serde::Deserialize;

/// Document review request
#[derive(Debug, Deserialize)]
pub struct ReviewDocumentRequest {
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

async fn load_document(state: &AppState, id: &DocumentId) -> ApiResult<Document> {
    state
        .storage
        .get_document(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Document {} not found", id)))
}

/// Upload into a slot of the project's current phase.
///
/// Multipart fields: `slot_key` and `file`.
pub async fn upload_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let project = load_project(&state, &id).await?;
    auth.actor().upload_document(&project).into_result()?;

    let mut form = read_multipart(multipart).await?;
    let slot_key = form.require_field("slot_key")?.to_string();
    let file = form.take_file()?;

    let phase = project.current_phase;
    let slot = phase
        .definition()
        .slot(&slot_key)
        .ok_or_else(|| WorkflowError::UnknownSlot {
            phase: phase.number(),
            slot: slot_key.clone(),
        })?;

    let sanitized =
        upload::validate(&file.filename, file.bytes.len() as u64, state.max_upload_bytes)?;
    let stored = upload::stored_name(&sanitized);
    save_file(&state, FileArea::Upload, &stored, &file.bytes).await?;

    let document = Document {
        id: DocumentId::generate(),
        project_id: project.id,
        phase,
        slot_key: slot.key.to_string(),
        slot_name: slot.name.to_string(),
        original_filename: sanitized,
        stored_filename: stored,
        file_size: file.bytes.len() as u64,
        uploaded_by: auth.user.id,
        uploaded_at: Utc::now(),
        status: ReviewStatus::Pending,
        review_notes: None,
        reviewed_by: None,
        reviewed_at: None,
    };
    state.storage.insert_document(document.clone()).await?;

    tracing::info!(
        project_id = %id,
        document_id = %document.id,
        slot = %document.slot_key,
        size = document.file_size,
        "Uploaded document"
    );

    Ok((StatusCode::CREATED, Json(document)))
}

/// Documents of a project, newest first
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Vec<Document>>> {
    visible_project(&state, &auth, &id).await?;
    Ok(Json(state.storage.list_documents(&id).await?))
}

/// Documents waiting for GEA review
pub async fn pending_documents(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Document>>> {
    auth.actor().require_gea().into_result()?;
    Ok(Json(state.storage.list_documents_pending_review().await?))
}

/// GEA verdict on a document
pub async fn review_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
    Json(request): Json<ReviewDocumentRequest>,
) -> ApiResult<Json<Document>> {
    auth.actor().require_gea().into_result()?;

    let mut document = load_document(&state, &id).await?;
    document.review(request.decision, request.notes, auth.user.id, Utc::now());
    state.storage.update_document(document.clone()).await?;

    notify(
        &state,
        [document.uploaded_by],
        auth.user.id,
        NotificationKind::DocumentReviewed,
        "Document Reviewed",
        &format!("{} was reviewed: {}.", document.slot_name, document.status),
        Some(LinkRef::Project(document.project_id)),
    )
    .await?;

    tracing::info!(
        document_id = %id,
        project_id = %document.project_id,
        status = %document.status,
        "Reviewed document"
    );

    Ok(Json(document))
}

/// Download a document under its original name
pub async fn download_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DocumentId>,
) -> ApiResult<Response> {
    let document = load_document(&state, &id).await?;
    visible_project(&state, &auth, &document.project_id).await?;
    file_response(
        &state,
        FileArea::Upload,
        &document.stored_filename,
        &document.original_filename,
    )
    .await
}
