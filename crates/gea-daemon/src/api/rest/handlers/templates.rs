//! Phase template handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{file_response, read_multipart, save_file};
use crate::error::{ApiError, ApiResult};
use crate::files::FileArea;
use crate::storage::TemplateStorage;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use gea_types::{Phase, PhaseTemplate, PhaseTemplateId};
use gea_workflow::{upload, WorkflowError};

/// Upload a template for a (phase, slot); replaces the active one.
///
/// Multipart fields: `phase`, `slot_key`, optional `template_name`, `file`.
pub async fn upload_template(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<PhaseTemplate>)> {
    auth.actor().require_gea_admin().into_result()?;

    let mut form = read_multipart(multipart).await?;
    let phase_number: u8 = form
        .require_field("phase")?
        .parse()
        .map_err(|_| ApiError::BadRequest("phase must be a number".to_string()))?;
    let phase = Phase::new(phase_number)
        .ok_or_else(|| ApiError::BadRequest(format!("no such phase: {}", phase_number)))?;
    let slot_key = form.require_field("slot_key")?.to_string();
    let slot = phase
        .definition()
        .slot(&slot_key)
        .ok_or_else(|| WorkflowError::UnknownSlot {
            phase: phase_number,
            slot: slot_key.clone(),
        })?;
    let template_name = form
        .field("template_name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} Template", slot.name));
    let file = form.take_file()?;

    let sanitized =
        upload::validate(&file.filename, file.bytes.len() as u64, state.max_upload_bytes)?;
    let stored = upload::stored_name(&sanitized);
    save_file(&state, FileArea::Template, &stored, &file.bytes).await?;

    let template = PhaseTemplate {
        id: PhaseTemplateId::generate(),
        phase,
        slot_key: slot.key.to_string(),
        template_name,
        original_filename: sanitized,
        stored_filename: stored,
        uploaded_by: auth.user.id,
        uploaded_at: Utc::now(),
        is_active: true,
    };
    state.storage.insert_template(template.clone()).await?;

    tracing::info!(
        template_id = %template.id,
        phase = phase_number,
        slot = %template.slot_key,
        "Uploaded phase template"
    );

    Ok((StatusCode::CREATED, Json(template)))
}

/// Active templates
pub async fn list_templates(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> ApiResult<Json<Vec<PhaseTemplate>>> {
    Ok(Json(state.storage.list_templates().await?))
}

/// Download a template under its original name
pub async fn download_template(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<PhaseTemplateId>,
) -> ApiResult<Response> {
    let template = state
        .storage
        .get_template(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Template {} not found", id)))?;
    file_response(
        &state,
        FileArea::Template,
        &template.stored_filename,
        &template.original_filename,
    )
    .await
}
