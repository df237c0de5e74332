//! Operational and quality checklist handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{load_project, visible_project};
use crate::error::{ApiError, ApiResult};
use crate::storage::ChecklistStorage;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use gea_types::{
    ChecklistItem, ChecklistItemId, Phase, ProjectId, QualityChecklistItem, QualityItemId,
};
use gea_workflow::checklist::custom_item;
use serde::Deserialize;

/// Phase filter; defaults to every phase
#[derive(Debug, Default, Deserialize)]
pub struct PhaseQuery {
    pub phase: Option<u8>,
}

impl PhaseQuery {
    fn phase(&self) -> ApiResult<Option<Phase>> {
        self.phase
            .map(|n| {
                Phase::new(n).ok_or_else(|| ApiError::BadRequest(format!("no such phase: {}", n)))
            })
            .transpose()
    }
}

/// Custom checklist item request
#[derive(Debug, Deserialize)]
pub struct CustomItemRequest {
    pub text: String,
    /// Defaults to the project's current phase
    pub phase: Option<u8>,
}

/// Quality check toggle request
#[derive(Debug, Default, Deserialize)]
pub struct ToggleQualityRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

/// Checklist items of a project
pub async fn list_checklist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Query(query): Query<PhaseQuery>,
) -> ApiResult<Json<Vec<ChecklistItem>>> {
    visible_project(&state, &auth, &id).await?;
    let phase = query.phase()?;
    let items = state
        .storage
        .list_checklist(&id)
        .await?
        .into_iter()
        .filter(|i| phase.map_or(true, |p| i.phase == p))
        .collect();
    Ok(Json(items))
}

/// Mark a checklist item complete or incomplete (GLAB users)
pub async fn toggle_checklist_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<ChecklistItemId>,
) -> ApiResult<Json<ChecklistItem>> {
    let mut item = state
        .storage
        .get_checklist_item(&item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Checklist item {} not found", item_id)))?;
    let project = load_project(&state, &item.project_id).await?;
    auth.actor().toggle_checklist(&project).into_result()?;

    item.toggle(auth.user.id, Utc::now());
    state.storage.update_checklist_item(item.clone()).await?;

    tracing::info!(
        project_id = %item.project_id,
        item_id = %item.id,
        completed = item.completed,
        "Toggled checklist item"
    );

    Ok(Json(item))
}

/// Append a custom required item (GEA admin)
pub async fn add_custom_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<CustomItemRequest>,
) -> ApiResult<(StatusCode, Json<ChecklistItem>)> {
    auth.actor().require_gea_admin().into_result()?;
    let project = load_project(&state, &id).await?;

    let phase = match request.phase {
        Some(n) => Phase::new(n)
            .ok_or_else(|| ApiError::BadRequest(format!("no such phase: {}", n)))?,
        None => project.current_phase,
    };
    let existing = state.storage.list_checklist(&id).await?;
    let item = custom_item(project.id, phase, &request.text, &existing)?;
    state.storage.insert_checklist_items(vec![item.clone()]).await?;

    tracing::info!(
        project_id = %id,
        phase = phase.number(),
        item_id = %item.id,
        "Added custom checklist item"
    );

    Ok((StatusCode::CREATED, Json(item)))
}

/// GEA quality checklist of a project
pub async fn list_quality_checklist(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Query(query): Query<PhaseQuery>,
) -> ApiResult<Json<Vec<QualityChecklistItem>>> {
    auth.actor().require_gea().into_result()?;
    load_project(&state, &id).await?;
    let phase = query.phase()?;
    let items = state
        .storage
        .list_quality_checklist(&id)
        .await?
        .into_iter()
        .filter(|i| phase.map_or(true, |p| i.phase == p))
        .collect();
    Ok(Json(items))
}

/// Tick or untick a quality check (GEA users)
pub async fn toggle_quality_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<QualityItemId>,
    Json(request): Json<ToggleQualityRequest>,
) -> ApiResult<Json<QualityChecklistItem>> {
    auth.actor().toggle_quality_checklist().into_result()?;

    let mut item = state
        .storage
        .get_quality_item(&item_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Quality item {} not found", item_id)))?;

    item.toggle(auth.user.id, Utc::now(), request.notes);
    state.storage.update_quality_item(item.clone()).await?;

    tracing::info!(
        project_id = %item.project_id,
        item_id = %item.id,
        checked = item.checked,
        "Toggled quality check"
    );

    Ok(Json(item))
}
