//! Assessor, expert and committee assignment handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{load_project, load_user, notify};
use crate::error::{ApiError, ApiResult};
use crate::storage::ProjectStorage;
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use gea_types::{LinkRef, NotificationKind, Project, ProjectId, UserId};
use serde::Deserialize;

/// Assign an assessor
#[derive(Debug, Deserialize)]
pub struct AssignAssessorRequest {
    pub user_id: UserId,
    /// Make this assessor the project lead
    #[serde(default)]
    pub lead: bool,
}

/// Assign an expert or committee member
#[derive(Debug, Deserialize)]
pub struct AssignUserRequest {
    pub user_id: UserId,
}

/// Add an assessor from the project's GLAB (GEA or GLAB admin)
pub async fn assign_assessor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<AssignAssessorRequest>,
) -> ApiResult<Json<Project>> {
    let mut project = load_project(&state, &id).await?;
    let assessor = load_user(&state, &request.user_id).await?;
    auth.actor().assign_assessor(&project, &assessor).into_result()?;

    let newly_assigned = !project.assessors.contains(&assessor.id);
    if newly_assigned {
        project.assessors.push(assessor.id);
    }
    if request.lead {
        project.lead_assessor_id = Some(assessor.id);
    }
    project.updated_at = Utc::now();
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    if newly_assigned || request.lead {
        let role = if request.lead { "lead assessor" } else { "an assessor" };
        notify(
            &state,
            [assessor.id],
            auth.user.id,
            NotificationKind::AssessorAssignment,
            "New Project Assignment",
            &format!("You have been assigned as {} on project {}.", role, project.reference_number),
            Some(LinkRef::Project(project.id)),
        )
        .await?;
    }

    tracing::info!(
        project_id = %id,
        assessor_id = %assessor.id,
        lead = request.lead,
        "Assigned assessor"
    );

    Ok(Json(project))
}

/// Remove an assessor (GEA or GLAB admin)
pub async fn remove_assessor(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, user_id)): Path<(ProjectId, UserId)>,
) -> ApiResult<Json<Project>> {
    let mut project = load_project(&state, &id).await?;
    auth.actor().manage_project(&project).into_result()?;

    if !project.is_assessor(user_id) {
        return Err(ApiError::NotFound(format!(
            "User {} is not assigned to project {}",
            user_id, project.reference_number
        )));
    }
    project.assessors.retain(|a| *a != user_id);
    if project.lead_assessor_id == Some(user_id) {
        project.lead_assessor_id = None;
    }
    project.updated_at = Utc::now();
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    tracing::info!(project_id = %id, assessor_id = %user_id, "Removed assessor");

    Ok(Json(project))
}

/// Assign a technical expert (GEA)
pub async fn assign_expert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<AssignUserRequest>,
) -> ApiResult<Json<Project>> {
    let mut project = load_project(&state, &id).await?;
    let expert = load_user(&state, &request.user_id).await?;
    auth.actor().assign_expert(&expert).into_result()?;

    if project.technical_experts.contains(&expert.id) {
        return Ok(Json(project));
    }
    project.technical_experts.push(expert.id);
    project.updated_at = Utc::now();
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    notify(
        &state,
        [expert.id],
        auth.user.id,
        NotificationKind::ExpertAssigned,
        "Technical Expert Assignment",
        &format!(
            "You have been assigned as technical expert on project {}.",
            project.reference_number
        ),
        Some(LinkRef::Project(project.id)),
    )
    .await?;

    tracing::info!(project_id = %id, expert_id = %expert.id, "Assigned technical expert");

    Ok(Json(project))
}

/// Assign a certification committee member (GEA admin)
pub async fn assign_committee(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<AssignUserRequest>,
) -> ApiResult<Json<Project>> {
    let mut project = load_project(&state, &id).await?;
    let member = load_user(&state, &request.user_id).await?;
    auth.actor().assign_committee(&member).into_result()?;

    if project.committee_members.contains(&member.id) {
        return Ok(Json(project));
    }
    project.committee_members.push(member.id);
    project.updated_at = Utc::now();
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    notify(
        &state,
        [member.id],
        auth.user.id,
        NotificationKind::CommitteeAssigned,
        "Certification Committee Assignment",
        &format!(
            "You have been assigned to the certification committee for project {}.",
            project.reference_number
        ),
        Some(LinkRef::Project(project.id)),
    )
    .await?;

    tracing::info!(project_id = %id, member_id = %member.id, "Assigned committee member");

    Ok(Json(project))
}
