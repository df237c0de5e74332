//! Project lifecycle handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{
    glab_admins, load_project, load_user, notify, visible_project, visible_projects,
};
use crate::error::{ApiError, ApiResult, StorageError};
use crate::storage::{
    AdvanceCommit, ChecklistStorage, ClientStorage, DocumentStorage, GlabStorage,
    PhaseLogStorage, ProjectStorage,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use gea_types::{
    AssessmentType, ChecklistItem, Client, Document, FeeSchedule, Glab, LinkRef,
    NotificationKind, PhaseLog, Project, ProjectId, QualityChecklistItem, ReviewDecision,
    ReviewStatus, UserId,
};
use gea_workflow::checklist::{seed_phase, seed_quality};
use gea_workflow::{advance, readiness, AdvanceOutcome, Readiness, ReferenceAllocator};
use serde::{Deserialize, Serialize};

/// Attempts at a free reference number before giving up
const REFERENCE_ATTEMPTS: usize = 5;

/// Create project request
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub client_id: gea_types::ClientId,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub assessment_type: AssessmentType,
    pub lead_assessor_id: Option<UserId>,
}

/// Review request
#[derive(Debug, Deserialize)]
pub struct ReviewProjectRequest {
    pub decision: ReviewDecision,
    pub notes: Option<String>,
}

/// Fee update request
#[derive(Debug, Deserialize)]
pub struct UpdateFeesRequest {
    pub fees: FeeSchedule,
}

/// Which client payment is being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Initial,
    Final,
}

/// Project with everything the detail page shows
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub client: Option<Client>,
    pub glab: Option<Glab>,
    pub checklist: Vec<ChecklistItem>,
    pub quality_checklist: Vec<QualityChecklistItem>,
    pub documents: Vec<Document>,
    pub history: Vec<PhaseLog>,
    pub readiness: Readiness,
}

/// Advance response
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub advanced: bool,
    pub from: u8,
    pub to: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub project: Project,
}

/// Create a project for one of the GLAB's clients
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let actor = auth.actor();
    let client = state
        .storage
        .get_client(&request.client_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Client {} not found", request.client_id)))?;
    actor.create_project(client.glab_id).into_result()?;

    let glab = state
        .storage
        .get_glab(&client.glab_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("GLAB {} not found", client.glab_id)))?;
    if !glab.is_active() {
        return Err(ApiError::Conflict(format!("GLAB {} is not active", glab.name)));
    }

    let split = state.fees.split(&request.fees)?;
    let now = Utc::now();

    let mut project = Project::new(String::new(), glab.id, client.id, request.fees, split);
    project.assessment_type = request.assessment_type;
    project.created_by = Some(auth.user.id);
    project.created_at = now;
    project.updated_at = now;

    if let Some(lead) = request.lead_assessor_id {
        let assessor = load_user(&state, &lead).await?;
        actor.assign_assessor(&project, &assessor).into_result()?;
        project.lead_assessor_id = Some(lead);
        project.assessors.push(lead);
    }

    let year = now.year();
    let existing = state.storage.count_projects_in_year(&glab.id, year).await?;
    let mut inserted = false;
    let candidates = ReferenceAllocator::new(&glab.license_number, year, existing);
    for candidate in candidates.take(REFERENCE_ATTEMPTS) {
        project.reference_number = candidate;
        match state.storage.insert_project(project.clone()).await {
            Ok(()) => {
                inserted = true;
                break;
            }
            Err(StorageError::Conflict(_)) => {
                tracing::debug!(
                    reference = %project.reference_number,
                    "Reference number taken, retrying"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    if !inserted {
        return Err(ApiError::Conflict(
            "could not allocate a unique reference number".to_string(),
        ));
    }

    state
        .storage
        .insert_checklist_items(seed_phase(project.id, project.current_phase))
        .await?;
    state
        .storage
        .insert_quality_items(seed_quality(project.id, project.current_phase))
        .await?;
    state
        .storage
        .append_phase_log(PhaseLog::created(project.id, auth.user.id, now))
        .await?;

    if let Some(lead) = project.lead_assessor_id {
        notify(
            &state,
            [lead],
            auth.user.id,
            NotificationKind::AssessorAssignment,
            "New Project Assignment",
            &format!("You are the lead assessor on project {}.", project.reference_number),
            Some(LinkRef::Project(project.id)),
        )
        .await?;
    }

    tracing::info!(
        project_id = %project.id,
        reference = %project.reference_number,
        glab_id = %glab.id,
        "Created project"
    );

    Ok((StatusCode::CREATED, Json(project)))
}

/// List projects visible to the caller
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(visible_projects(&state, &auth.actor()).await?))
}

/// Project detail
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<ProjectDetail>> {
    let project = visible_project(&state, &auth, &id).await?;

    let client = state.storage.get_client(&project.client_id).await?;
    let glab = state.storage.get_glab(&project.glab_id).await?;
    let checklist = state.storage.list_checklist(&id).await?;
    let quality_checklist = if auth.user.role.is_gea() {
        state.storage.list_quality_checklist(&id).await?
    } else {
        Vec::new()
    };
    let documents = state.storage.list_documents(&id).await?;
    let history = state.storage.list_phase_logs(&id).await?;
    let readiness = readiness(&project, &checklist, &documents);

    Ok(Json(ProjectDetail {
        project,
        client,
        glab,
        checklist,
        quality_checklist,
        documents,
        history,
        readiness,
    }))
}

/// Advancement gates and document warnings for the current phase
pub async fn project_readiness(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Readiness>> {
    let project = visible_project(&state, &auth, &id).await?;
    let checklist = state.storage.list_checklist(&id).await?;
    let documents = state.storage.list_documents(&id).await?;
    Ok(Json(readiness(&project, &checklist, &documents)))
}

/// Move the project to its next phase
pub async fn advance_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<AdvanceResponse>> {
    let mut project = load_project(&state, &id).await?;
    auth.actor().advance_project(&project).into_result()?;

    let checklist = state.storage.list_checklist(&id).await?;
    let quality = state.storage.list_quality_checklist(&id).await?;
    let expected = project.current_phase;

    let advancement = match advance(&mut project, &checklist, &quality, auth.user.id, Utc::now())? {
        AdvanceOutcome::AlreadyFinal => {
            let phase = project.current_phase.number();
            return Ok(Json(AdvanceResponse {
                advanced: false,
                from: phase,
                to: phase,
                warning: Some("Project is already in the final phase".to_string()),
                project,
            }));
        }
        AdvanceOutcome::Advanced(advancement) => advancement,
    };

    state
        .storage
        .commit_advance(AdvanceCommit {
            project: project.clone(),
            expected,
            checklist: advancement.seeded,
            quality: advancement.seeded_quality,
            log: advancement.log,
        })
        .await?;

    let mut recipients = project.participants();
    recipients.extend(glab_admins(&state, project.glab_id).await?);
    notify(
        &state,
        recipients,
        auth.user.id,
        NotificationKind::PhaseAdvanced,
        "Project Phase Advanced",
        &format!(
            "Project {} advanced to {}.",
            project.reference_number, advancement.to
        ),
        Some(LinkRef::Project(project.id)),
    )
    .await?;

    tracing::info!(
        project_id = %id,
        from = advancement.from.number(),
        to = advancement.to.number(),
        actor = %auth.user.id,
        "Advanced project"
    );

    Ok(Json(AdvanceResponse {
        advanced: true,
        from: advancement.from.number(),
        to: advancement.to.number(),
        warning: None,
        project,
    }))
}

/// GEA verdict on the project's current phase
pub async fn review_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<ReviewProjectRequest>,
) -> ApiResult<Json<Project>> {
    auth.actor().require_gea().into_result()?;

    let mut project = load_project(&state, &id).await?;
    let now = Utc::now();
    project.review.status = request.decision.into();
    project.review.notes = request.notes;
    project.review.reviewed_by = Some(auth.user.id);
    project.review.reviewed_at = Some(now);
    project.updated_at = now;
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    let mut recipients = glab_admins(&state, project.glab_id).await?;
    recipients.extend(project.lead_assessor_id);
    notify(
        &state,
        recipients,
        auth.user.id,
        NotificationKind::ProjectReviewed,
        "Project Reviewed",
        &format!(
            "GEA review of project {} ({}): {}.",
            project.reference_number, project.current_phase, project.review.status
        ),
        Some(LinkRef::Project(project.id)),
    )
    .await?;

    tracing::info!(
        project_id = %id,
        status = %project.review.status,
        reviewer = %auth.user.id,
        "Reviewed project"
    );

    Ok(Json(project))
}

/// Projects waiting for a GEA verdict on a gated phase
pub async fn pending_reviews(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Project>>> {
    auth.actor().require_gea().into_result()?;
    let projects = state
        .storage
        .list_projects()
        .await?
        .into_iter()
        .filter(|p| {
            p.current_phase.definition().requires_gea_approval
                && p.review.status == ReviewStatus::Pending
        })
        .collect();
    Ok(Json(projects))
}

/// Replace the fee schedule; refused once a payment is on record
pub async fn update_fees(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
    Json(request): Json<UpdateFeesRequest>,
) -> ApiResult<Json<Project>> {
    let mut project = load_project(&state, &id).await?;
    auth.actor().manage_project(&project).into_result()?;

    if project.payments.any_received() {
        return Err(gea_workflow::WorkflowError::FeesLocked.into());
    }

    project.split = state.fees.split(&request.fees)?;
    project.fees = request.fees;
    project.updated_at = Utc::now();
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    tracing::info!(
        project_id = %id,
        total = %project.split.total,
        gea_fee = %project.split.gea_fee,
        "Updated project fees"
    );

    Ok(Json(project))
}

/// Record the initial or final client payment
pub async fn record_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, kind)): Path<(ProjectId, PaymentKind)>,
) -> ApiResult<Json<Project>> {
    let mut project = load_project(&state, &id).await?;
    auth.actor().manage_project(&project).into_result()?;

    let now = Utc::now();
    match kind {
        PaymentKind::Initial => {
            if project.payments.initial_received() {
                return Err(ApiError::Conflict("initial payment already recorded".to_string()));
            }
            project.payments.initial_received_at = Some(now);
        }
        PaymentKind::Final => {
            if !project.payments.initial_received() {
                return Err(ApiError::Validation(
                    "initial payment must be recorded first".to_string(),
                ));
            }
            if project.payments.final_received() {
                return Err(ApiError::Conflict("final payment already recorded".to_string()));
            }
            project.payments.final_received_at = Some(now);
        }
    }
    project.updated_at = now;
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    tracing::info!(project_id = %id, payment = ?kind, "Recorded client payment");

    Ok(Json(project))
}

/// Confirm the GLAB has paid over the GEA fee (GEA)
pub async fn record_remittance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ProjectId>,
) -> ApiResult<Json<Project>> {
    auth.actor().require_gea().into_result()?;

    let mut project = load_project(&state, &id).await?;
    if !project.payments.any_received() {
        return Err(ApiError::Validation(
            "no client payment has been recorded".to_string(),
        ));
    }
    if project.payments.gea_fee_remitted() {
        return Err(ApiError::Conflict("GEA fee already remitted".to_string()));
    }

    let now = Utc::now();
    project.payments.gea_fee_remitted_at = Some(now);
    project.updated_at = now;
    state
        .storage
        .update_project(project.clone(), project.current_phase)
        .await?;

    tracing::info!(
        project_id = %id,
        gea_fee = %project.split.gea_fee,
        "Recorded GEA fee remittance"
    );

    Ok(Json(project))
}
