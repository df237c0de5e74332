//! Continuing professional development handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::{file_response, notify, read_multipart, save_file};
use crate::error::{ApiError, ApiResult};
use crate::files::FileArea;
use crate::storage::CpdStorage;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{NaiveDate, Utc};
use gea_types::{CpdLog, CpdLogId, CpdStatus, LinkRef, NotificationKind, Role, UserId};
use gea_workflow::upload;
use serde::{Deserialize, Serialize};

/// Submit CPD activity request
#[derive(Debug, Deserialize)]
pub struct CreateCpdRequest {
    pub activity_type: String,
    pub activity_title: String,
    pub activity_date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,
}

/// CPD listing filter (GEA only)
#[derive(Debug, Default, Deserialize)]
pub struct CpdQuery {
    pub assessor_id: Option<UserId>,
}

/// Verdict on a CPD log
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpdDecision {
    Approved,
    Rejected,
}

/// CPD review request
#[derive(Debug, Deserialize)]
pub struct ReviewCpdRequest {
    pub decision: CpdDecision,
    pub notes: Option<String>,
}

/// CPD logs with the approved-hours total
#[derive(Debug, Serialize)]
pub struct CpdListResponse {
    pub logs: Vec<CpdLog>,
    pub approved_hours: f64,
}

async fn load_log(state: &AppState, id: &CpdLogId) -> ApiResult<CpdLog> {
    state
        .storage
        .get_cpd_log(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("CPD log {} not found", id)))
}

/// Record a CPD activity (assessors)
pub async fn create_cpd_log(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateCpdRequest>,
) -> ApiResult<(StatusCode, Json<CpdLog>)> {
    auth.actor().submit_cpd().into_result()?;

    if !request.hours.is_finite() || request.hours <= 0.0 {
        return Err(ApiError::Validation("hours must be a positive number".to_string()));
    }
    if request.activity_title.trim().is_empty() || request.activity_type.trim().is_empty() {
        return Err(ApiError::Validation(
            "activity type and title are required".to_string(),
        ));
    }
    if request.activity_date > Utc::now().date_naive() {
        return Err(ApiError::Validation("activity date is in the future".to_string()));
    }

    let log = CpdLog {
        id: CpdLogId::generate(),
        assessor_id: auth.user.id,
        activity_type: request.activity_type.trim().to_string(),
        activity_title: request.activity_title.trim().to_string(),
        activity_date: request.activity_date,
        hours: request.hours,
        description: request.description,
        evidence_filename: None,
        evidence_stored_filename: None,
        status: CpdStatus::Pending,
        reviewed_by: None,
        reviewed_at: None,
        review_notes: None,
        submitted_at: Utc::now(),
    };
    state.storage.insert_cpd_log(log.clone()).await?;

    tracing::info!(
        cpd_id = %log.id,
        assessor_id = %log.assessor_id,
        hours = log.hours,
        "Submitted CPD log"
    );

    Ok((StatusCode::CREATED, Json(log)))
}

/// Attach evidence to one's own pending CPD log.
///
/// Multipart field: `file`.
pub async fn upload_cpd_evidence(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CpdLogId>,
    multipart: Multipart,
) -> ApiResult<Json<CpdLog>> {
    let mut log = load_log(&state, &id).await?;
    if log.assessor_id != auth.user.id {
        return Err(ApiError::Forbidden("not your CPD log".to_string()));
    }
    if log.status != CpdStatus::Pending {
        return Err(ApiError::Conflict("CPD log has already been reviewed".to_string()));
    }

    let mut form = read_multipart(multipart).await?;
    let file = form.take_file()?;
    let sanitized =
        upload::validate(&file.filename, file.bytes.len() as u64, state.max_upload_bytes)?;
    let stored = upload::stored_name(&sanitized);
    save_file(&state, FileArea::Upload, &stored, &file.bytes).await?;

    log.evidence_filename = Some(sanitized);
    log.evidence_stored_filename = Some(stored);
    state.storage.update_cpd_log(log.clone()).await?;

    tracing::info!(cpd_id = %id, "Attached CPD evidence");

    Ok(Json(log))
}

/// Own logs for assessors; any assessor's logs for GEA
pub async fn list_cpd_logs(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<CpdQuery>,
) -> ApiResult<Json<CpdListResponse>> {
    let assessor = match auth.user.role {
        Role::GlabAssessor => Some(auth.user.id),
        Role::GeaAdmin | Role::GeaStaff => query.assessor_id,
        _ => return Err(ApiError::Forbidden("no access to CPD logs".to_string())),
    };
    let logs = state.storage.list_cpd_logs(assessor.as_ref()).await?;
    let approved_hours = CpdLog::approved_hours(&logs);
    Ok(Json(CpdListResponse {
        logs,
        approved_hours,
    }))
}

/// GEA verdict on a CPD log
pub async fn review_cpd_log(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CpdLogId>,
    Json(request): Json<ReviewCpdRequest>,
) -> ApiResult<Json<CpdLog>> {
    auth.actor().require_gea().into_result()?;

    let mut log = load_log(&state, &id).await?;
    if log.status != CpdStatus::Pending {
        return Err(ApiError::Conflict("CPD log has already been reviewed".to_string()));
    }
    log.status = match request.decision {
        CpdDecision::Approved => CpdStatus::Approved,
        CpdDecision::Rejected => CpdStatus::Rejected,
    };
    log.review_notes = request.notes;
    log.reviewed_by = Some(auth.user.id);
    log.reviewed_at = Some(Utc::now());
    state.storage.update_cpd_log(log.clone()).await?;

    let verdict = if log.is_approved() { "approved" } else { "rejected" };
    notify(
        &state,
        [log.assessor_id],
        auth.user.id,
        NotificationKind::CpdReview,
        &format!("CPD Activity {}", if log.is_approved() { "Approved" } else { "Rejected" }),
        &format!("Your CPD activity \"{}\" was {}.", log.activity_title, verdict),
        Some(LinkRef::Cpd(Some(log.id))),
    )
    .await?;

    tracing::info!(cpd_id = %id, status = ?log.status, "Reviewed CPD log");

    Ok(Json(log))
}

/// Download CPD evidence (owner or GEA)
pub async fn download_cpd_evidence(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CpdLogId>,
) -> ApiResult<Response> {
    let log = load_log(&state, &id).await?;
    if log.assessor_id != auth.user.id && !auth.user.role.is_gea() {
        return Err(ApiError::Forbidden("no access to this CPD log".to_string()));
    }
    match (&log.evidence_stored_filename, &log.evidence_filename) {
        (Some(stored), Some(original)) => {
            file_response(&state, FileArea::Upload, stored, original).await
        }
        _ => Err(ApiError::NotFound("no evidence uploaded".to_string())),
    }
}
