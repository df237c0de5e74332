//! Role-specific dashboard summary

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::visible_projects;
use crate::error::ApiResult;
use crate::storage::{CpdStorage, DocumentStorage, NotificationStorage};
use axum::{extract::State, Json};
use gea_types::{CpdLog, Money, ProjectId, ReviewStatus, Role};
use serde::Serialize;
use std::collections::BTreeMap;

/// A project whose GEA fee has not been remitted
#[derive(Debug, Serialize)]
pub struct OutstandingFee {
    pub project_id: ProjectId,
    pub reference_number: String,
    pub gea_fee: Money,
}

/// Dashboard response; sections a role does not see are omitted
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub role: Role,
    pub total_projects: usize,
    /// Phase number to project count
    pub projects_by_phase: BTreeMap<u8, usize>,
    pub unread_notifications: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_project_reviews: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_documents: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding_gea_fees: Option<Vec<OutstandingFee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding_gea_fee_total: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_cpd_hours: Option<f64>,
}

/// Summary for the caller's role
pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<DashboardResponse>> {
    let actor = auth.actor();
    let role = actor.role;
    let projects = visible_projects(&state, &actor).await?;

    let mut projects_by_phase = BTreeMap::new();
    for project in &projects {
        *projects_by_phase
            .entry(project.current_phase.number())
            .or_insert(0) += 1;
    }

    let (pending_project_reviews, pending_documents) = if role.is_gea() {
        let reviews = projects
            .iter()
            .filter(|p| {
                p.current_phase.definition().requires_gea_approval
                    && p.review.status == ReviewStatus::Pending
            })
            .count();
        let documents = state.storage.list_documents_pending_review().await?.len();
        (Some(reviews), Some(documents))
    } else {
        (None, None)
    };

    let outstanding_gea_fees = matches!(role, Role::GeaAdmin | Role::GeaStaff | Role::GlabAdmin)
        .then(|| {
            projects
                .iter()
                .filter(|p| p.gea_fee_outstanding())
                .map(|p| OutstandingFee {
                    project_id: p.id,
                    reference_number: p.reference_number.clone(),
                    gea_fee: p.split.gea_fee,
                })
                .collect::<Vec<_>>()
        });
    let outstanding_gea_fee_total = outstanding_gea_fees
        .as_ref()
        .map(|fees| fees.iter().map(|f| f.gea_fee).sum());

    let approved_cpd_hours = if role == Role::GlabAssessor {
        let logs = state.storage.list_cpd_logs(Some(&auth.user.id)).await?;
        Some(CpdLog::approved_hours(&logs))
    } else {
        None
    };

    let unread_notifications = state.storage.unread_count(&auth.user.id).await?;

    Ok(Json(DashboardResponse {
        role,
        total_projects: projects.len(),
        projects_by_phase,
        unread_notifications,
        pending_project_reviews,
        pending_documents,
        outstanding_gea_fees,
        outstanding_gea_fee_total,
        approved_cpd_hours,
    }))
}
