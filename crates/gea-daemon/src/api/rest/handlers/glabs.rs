//! GLAB registry handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::GlabStorage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use gea_types::{Glab, GlabId, GlabStatus, LicenseType};
use serde::Deserialize;

/// Create GLAB request
#[derive(Debug, Deserialize)]
pub struct CreateGlabRequest {
    pub name: String,
    pub license_number: String,
    pub country: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub license_type: LicenseType,
    pub license_start_date: Option<NaiveDate>,
    pub license_expiry_date: Option<NaiveDate>,
    pub next_payment_due: Option<NaiveDate>,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct UpdateGlabStatusRequest {
    pub status: GlabStatus,
}

/// License payment request
#[derive(Debug, Deserialize)]
pub struct LicensePaymentRequest {
    pub paid_on: NaiveDate,
}

async fn load_glab(state: &AppState, id: &GlabId) -> ApiResult<Glab> {
    state
        .storage
        .get_glab(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("GLAB {} not found", id)))
}

/// List GLABs: all for GEA, own for everyone else
pub async fn list_glabs(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Glab>>> {
    let actor = auth.actor();
    let glabs = state
        .storage
        .list_glabs()
        .await?
        .into_iter()
        .filter(|g| actor.view_glab(g.id).is_allowed())
        .collect();
    Ok(Json(glabs))
}

/// Get one GLAB
pub async fn get_glab(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<GlabId>,
) -> ApiResult<Json<Glab>> {
    let glab = load_glab(&state, &id).await?;
    auth.actor().view_glab(glab.id).into_result()?;
    Ok(Json(glab))
}

/// Register a GLAB (GEA admin)
pub async fn create_glab(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateGlabRequest>,
) -> ApiResult<(StatusCode, Json<Glab>)> {
    auth.actor().require_gea_admin().into_result()?;

    let name = request.name.trim();
    let license_number = request.license_number.trim();
    if name.is_empty() || license_number.is_empty() {
        return Err(ApiError::Validation(
            "name and license number are required".to_string(),
        ));
    }

    let mut glab = Glab::new(name, license_number, request.country, request.contact_email);
    glab.contact_phone = request.contact_phone;
    glab.address = request.address;
    glab.license_type = request.license_type;
    glab.license_start_date = request.license_start_date;
    glab.license_expiry_date = request.license_expiry_date;
    glab.next_payment_due = request.next_payment_due;
    glab.created_by = Some(auth.user.id);

    state.storage.insert_glab(glab.clone()).await?;

    tracing::info!(glab_id = %glab.id, license = %glab.license_number, "Created GLAB");

    Ok((StatusCode::CREATED, Json(glab)))
}

/// Suspend, terminate or reactivate a GLAB (GEA admin)
pub async fn update_glab_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<GlabId>,
    Json(request): Json<UpdateGlabStatusRequest>,
) -> ApiResult<Json<Glab>> {
    auth.actor().require_gea_admin().into_result()?;

    let mut glab = load_glab(&state, &id).await?;
    glab.status = request.status;
    state.storage.update_glab(glab.clone()).await?;

    tracing::info!(glab_id = %id, status = ?glab.status, "Updated GLAB status");

    Ok(Json(glab))
}

/// Record a license payment and schedule the next one (GEA admin)
pub async fn record_license_payment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<GlabId>,
    Json(request): Json<LicensePaymentRequest>,
) -> ApiResult<Json<Glab>> {
    auth.actor().require_gea_admin().into_result()?;

    let mut glab = load_glab(&state, &id).await?;
    glab.record_license_payment(request.paid_on);
    state.storage.update_glab(glab.clone()).await?;
    state.scheduler.trigger_scan().await;

    tracing::info!(
        glab_id = %id,
        next_payment_due = ?glab.next_payment_due,
        "Recorded license payment"
    );

    Ok(Json(glab))
}
