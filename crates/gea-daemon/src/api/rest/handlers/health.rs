//! Health and catalog handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use axum::{extract::State, Json};
use gea_types::{PhaseDefinition, PHASES};
use serde::Serialize;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// The fixed phase catalog
pub async fn list_phases(_auth: AuthUser) -> Json<&'static [PhaseDefinition]> {
    Json(&PHASES[..])
}
