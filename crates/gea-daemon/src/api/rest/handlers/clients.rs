//! Client organization handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::{ClientStorage, GlabStorage};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use gea_types::{Client, ClientId, GlabId, Role};
use serde::Deserialize;

/// Create client request
#[derive(Debug, Deserialize)]
pub struct CreateClientRequest {
    pub name: String,
    pub country: String,
    /// Defaults to the caller's GLAB
    pub glab_id: Option<GlabId>,
    pub registered_address: Option<String>,
    pub industry_sector: Option<String>,
    pub total_employees: Option<u32>,
    #[serde(default = "default_sites")]
    pub number_of_sites: u32,
    pub primary_contact_name: Option<String>,
    pub primary_contact_email: Option<String>,
    pub primary_contact_phone: Option<String>,
}

fn default_sites() -> u32 {
    1
}

/// List clients visible to the caller
pub async fn list_clients(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Client>>> {
    let actor = auth.actor();
    let clients = match actor.role {
        Role::GeaAdmin | Role::GeaStaff => state.storage.list_clients(None).await?,
        Role::GlabAdmin | Role::GlabAssessor => match actor.glab_id {
            Some(glab) => state.storage.list_clients(Some(&glab)).await?,
            None => Vec::new(),
        },
        Role::ClientUser => match actor.client_id {
            Some(id) => state.storage.get_client(&id).await?.into_iter().collect(),
            None => Vec::new(),
        },
        Role::TechnicalExpert | Role::CertCommittee => Vec::new(),
    };
    Ok(Json(clients))
}

/// Get one client
pub async fn get_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<ClientId>,
) -> ApiResult<Json<Client>> {
    let client = state
        .storage
        .get_client(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Client {} not found", id)))?;
    auth.actor().view_client(&client).into_result()?;
    Ok(Json(client))
}

/// Register a client under a GLAB
pub async fn create_client(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let actor = auth.actor();
    let glab_id = request
        .glab_id
        .or(actor.glab_id)
        .ok_or_else(|| ApiError::Validation("glab_id is required".to_string()))?;
    actor.manage_clients(glab_id).into_result()?;

    state
        .storage
        .get_glab(&glab_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("GLAB {} not found", glab_id)))?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("client name is required".to_string()));
    }
    if request.number_of_sites == 0 {
        return Err(ApiError::Validation("number_of_sites must be at least 1".to_string()));
    }

    let mut client = Client::new(name, request.country, glab_id);
    client.registered_address = request.registered_address;
    client.industry_sector = request.industry_sector;
    client.total_employees = request.total_employees;
    client.number_of_sites = request.number_of_sites;
    client.primary_contact_name = request.primary_contact_name;
    client.primary_contact_email = request.primary_contact_email;
    client.primary_contact_phone = request.primary_contact_phone;
    client.created_by = Some(auth.user.id);

    state.storage.insert_client(client.clone()).await?;

    tracing::info!(client_id = %client.id, glab_id = %glab_id, "Created client");

    Ok((StatusCode::CREATED, Json(client)))
}
