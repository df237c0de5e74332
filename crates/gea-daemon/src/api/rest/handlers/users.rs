//! User administration and profile handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::api::rest::support::load_user;
use crate::error::{ApiError, ApiResult};
use crate::storage::{ClientStorage, GlabStorage, UserStorage};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use gea_types::{ClientId, GlabId, Role, StaffFunction, User, UserId};
use gea_workflow::password::{hash_password, verify_password};
use serde::Deserialize;

const MIN_PASSWORD_LEN: usize = 8;

/// User list filter
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
}

/// Create user request
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub staff_function: Option<StaffFunction>,
    pub glab_id: Option<GlabId>,
    pub client_id: Option<ClientId>,
    pub assessor_certificate: Option<String>,
    pub certification_date: Option<NaiveDate>,
    #[serde(default)]
    pub specializations: Vec<String>,
}

/// Profile update request; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub email_notifications: Option<bool>,
    pub specializations: Option<Vec<String>>,
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Certification date of an assessor
#[derive(Debug, Deserialize)]
pub struct CertificationRequest {
    pub certification_date: NaiveDate,
    pub assessor_certificate: Option<String>,
}

fn check_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn check_email(email: &str) -> ApiResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ApiError::Validation(format!("invalid email: {}", email))),
    }
}

/// List users: everyone for GEA, own GLAB for GLAB admins
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UserQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let actor = auth.actor();
    let scope = match actor.role {
        Role::GeaAdmin | Role::GeaStaff => None,
        Role::GlabAdmin => actor.glab_id,
        _ => return Err(ApiError::Forbidden("not permitted to list users".to_string())),
    };

    let users = state
        .storage
        .list_users()
        .await?
        .into_iter()
        .filter(|u| scope.is_none() || u.glab_id == scope)
        .filter(|u| query.role.map_or(true, |r| u.role == r))
        .map(|u| u.redacted())
        .collect();
    Ok(Json(users))
}

/// Create a user (GEA admin)
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    auth.actor().require_gea_admin().into_result()?;

    let username = request.username.trim();
    let email = request.email.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::Validation("username must not be empty".to_string()));
    }
    check_email(&email)?;
    check_password(&request.password)?;

    let mut user = User::new(username, email, hash_password(&request.password), request.role);

    if request.role.requires_glab() {
        let glab_id = request.glab_id.ok_or_else(|| {
            ApiError::Validation(format!("role {} requires a GLAB", request.role))
        })?;
        state
            .storage
            .get_glab(&glab_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("GLAB {} not found", glab_id)))?;
        user = user.with_glab(glab_id);
    }
    if request.role == Role::ClientUser {
        let client_id = request
            .client_id
            .ok_or_else(|| ApiError::Validation("client users require a client".to_string()))?;
        state
            .storage
            .get_client(&client_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Client {} not found", client_id)))?;
        user = user.with_client(client_id);
    }
    if request.role.is_gea() {
        user.staff_function = request.staff_function;
    }
    if request.role == Role::GlabAssessor {
        user.assessor_certificate = request.assessor_certificate;
        if let Some(date) = request.certification_date {
            user.certify(date);
        }
    }

    user.full_name = request.full_name;
    user.phone = request.phone;
    user.specializations = request.specializations;
    user.created_by = Some(auth.user.id);

    state.storage.insert_user(user.clone()).await?;

    tracing::info!(user_id = %user.id, role = %user.role, "Created user");

    Ok((StatusCode::CREATED, Json(user.redacted())))
}

/// Activate or deactivate a user (GEA admin, never oneself)
pub async fn toggle_user_active(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<User>> {
    auth.actor().require_gea_admin().into_result()?;
    if id == auth.user.id {
        return Err(ApiError::BadRequest(
            "cannot change your own active status".to_string(),
        ));
    }

    let current = load_user(&state, &id).await?;
    let user = state.storage.set_user_active(&id, !current.is_active).await?;

    tracing::info!(user_id = %id, active = user.is_active, "Toggled user status");

    Ok(Json(user.redacted()))
}

/// Record an assessor's certification (GEA admin)
pub async fn set_certification(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<UserId>,
    Json(request): Json<CertificationRequest>,
) -> ApiResult<Json<User>> {
    auth.actor().require_gea_admin().into_result()?;

    let mut user = load_user(&state, &id).await?;
    if user.role != Role::GlabAssessor {
        return Err(ApiError::Validation("user is not an assessor".to_string()));
    }
    user.certify(request.certification_date);
    if request.assessor_certificate.is_some() {
        user.assessor_certificate = request.assessor_certificate;
    }
    state.storage.update_user(user.clone()).await?;
    state.scheduler.trigger_scan().await;

    tracing::info!(
        user_id = %id,
        recertification_due = ?user.recertification_due,
        "Recorded assessor certification"
    );

    Ok(Json(user.redacted()))
}

/// Own profile
pub async fn get_profile(auth: AuthUser) -> Json<User> {
    Json(auth.user.redacted())
}

/// Edit own profile
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let mut user = load_user(&state, &auth.user.id).await?;

    if let Some(email) = request.email {
        let email = email.trim().to_lowercase();
        check_email(&email)?;
        user.email = email;
    }
    if let Some(full_name) = request.full_name {
        user.full_name = Some(full_name).filter(|n| !n.trim().is_empty());
    }
    if let Some(phone) = request.phone {
        user.phone = Some(phone).filter(|p| !p.trim().is_empty());
    }
    if let Some(bio) = request.bio {
        user.bio = Some(bio).filter(|b| !b.trim().is_empty());
    }
    if let Some(flag) = request.email_notifications {
        user.email_notifications = flag;
    }
    if let Some(specializations) = request.specializations {
        user.specializations = specializations;
    }

    state.storage.update_user(user.clone()).await?;
    tracing::info!(user_id = %user.id, "Updated profile");

    Ok(Json(user.redacted()))
}

/// Change own password
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    let user = auth.user;
    if !verify_password(&request.current_password, &user.password_hash)? {
        return Err(ApiError::Forbidden("current password is incorrect".to_string()));
    }
    check_password(&request.new_password)?;

    state
        .storage
        .set_password_hash(&user.id, hash_password(&request.new_password))
        .await?;
    tracing::info!(user_id = %user.id, "Changed password");

    Ok(StatusCode::NO_CONTENT)
}
