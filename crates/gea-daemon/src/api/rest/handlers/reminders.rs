//! Reminder scan handlers

use crate::api::rest::auth::AuthUser;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::scheduler::ScanReport;
use crate::storage::ReminderStorage;
use axum::{extract::State, Json};
use chrono::Utc;
use gea_types::ScheduledReminder;

/// Run the reminder scan now (GEA admin)
pub async fn run_reminder_scan(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<ScanReport>> {
    auth.actor().require_gea_admin().into_result()?;
    let report = state.scheduler.scan(Utc::now().date_naive()).await?;
    tracing::info!(user_id = %auth.user.id, sent = report.sent, "Manual reminder scan");
    Ok(Json(report))
}

/// Reminders already sent (GEA)
pub async fn list_reminders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<ScheduledReminder>>> {
    auth.actor().require_gea().into_result()?;
    let mut reminders = state.storage.list_reminders().await?;
    reminders.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    Ok(Json(reminders))
}
