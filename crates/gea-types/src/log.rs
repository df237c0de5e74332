//! Append-only phase history

use crate::{Phase, PhaseLogId, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseAction {
    /// Project entered its first phase
    Created,
    /// Project moved to the next phase
    Advanced,
}

/// One transition in a project's phase history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseLog {
    pub id: PhaseLogId,
    pub project_id: ProjectId,
    pub from_phase: Option<Phase>,
    pub to_phase: Phase,
    pub action: PhaseAction,
    pub performed_by: UserId,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl PhaseLog {
    pub fn created(project_id: ProjectId, actor: UserId, at: DateTime<Utc>) -> Self {
        Self {
            id: PhaseLogId::generate(),
            project_id,
            from_phase: None,
            to_phase: Phase::FIRST,
            action: PhaseAction::Created,
            performed_by: actor,
            performed_at: at,
            notes: Some("Project created".to_string()),
        }
    }

    pub fn advanced(
        project_id: ProjectId,
        from: Phase,
        to: Phase,
        actor: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PhaseLogId::generate(),
            project_id,
            from_phase: Some(from),
            to_phase: to,
            action: PhaseAction::Advanced,
            performed_by: actor,
            performed_at: at,
            notes: None,
        }
    }
}
