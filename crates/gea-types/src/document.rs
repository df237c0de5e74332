//! Phase documents and GEA-provided templates

use crate::{DocumentId, Phase, PhaseTemplateId, ProjectId, ReviewDecision, ReviewStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file uploaded into a phase slot of a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub phase: Phase,

    /// Slot key from the phase catalog, e.g. `coi_declaration`
    pub slot_key: String,

    /// Human readable slot name
    pub slot_name: String,

    pub original_filename: String,

    /// `{uuid}_{sanitized name}` under the upload directory
    pub stored_filename: String,

    pub file_size: u64,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,

    pub status: ReviewStatus,
    pub review_notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Apply a GEA verdict
    pub fn review(
        &mut self,
        decision: ReviewDecision,
        notes: Option<String>,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) {
        self.status = decision.into();
        self.review_notes = notes;
        self.reviewed_by = Some(reviewer);
        self.reviewed_at = Some(at);
    }

    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }
}

/// A blank form GEA publishes for a phase slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTemplate {
    pub id: PhaseTemplateId,
    pub phase: Phase,
    pub slot_key: String,
    pub template_name: String,
    pub original_filename: String,
    pub stored_filename: String,
    pub uploaded_by: UserId,
    pub uploaded_at: DateTime<Utc>,

    /// Superseded templates are kept but hidden
    pub is_active: bool,
}
