//! Per-phase checklists
//!
//! Two lists exist per project phase: the operational checklist worked by
//! the GLAB, which gates advancement, and the quality checklist GEA staff
//! use while reviewing.

use crate::{ChecklistItemId, DocumentId, Phase, ProjectId, QualityItemId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational checklist item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: ChecklistItemId,
    pub project_id: ProjectId,
    pub phase: Phase,
    pub text: String,

    /// Incomplete required items block advancement
    pub required: bool,

    /// Added by a GEA admin rather than seeded from the catalog
    pub custom: bool,

    pub completed: bool,
    pub completed_by: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Position within the phase
    pub order: u32,
}

impl ChecklistItem {
    pub fn new(project_id: ProjectId, phase: Phase, text: impl Into<String>, order: u32) -> Self {
        Self {
            id: ChecklistItemId::generate(),
            project_id,
            phase,
            text: text.into(),
            required: true,
            custom: false,
            completed: false,
            completed_by: None,
            completed_at: None,
            order,
        }
    }

    /// Flip completion, recording or clearing the actor
    pub fn toggle(&mut self, actor: UserId, at: DateTime<Utc>) {
        self.completed = !self.completed;
        if self.completed {
            self.completed_by = Some(actor);
            self.completed_at = Some(at);
        } else {
            self.completed_by = None;
            self.completed_at = None;
        }
    }

    pub fn blocks_advancement(&self) -> bool {
        self.required && !self.completed
    }
}

/// What a quality check confirms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckType {
    Received,
    #[default]
    Verified,
    Approved,
}

/// GEA review checklist item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityChecklistItem {
    pub id: QualityItemId,
    pub project_id: ProjectId,
    pub phase: Phase,
    pub text: String,
    pub check_type: CheckType,
    pub checked: bool,
    pub checked_by: Option<UserId>,
    pub checked_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub order: u32,

    /// Document under review, if the check concerns one
    pub document_id: Option<DocumentId>,
}

impl QualityChecklistItem {
    pub fn new(project_id: ProjectId, phase: Phase, text: impl Into<String>, order: u32) -> Self {
        Self {
            id: QualityItemId::generate(),
            project_id,
            phase,
            text: text.into(),
            check_type: CheckType::default(),
            checked: false,
            checked_by: None,
            checked_at: None,
            notes: None,
            order,
            document_id: None,
        }
    }

    pub fn toggle(&mut self, actor: UserId, at: DateTime<Utc>, notes: Option<String>) {
        self.checked = !self.checked;
        if self.checked {
            self.checked_by = Some(actor);
            self.checked_at = Some(at);
        } else {
            self.checked_by = None;
            self.checked_at = None;
        }
        if notes.is_some() {
            self.notes = notes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_records_and_clears_actor() {
        let mut item = ChecklistItem::new(ProjectId::generate(), Phase::FIRST, "Form received", 0);
        let actor = UserId::generate();
        assert!(item.blocks_advancement());

        item.toggle(actor, Utc::now());
        assert!(item.completed);
        assert_eq!(item.completed_by, Some(actor));
        assert!(!item.blocks_advancement());

        item.toggle(actor, Utc::now());
        assert!(!item.completed);
        assert!(item.completed_by.is_none());
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn test_optional_item_never_blocks() {
        let mut item = ChecklistItem::new(ProjectId::generate(), Phase::FIRST, "Optional", 0);
        item.required = false;
        assert!(!item.blocks_advancement());
    }
}
