//! Phase advancement state machine
//!
//! A project leaves its current phase only when every gate holds:
//! required checklist items are complete, GEA has approved phases that
//! need approval, and the financial gate of the phase (if any) is met.
//! Phases move forward one step at a time and never regress.

use crate::checklist::{is_quality_seeded, is_seeded, seed_phase, seed_quality};
use crate::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Utc};
use gea_types::{
    ChecklistItem, Document, PaymentGate, Phase, PhaseLog, Project, QualityChecklistItem,
    ReviewStatus, UserId,
};
use serde::Serialize;
use std::fmt;

/// A gate that keeps a project in its current phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Blocker {
    /// Required checklist items not yet completed
    IncompleteChecklist { items: Vec<String> },

    /// The phase needs GEA approval
    GeaApprovalRequired { status: ReviewStatus },

    /// The payment tied to this phase has not been recorded
    PaymentMissing { gate: PaymentGate },
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Blocker::IncompleteChecklist { items } => {
                write!(f, "{} required checklist item(s) incomplete", items.len())
            }
            Blocker::GeaApprovalRequired { status } => {
                write!(f, "GEA approval required (current status: {})", status)
            }
            Blocker::PaymentMissing { gate } => match gate {
                PaymentGate::InitialPayment => f.write_str("initial payment (50%) not recorded"),
                PaymentGate::FinalPayment => f.write_str("final payment (50%) not recorded"),
            },
        }
    }
}

/// Document issue that does not block advancement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    MissingDocument { slot: String, name: String },
    DocumentNotApproved { slot: String, name: String, status: ReviewStatus },
}

/// Readiness of a project to leave its current phase
#[derive(Debug, Clone, Serialize)]
pub struct Readiness {
    pub phase: Phase,
    pub is_final: bool,
    pub can_advance: bool,
    pub blockers: Vec<Blocker>,
    pub warnings: Vec<Warning>,
}

/// Result of a successful advance
#[derive(Debug, Clone)]
pub struct Advancement {
    pub from: Phase,
    pub to: Phase,
    pub log: PhaseLog,

    /// Operational items to persist for the new phase (empty if already seeded)
    pub seeded: Vec<ChecklistItem>,

    /// GEA review items to persist for the new phase
    pub seeded_quality: Vec<QualityChecklistItem>,
}

#[derive(Debug, Clone)]
pub enum AdvanceOutcome {
    /// Project was already in the final phase; nothing changed
    AlreadyFinal,
    Advanced(Advancement),
}

/// Every gate that currently keeps `project` in its phase
pub fn blockers(project: &Project, checklist: &[ChecklistItem]) -> Vec<Blocker> {
    let phase = project.current_phase;
    let def = phase.definition();
    let mut out = Vec::new();

    let incomplete: Vec<String> = checklist
        .iter()
        .filter(|i| i.project_id == project.id && i.phase == phase && i.blocks_advancement())
        .map(|i| i.text.clone())
        .collect();
    if !incomplete.is_empty() {
        out.push(Blocker::IncompleteChecklist { items: incomplete });
    }

    if def.requires_gea_approval && !project.review.is_approved() {
        out.push(Blocker::GeaApprovalRequired {
            status: project.review.status,
        });
    }

    match def.payment_gate {
        Some(PaymentGate::InitialPayment) if !project.payments.initial_received() => {
            out.push(Blocker::PaymentMissing {
                gate: PaymentGate::InitialPayment,
            });
        }
        Some(PaymentGate::FinalPayment) if !project.payments.final_received() => {
            out.push(Blocker::PaymentMissing {
                gate: PaymentGate::FinalPayment,
            });
        }
        _ => {}
    }

    out
}

/// Blockers plus non-blocking document warnings for the current phase
pub fn readiness(
    project: &Project,
    checklist: &[ChecklistItem],
    documents: &[Document],
) -> Readiness {
    let phase = project.current_phase;
    let mut warnings = Vec::new();

    for slot in phase.definition().required_slots() {
        let latest = documents
            .iter()
            .filter(|d| d.project_id == project.id && d.phase == phase && d.slot_key == slot.key)
            .max_by_key(|d| d.uploaded_at);
        match latest {
            None => warnings.push(Warning::MissingDocument {
                slot: slot.key.to_string(),
                name: slot.name.to_string(),
            }),
            Some(doc) if !doc.is_approved() => warnings.push(Warning::DocumentNotApproved {
                slot: slot.key.to_string(),
                name: slot.name.to_string(),
                status: doc.status,
            }),
            Some(_) => {}
        }
    }

    let is_final = phase.is_final();
    let blockers = if is_final {
        Vec::new()
    } else {
        blockers(project, checklist)
    };

    Readiness {
        phase,
        is_final,
        can_advance: !is_final && blockers.is_empty(),
        blockers,
        warnings,
    }
}

/// Move `project` to its next phase if every gate holds
///
/// On success the project is mutated in place (phase, review reset,
/// timestamp) and the caller persists the returned log row and seeded items.
/// `checklist` and `quality` hold the project's existing items for all phases.
pub fn advance(
    project: &mut Project,
    checklist: &[ChecklistItem],
    quality: &[QualityChecklistItem],
    actor: UserId,
    now: DateTime<Utc>,
) -> WorkflowResult<AdvanceOutcome> {
    let from = project.current_phase;
    let Some(to) = from.next() else {
        tracing::debug!(project_id = %project.id, "Advance requested in final phase");
        return Ok(AdvanceOutcome::AlreadyFinal);
    };

    let blocking = blockers(project, checklist);
    if !blocking.is_empty() {
        return Err(WorkflowError::Blocked {
            phase: from,
            blockers: blocking,
        });
    }

    project.current_phase = to;
    project.review.reset();
    project.updated_at = now;

    let project_checklist: Vec<ChecklistItem> = checklist
        .iter()
        .filter(|i| i.project_id == project.id)
        .cloned()
        .collect();
    let seeded = if is_seeded(&project_checklist, to) {
        Vec::new()
    } else {
        seed_phase(project.id, to)
    };
    let seeded_quality = if is_quality_seeded(quality, to) {
        Vec::new()
    } else {
        seed_quality(project.id, to)
    };

    tracing::info!(
        project_id = %project.id,
        from = from.number(),
        to = to.number(),
        "Phase advanced"
    );

    Ok(AdvanceOutcome::Advanced(Advancement {
        from,
        to,
        log: PhaseLog::advanced(project.id, from, to, actor, now),
        seeded,
        seeded_quality,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gea_types::{
        ClientId, DocumentId, FeeSchedule, FeeSplit, GlabId, PhaseAction, ReviewDecision,
    };

    fn project_at(number: u8) -> Project {
        let mut p = Project::new(
            "GL-1-2025-0001",
            GlabId::generate(),
            ClientId::generate(),
            FeeSchedule::default(),
            FeeSplit::default(),
        );
        p.current_phase = Phase::new(number).unwrap();
        p
    }

    fn completed(project: &Project) -> Vec<ChecklistItem> {
        let mut items = seed_phase(project.id, project.current_phase);
        for item in &mut items {
            item.toggle(UserId::generate(), Utc::now());
        }
        items
    }

    fn approve(project: &mut Project) {
        project.review.status = ReviewDecision::Approved.into();
    }

    #[test]
    fn test_incomplete_required_items_block() {
        let mut p = project_at(2);
        let items = seed_phase(p.id, p.current_phase);
        let err = advance(&mut p, &items, &[], UserId::generate(), Utc::now()).unwrap_err();
        match err {
            WorkflowError::Blocked { blockers, .. } => {
                assert!(matches!(
                    &blockers[0],
                    Blocker::IncompleteChecklist { items: pending } if pending.len() == items.len()
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(p.current_phase.number(), 2);
    }

    #[test]
    fn test_advance_seeds_next_phase_and_resets_review() {
        let mut p = project_at(1);
        let items = completed(&p);
        approve(&mut p);
        let actor = UserId::generate();

        let outcome = advance(&mut p, &items, &[], actor, Utc::now()).unwrap();
        let AdvanceOutcome::Advanced(adv) = outcome else {
            panic!("expected advancement");
        };
        assert_eq!(p.current_phase.number(), 2);
        assert_eq!(p.review.status, ReviewStatus::Pending);
        assert_eq!(adv.log.action, PhaseAction::Advanced);
        assert_eq!(adv.log.from_phase.map(|f| f.number()), Some(1));
        assert_eq!(adv.log.performed_by, actor);
        assert_eq!(adv.seeded.len(), p.current_phase.definition().default_checklist.len());
        assert!(!adv.seeded_quality.is_empty());
    }

    #[test]
    fn test_already_seeded_phase_not_reseeded() {
        let mut p = project_at(2);
        let mut items = completed(&p);
        items.extend(seed_phase(p.id, Phase::new(3).unwrap()));
        let outcome = advance(&mut p, &items, &[], UserId::generate(), Utc::now()).unwrap();
        let AdvanceOutcome::Advanced(adv) = outcome else {
            panic!("expected advancement");
        };
        assert!(adv.seeded.is_empty());
    }

    #[test]
    fn test_gated_phase_requires_approval() {
        let mut p = project_at(1);
        let items = completed(&p);
        let err = advance(&mut p, &items, &[], UserId::generate(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Blocked { ref blockers, .. }
                if blockers == &vec![Blocker::GeaApprovalRequired { status: ReviewStatus::Pending }]
        ));
    }

    #[test]
    fn test_engagement_requires_initial_payment() {
        let mut p = project_at(4);
        let items = completed(&p);
        approve(&mut p);
        let err = advance(&mut p, &items, &[], UserId::generate(), Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Blocked { ref blockers, .. }
                if blockers == &vec![Blocker::PaymentMissing { gate: PaymentGate::InitialPayment }]
        ));

        p.payments.initial_received_at = Some(Utc::now());
        assert!(advance(&mut p, &items, &[], UserId::generate(), Utc::now()).is_ok());
        assert_eq!(p.current_phase.number(), 5);
    }

    #[test]
    fn test_all_blockers_reported_together() {
        let p = project_at(7);
        let items = seed_phase(p.id, p.current_phase);
        let found = blockers(&p, &items);
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn test_optional_phase_advances_with_open_items() {
        let mut p = project_at(3);
        let items = seed_phase(p.id, p.current_phase);
        assert!(advance(&mut p, &items, &[], UserId::generate(), Utc::now()).is_ok());
        assert_eq!(p.current_phase.number(), 4);
    }

    #[test]
    fn test_final_phase_is_noop() {
        let mut p = project_at(8);
        let before = p.updated_at;
        let outcome = advance(&mut p, &[], &[], UserId::generate(), Utc::now()).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::AlreadyFinal));
        assert_eq!(p.current_phase, Phase::FINAL);
        assert_eq!(p.updated_at, before);
    }

    #[test]
    fn test_other_projects_items_ignored() {
        let mut p = project_at(2);
        let other = project_at(2);
        let foreign = seed_phase(other.id, other.current_phase);
        assert!(advance(&mut p, &foreign, &[], UserId::generate(), Utc::now()).is_ok());
    }

    #[test]
    fn test_readiness_warns_on_documents() {
        let p = project_at(2);
        let items = completed(&p);
        let uploaded = Document {
            id: DocumentId::generate(),
            project_id: p.id,
            phase: p.current_phase,
            slot_key: "coi_declaration".into(),
            slot_name: "Conflict of Interest Declaration".into(),
            original_filename: "coi.pdf".into(),
            stored_filename: "x_coi.pdf".into(),
            file_size: 10,
            uploaded_by: UserId::generate(),
            uploaded_at: Utc::now(),
            status: ReviewStatus::Pending,
            review_notes: None,
            reviewed_by: None,
            reviewed_at: None,
        };
        let r = readiness(&p, &items, &[uploaded]);
        assert!(r.can_advance);
        assert!(r.blockers.is_empty());
        // two slots missing, one uploaded but unreviewed
        assert_eq!(r.warnings.len(), 3);
        assert!(r.warnings.iter().any(|w| matches!(
            w,
            Warning::DocumentNotApproved { slot, .. } if slot == "coi_declaration"
        )));
    }

    #[test]
    fn test_readiness_in_final_phase() {
        let p = project_at(8);
        let r = readiness(&p, &[], &[]);
        assert!(r.is_final);
        assert!(!r.can_advance);
        assert!(r.warnings.is_empty());
    }
}
