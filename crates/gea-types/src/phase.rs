//! The fixed certification phase pipeline
//!
//! Projects move through eight phases in order, one step at a time. Each
//! phase names its document upload slots, the GLAB-side checklist seeded on
//! entry, and the checklist GEA uses when reviewing the phase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A phase number in `1..=8`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Phase(u8);

impl Phase {
    pub const FIRST: Phase = Phase(1);
    pub const FINAL: Phase = Phase(PHASES.len() as u8);

    pub fn new(number: u8) -> Option<Self> {
        if (1..=Self::FINAL.0).contains(&number) {
            Some(Self(number))
        } else {
            None
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn is_final(&self) -> bool {
        *self == Self::FINAL
    }

    /// The following phase, or `None` at the end of the pipeline
    pub fn next(&self) -> Option<Phase> {
        Phase::new(self.0 + 1)
    }

    pub fn definition(&self) -> &'static PhaseDefinition {
        &PHASES[(self.0 - 1) as usize]
    }

    pub fn key(&self) -> &'static str {
        self.definition().key
    }

    pub fn name(&self) -> &'static str {
        self.definition().name
    }

    /// Resolve a phase by its stable key, e.g. `"engagement"`
    pub fn from_key(key: &str) -> Option<Phase> {
        PHASES
            .iter()
            .find(|p| p.key == key)
            .and_then(|p| Phase::new(p.number))
    }

    pub fn all() -> impl Iterator<Item = Phase> {
        (1..=Self::FINAL.0).map(Phase)
    }
}

impl TryFrom<u8> for Phase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Phase::new(value)
            .ok_or_else(|| format!("phase {} out of range 1..={}", value, Self::FINAL.0))
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}: {}", self.0, self.name())
    }
}

/// A named upload slot within a phase
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DocumentSlot {
    pub key: &'static str,
    pub name: &'static str,
    pub required: bool,
}

/// Payment that must be on record before a phase may be left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentGate {
    /// First 50% collected at engagement
    InitialPayment,
    /// Remaining 50% collected at the certification decision
    FinalPayment,
}

/// Static description of one phase
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PhaseDefinition {
    pub number: u8,
    pub key: &'static str,
    pub name: &'static str,

    /// Optional phases seed their checklist as not required
    pub optional: bool,

    /// GEA must approve the project before it leaves this phase
    pub requires_gea_approval: bool,

    /// Payment that must be recorded before leaving this phase
    pub payment_gate: Option<PaymentGate>,

    pub documents: &'static [DocumentSlot],
    pub default_checklist: &'static [&'static str],
    pub gea_review_checklist: &'static [&'static str],
}

impl PhaseDefinition {
    pub fn slot(&self, key: &str) -> Option<&'static DocumentSlot> {
        self.documents.iter().find(|d| d.key == key)
    }

    pub fn required_slots(&self) -> impl Iterator<Item = &'static DocumentSlot> {
        self.documents.iter().filter(|d| d.required)
    }
}

const fn slot(key: &'static str, name: &'static str, required: bool) -> DocumentSlot {
    DocumentSlot { key, name, required }
}

/// The eight phases, in workflow order
pub static PHASES: [PhaseDefinition; 8] = [
    PhaseDefinition {
        number: 1,
        key: "enrollment",
        name: "Expression of Interest & Enrollment",
        optional: false,
        requires_gea_approval: true,
        payment_gate: None,
        documents: &[
            slot("enrollment_form", "GEA Certification Enrollment Form", true),
            slot("readiness_checklist", "Enrollment Readiness Criteria/Checklist", true),
        ],
        default_checklist: &[
            "Enrollment form received and complete",
            "Eligibility criteria verified",
            "Organizational scope defined",
            "Multi-site requirements clarified (if applicable)",
            "Timeline expectations documented",
            "Resource commitment confirmed",
            "Preliminary risk assessment completed",
            "Enrollment decision communicated",
        ],
        gea_review_checklist: &[
            "Enrollment form complete and accurate",
            "Organization meets eligibility criteria",
            "Scope appropriately defined",
            "Risk assessment is adequate",
        ],
    },
    PhaseDefinition {
        number: 2,
        key: "safeguards",
        name: "Ethical Safeguards & Assessor Assignment",
        optional: false,
        requires_gea_approval: false,
        payment_gate: None,
        documents: &[
            slot("coi_declaration", "Conflict of Interest Declaration", true),
            slot("code_of_conduct", "Assessor Code of Conduct & Posture Guide", true),
            slot("assessor_checklist", "GEA Assessor Checklist", true),
        ],
        default_checklist: &[
            "Conflict of interest declarations obtained",
            "All conflicts reviewed and resolved",
            "Assessor competencies matched to scope",
            "Code of conduct acknowledged",
            "Team composition finalized",
            "Confidentiality agreements signed",
            "Assessment team briefing conducted",
            "Organization notified of team assignment",
        ],
        gea_review_checklist: &[
            "All COI declarations submitted",
            "No unresolved conflicts of interest",
            "Assessor team appropriately qualified",
            "Code of conduct signed by all assessors",
        ],
    },
    PhaseDefinition {
        number: 3,
        key: "preliminary",
        name: "Preliminary Assessment (Optional)",
        optional: true,
        requires_gea_approval: false,
        payment_gate: None,
        documents: &[
            slot("preliminary_request", "Preliminary Assessment Request Form", false),
            slot("preliminary_report", "Preliminary Assessment Report", false),
        ],
        default_checklist: &[
            "Preliminary assessment request received",
            "Scope and objectives clarified",
            "Implementation evidence reviewed",
            "Leadership interviews conducted",
            "Cultural/operational observations completed",
            "Preliminary findings documented",
            "Improvement recommendations identified",
            "Preliminary report delivered",
            "Improvement period timeline agreed",
        ],
        gea_review_checklist: &[
            "Preliminary report follows required format",
            "Findings are objective and evidence-based",
            "Recommendations are appropriate",
            "Improvement timeline is reasonable",
        ],
    },
    PhaseDefinition {
        number: 4,
        key: "engagement",
        name: "Engagement & Planning",
        optional: false,
        requires_gea_approval: true,
        payment_gate: Some(PaymentGate::InitialPayment),
        documents: &[
            slot("letter_of_engagement", "Letter of Engagement", true),
            slot("planning_form", "Assessment Planning & Logistics Form", true),
            slot("timeline_map", "Assessment Timeline & Workflow Map", true),
        ],
        default_checklist: &[
            "Readiness verification completed",
            "Letter of Engagement drafted",
            "Scope and boundaries confirmed",
            "Assessment timeline developed",
            "Site visit schedule finalized",
            "Resource requirements confirmed",
            "Communication protocols established",
            "Logistics arrangements completed",
            "Stakeholder responsibilities defined",
            "Engagement documents signed",
            "Initial payment (50%) collected",
            "GEA fee remitted for initial payment",
        ],
        gea_review_checklist: &[
            "Letter of Engagement properly executed",
            "Scope is clearly defined",
            "Timeline is realistic",
            "Initial payment received",
            "GEA fee remitted",
        ],
    },
    PhaseDefinition {
        number: 5,
        key: "assessment",
        name: "Formal Assessment",
        optional: false,
        requires_gea_approval: false,
        payment_gate: None,
        documents: &[
            slot("triangulation_checklist", "Triangulation Checklist Sheet", true),
            slot("rca_worksheet", "Root Cause Analysis (RCA) Worksheet", true),
            slot("ncr_form", "Non-Conformance Tracker (NCR / CAR Form)", true),
        ],
        default_checklist: &[
            "Document review completed",
            "Assessment tools prepared",
            "Evidence requirements communicated",
            "Opening meeting conducted",
            "All 8 dimensions assessed",
            "Triangulation methodology applied",
            "Evidence collection documented",
            "Root cause analysis performed",
            "Non-conformances identified",
            "CARs issued as required",
            "Daily team debriefs conducted",
            "Closing meeting held",
            "Evidence organized and secured",
            "Finding validation completed",
            "Non-conformance tracker updated",
        ],
        gea_review_checklist: &[
            "All dimensions properly assessed",
            "Triangulation properly applied",
            "Evidence is sufficient and verifiable",
            "Non-conformances appropriately identified",
            "CARs properly documented",
        ],
    },
    PhaseDefinition {
        number: 6,
        key: "reporting",
        name: "Reporting & Peer Review",
        optional: false,
        requires_gea_approval: true,
        payment_gate: None,
        documents: &[
            slot("assessment_report", "Formal Assessment Report", true),
            slot("peer_review_checklist", "Peer Review Guide / Checklist", true),
        ],
        default_checklist: &[
            "Draft report prepared",
            "Evidence references verified",
            "Cross-dimensional analysis completed",
            "Report structure compliance checked",
            "Peer reviewer assigned",
            "Peer review conducted",
            "Review feedback addressed",
            "Final report approved",
            "Report delivered to GLAB",
        ],
        gea_review_checklist: &[
            "Report follows required format",
            "All findings are evidence-based",
            "Cross-dimensional analysis is comprehensive",
            "Peer review properly conducted",
            "Feedback has been addressed",
        ],
    },
    PhaseDefinition {
        number: 7,
        key: "certification",
        name: "Certification Decision",
        optional: false,
        requires_gea_approval: true,
        payment_gate: Some(PaymentGate::FinalPayment),
        documents: &[
            slot("decision_record", "Certification Decision Record", true),
            slot("feedback_report", "Feedback Report to Organization", true),
        ],
        default_checklist: &[
            "Report submitted for decision",
            "Certification criteria evaluated",
            "Risk assessment completed",
            "Decision record prepared",
            "Feedback report developed",
            "Decision communicated to organization",
            "Certificate issued (if applicable)",
            "Appeals process explained",
            "Final payment (50%) collected",
            "GEA fee remitted for final payment",
        ],
        gea_review_checklist: &[
            "Decision is supported by evidence",
            "Decision record is complete",
            "Feedback report is objective",
            "Final payment received",
            "GEA fee remitted",
            "Certificate ready for issuance (if approved)",
        ],
    },
    PhaseDefinition {
        number: 8,
        key: "post_certification",
        name: "Post-Certification Obligations",
        optional: false,
        requires_gea_approval: false,
        payment_gate: None,
        documents: &[
            slot("change_notification", "Change Notification Form", false),
            slot("feedback_form", "Feedback Form on GLAB Services", false),
        ],
        default_checklist: &[
            "Change notification process explained",
            "Surveillance schedule established",
            "Continuous improvement expectations set",
            "Feedback on GLAB services requested",
            "Assessment documents archived",
            "Confidential materials returned/destroyed",
            "Final billing processed",
            "Case study permissions obtained (optional)",
        ],
        gea_review_checklist: &[
            "Surveillance schedule is appropriate",
            "All documentation properly archived",
            "Organization informed of obligations",
            "Feedback collected",
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_numbered_in_order() {
        for (idx, def) in PHASES.iter().enumerate() {
            assert_eq!(def.number as usize, idx + 1);
        }
    }

    #[test]
    fn test_phase_bounds() {
        assert!(Phase::new(0).is_none());
        assert!(Phase::new(9).is_none());
        assert_eq!(Phase::FINAL.number(), 8);
        assert!(Phase::FINAL.next().is_none());
        assert_eq!(Phase::FIRST.next(), Phase::new(2));
    }

    #[test]
    fn test_keys_are_unique_and_resolvable() {
        for phase in Phase::all() {
            assert_eq!(Phase::from_key(phase.key()), Some(phase));
        }
        assert!(Phase::from_key("unknown").is_none());
    }

    #[test]
    fn test_slot_keys_unique_across_catalog() {
        let mut keys: Vec<&str> = PHASES
            .iter()
            .flat_map(|p| p.documents.iter().map(|d| d.key))
            .collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Phase>("4").is_ok());
        assert!(serde_json::from_str::<Phase>("12").is_err());
    }

    #[test]
    fn test_payment_gates() {
        assert_eq!(
            Phase::from_key("engagement").unwrap().definition().payment_gate,
            Some(PaymentGate::InitialPayment)
        );
        assert_eq!(
            Phase::from_key("certification").unwrap().definition().payment_gate,
            Some(PaymentGate::FinalPayment)
        );
    }
}
