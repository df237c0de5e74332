//! Certification projects

use crate::{ClientId, GlabId, Money, Phase, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of assessment a project performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentType {
    #[default]
    Initial,
    Surveillance,
    Recertification,
}

/// GEA review state, shared by projects and documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
    Denied,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::ChangesRequested => "changes_requested",
            ReviewStatus::Denied => "denied",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict a reviewer may hand down; `Pending` is not a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    Denied,
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => ReviewStatus::Approved,
            ReviewDecision::ChangesRequested => ReviewStatus::ChangesRequested,
            ReviewDecision::Denied => ReviewStatus::Denied,
        }
    }
}

/// GEA review of the project's current phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeaReview {
    pub status: ReviewStatus,
    pub notes: Option<String>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl GeaReview {
    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    /// Back to pending; the previous verdict applied to the phase just left
    pub fn reset(&mut self) {
        *self = GeaReview::default();
    }
}

/// How a project's total fee is composed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeeSchedule {
    /// A single agreed amount
    Flat { total: Money },

    /// Assessor days at a day rate, plus extras
    DayRate {
        days: u32,
        day_rate: Money,
        #[serde(default)]
        multi_site_premium: Money,
        #[serde(default)]
        other_fees: Money,
        #[serde(default)]
        taxes: Money,
    },
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule::Flat { total: Money::ZERO }
    }
}

/// Derived split of the total fee between GEA and the GLAB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeSplit {
    pub total: Money,
    pub gea_fee: Money,
    pub glab_revenue: Money,
}

/// Payment and remittance record of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentState {
    /// First 50%, collected at engagement
    pub initial_received_at: Option<DateTime<Utc>>,
    /// Remaining 50%, collected at the certification decision
    pub final_received_at: Option<DateTime<Utc>>,
    /// GEA fee paid over by the GLAB
    pub gea_fee_remitted_at: Option<DateTime<Utc>>,
}

impl PaymentState {
    pub fn initial_received(&self) -> bool {
        self.initial_received_at.is_some()
    }

    pub fn final_received(&self) -> bool {
        self.final_received_at.is_some()
    }

    pub fn gea_fee_remitted(&self) -> bool {
        self.gea_fee_remitted_at.is_some()
    }

    /// Any client payment on record
    pub fn any_received(&self) -> bool {
        self.initial_received() || self.final_received()
    }
}

/// A certification project run by a GLAB for one client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,

    /// `{license}-{year}-{count:04}`, unique
    pub reference_number: String,

    pub glab_id: GlabId,
    pub client_id: ClientId,
    pub lead_assessor_id: Option<UserId>,
    pub assessment_type: AssessmentType,

    /// Phase the project is in; only ever moves forward by one
    pub current_phase: Phase,

    /// GEA verdict on the current phase
    pub review: GeaReview,

    pub fees: FeeSchedule,
    pub split: FeeSplit,
    pub payments: PaymentState,

    #[serde(default)]
    pub assessors: Vec<UserId>,
    #[serde(default)]
    pub technical_experts: Vec<UserId>,
    #[serde(default)]
    pub committee_members: Vec<UserId>,

    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// A new project in the first phase, pending review
    pub fn new(
        reference_number: impl Into<String>,
        glab_id: GlabId,
        client_id: ClientId,
        fees: FeeSchedule,
        split: FeeSplit,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::generate(),
            reference_number: reference_number.into(),
            glab_id,
            client_id,
            lead_assessor_id: None,
            assessment_type: AssessmentType::Initial,
            current_phase: Phase::FIRST,
            review: GeaReview::default(),
            fees,
            split,
            payments: PaymentState::default(),
            assessors: Vec::new(),
            technical_experts: Vec::new(),
            committee_members: Vec::new(),
            created_at: now,
            created_by: None,
            updated_at: now,
        }
    }

    pub fn is_assessor(&self, user: UserId) -> bool {
        self.lead_assessor_id == Some(user) || self.assessors.contains(&user)
    }

    /// Assigned in any capacity
    pub fn is_participant(&self, user: UserId) -> bool {
        self.is_assessor(user)
            || self.technical_experts.contains(&user)
            || self.committee_members.contains(&user)
    }

    /// Users assigned to the project, lead first, without duplicates
    pub fn participants(&self) -> Vec<UserId> {
        let mut out: Vec<UserId> = Vec::new();
        let all = self
            .lead_assessor_id
            .iter()
            .chain(&self.assessors)
            .chain(&self.technical_experts)
            .chain(&self.committee_members);
        for id in all {
            if !out.contains(id) {
                out.push(*id);
            }
        }
        out
    }

    /// Outstanding GEA fee: a payment was received but not yet remitted
    pub fn gea_fee_outstanding(&self) -> bool {
        self.payments.any_received() && !self.payments.gea_fee_remitted()
    }
}
