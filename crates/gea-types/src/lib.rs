//! GEA Types - Core types for the certification workflow portal
//!
//! GLABs (licensed assessment bodies) take Client organizations through a
//! fixed pipeline of certification phases. GEA reviews and approves the work
//! and collects a share of the assessment fees.
//!
//! ## Key Concepts
//!
//! - **Glab / Client**: the organization registry
//! - **Project**: one certification engagement, advancing phase by phase
//! - **Phase**: a stage of the fixed workflow, see [`phase::PHASES`]
//! - **ChecklistItem**: a task that gates phase advancement when required
//! - **Document**: an upload into a named per-phase slot, reviewed by GEA
//! - **Money**: integer minor units; fee splits never lose a cent

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod checklist;
pub mod cpd;
pub mod document;
pub mod ids;
pub mod log;
pub mod messaging;
pub mod money;
pub mod organization;
pub mod phase;
pub mod project;
pub mod reminder;
pub mod role;
pub mod user;

pub use checklist::{CheckType, ChecklistItem, QualityChecklistItem};
pub use cpd::{CpdLog, CpdStatus};
pub use document::{Document, PhaseTemplate};
pub use ids::{
    AnnouncementId, ChatMessageId, ChecklistItemId, ClientId, CpdLogId, DocumentId, GlabId,
    IdParseError, NotificationId, PhaseLogId, PhaseTemplateId, ProjectId, QualityItemId,
    ReminderId, UserId,
};
pub use log::{PhaseAction, PhaseLog};
pub use messaging::{
    Announcement, AnnouncementPriority, ChatMessage, LinkRef, Notification, NotificationKind,
};
pub use money::Money;
pub use organization::{Client, Glab, GlabStatus, LicenseType};
pub use phase::{DocumentSlot, PaymentGate, Phase, PhaseDefinition, PHASES};
pub use project::{
    AssessmentType, FeeSchedule, FeeSplit, GeaReview, PaymentState, Project, ReviewDecision,
    ReviewStatus,
};
pub use reminder::{ReminderKey, ReminderTarget, ReminderType, ScheduledReminder};
pub use role::{Role, StaffFunction};
pub use user::User;
