//! GEA Workflow - Domain logic of the certification portal
//!
//! Everything here is pure: callers load state from storage, hand it in,
//! and persist whatever comes back.
//!
//! - [`engine`]: gated phase advancement and readiness reporting
//! - [`fees`]: fee totals and the GEA / GLAB split
//! - [`checklist`]: seeding and custom items
//! - [`policy`]: who may see and do what
//! - [`reminders`]: deadline reminder planning
//! - [`upload`]: file name and size validation
//! - [`password`]: salted password digests and session tokens

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod checklist;
pub mod engine;
pub mod error;
pub mod fees;
pub mod password;
pub mod policy;
pub mod reference;
pub mod reminders;
pub mod upload;

pub use engine::{
    advance, blockers, readiness, AdvanceOutcome, Advancement, Blocker, Readiness, Warning,
};
pub use error::{WorkflowError, WorkflowResult};
pub use fees::{FeeCalculator, DEFAULT_GEA_FEE_BPS};
pub use policy::{AccessDecision, Actor};
pub use reference::{reference_number, ReferenceAllocator};
pub use reminders::{DueReminder, DEFAULT_REMINDER_OFFSETS};
