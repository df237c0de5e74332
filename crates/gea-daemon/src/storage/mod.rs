//! Storage layer for gea-daemon
//!
//! Provides persistence for the organization registry, projects and their
//! per-phase records, messaging, CPD logs and reminder bookkeeping.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{
    AdvanceCommit, AnnouncementStorage, ChatStorage, ChecklistStorage, ClientStorage, CpdStorage,
    DocumentStorage, GlabStorage, NotificationStorage, PhaseLogStorage, ProjectStorage,
    ReminderStorage, Session, SessionStorage, Storage, StorageResult, TemplateStorage,
    UserStorage,
};
