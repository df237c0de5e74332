//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gea_types::{
    Announcement, AnnouncementId, ChatMessage, ChecklistItem, ChecklistItemId, Client, ClientId,
    CpdLog, CpdLogId, Document, DocumentId, Glab, GlabId, Notification, NotificationId, Phase,
    PhaseLog, PhaseTemplate, PhaseTemplateId, Project, ProjectId, QualityChecklistItem,
    QualityItemId, ScheduledReminder, User, UserId,
};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Combined storage trait
#[async_trait]
pub trait Storage:
    UserStorage
    + SessionStorage
    + GlabStorage
    + ClientStorage
    + ProjectStorage
    + ChecklistStorage
    + DocumentStorage
    + TemplateStorage
    + PhaseLogStorage
    + ChatStorage
    + NotificationStorage
    + AnnouncementStorage
    + CpdStorage
    + ReminderStorage
    + Send
    + Sync
{
}

/// Storage for user accounts
#[async_trait]
pub trait UserStorage: Send + Sync {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// All users, newest first
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    /// Insert a new user; `Conflict` if the username or email is taken
    async fn insert_user(&self, user: User) -> StorageResult<()>;

    /// Replace an existing user's profile; `Conflict` if the new email is
    /// taken. The stored active flag and password digest are kept: those
    /// change only through `set_user_active` and `set_password_hash`.
    async fn update_user(&self, user: User) -> StorageResult<()>;

    /// Activate or deactivate a user; returns the stored user
    async fn set_user_active(&self, id: &UserId, active: bool) -> StorageResult<User>;

    async fn set_password_hash(&self, id: &UserId, password_hash: String) -> StorageResult<()>;

    async fn count_users(&self) -> StorageResult<usize>;
}

/// A bearer token bound to a user
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Storage for login sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn create_session(&self, session: Session) -> StorageResult<()>;

    /// Look up an unexpired session
    async fn get_session(&self, token: &str, now: DateTime<Utc>) -> StorageResult<Option<Session>>;

    async fn delete_session(&self, token: &str) -> StorageResult<bool>;
}

/// Storage for GLABs
#[async_trait]
pub trait GlabStorage: Send + Sync {
    async fn get_glab(&self, id: &GlabId) -> StorageResult<Option<Glab>>;

    async fn list_glabs(&self) -> StorageResult<Vec<Glab>>;

    /// Insert a GLAB; `Conflict` if the license number is taken
    async fn insert_glab(&self, glab: Glab) -> StorageResult<()>;

    async fn update_glab(&self, glab: Glab) -> StorageResult<()>;
}

/// Storage for clients
#[async_trait]
pub trait ClientStorage: Send + Sync {
    async fn get_client(&self, id: &ClientId) -> StorageResult<Option<Client>>;

    /// Clients of one GLAB, or all when `glab` is `None`; newest first
    async fn list_clients(&self, glab: Option<&GlabId>) -> StorageResult<Vec<Client>>;

    async fn insert_client(&self, client: Client) -> StorageResult<()>;
}

/// Storage for projects
#[async_trait]
pub trait ProjectStorage: Send + Sync {
    async fn get_project(&self, id: &ProjectId) -> StorageResult<Option<Project>>;

    /// All projects, newest first
    async fn list_projects(&self) -> StorageResult<Vec<Project>>;

    async fn list_projects_for_glab(&self, glab: &GlabId) -> StorageResult<Vec<Project>>;

    /// Projects a GLAB created in a calendar year
    async fn count_projects_in_year(&self, glab: &GlabId, year: i32) -> StorageResult<usize>;

    /// Insert a project; `Conflict` if the reference number is taken
    async fn insert_project(&self, project: Project) -> StorageResult<()>;

    /// Replace a project that was loaded in phase `expected`.
    ///
    /// Never moves the phase: `InvalidData` if `project.current_phase` is not
    /// `expected`, `Conflict` if the stored project has advanced since.
    async fn update_project(&self, project: Project, expected: Phase) -> StorageResult<()>;

    /// Apply a phase advance with its seeded checklists and history entry,
    /// all or nothing; `Conflict` if the stored phase is no longer
    /// `commit.expected`
    async fn commit_advance(&self, commit: AdvanceCommit) -> StorageResult<()>;
}

/// Everything one phase advance writes
#[derive(Debug, Clone)]
pub struct AdvanceCommit {
    /// The project, already moved to the phase after `expected`
    pub project: Project,
    /// Phase the project was in when loaded
    pub expected: Phase,
    pub checklist: Vec<ChecklistItem>,
    pub quality: Vec<QualityChecklistItem>,
    pub log: PhaseLog,
}

impl AdvanceCommit {
    /// `InvalidData` unless the project moves exactly one phase forward
    pub fn validate(&self) -> StorageResult<()> {
        if self.expected.next() != Some(self.project.current_phase) {
            return Err(StorageError::InvalidData(format!(
                "project {} cannot move from phase {} to {}",
                self.project.id,
                self.expected.number(),
                self.project.current_phase.number()
            )));
        }
        Ok(())
    }
}

/// Storage for operational and quality checklists
#[async_trait]
pub trait ChecklistStorage: Send + Sync {
    /// Items of a project, ordered by phase then order
    async fn list_checklist(&self, project: &ProjectId) -> StorageResult<Vec<ChecklistItem>>;

    async fn get_checklist_item(&self, id: &ChecklistItemId)
        -> StorageResult<Option<ChecklistItem>>;

    async fn insert_checklist_items(&self, items: Vec<ChecklistItem>) -> StorageResult<()>;

    async fn update_checklist_item(&self, item: ChecklistItem) -> StorageResult<()>;

    async fn list_quality_checklist(
        &self,
        project: &ProjectId,
    ) -> StorageResult<Vec<QualityChecklistItem>>;

    async fn get_quality_item(&self, id: &QualityItemId)
        -> StorageResult<Option<QualityChecklistItem>>;

    async fn insert_quality_items(&self, items: Vec<QualityChecklistItem>) -> StorageResult<()>;

    async fn update_quality_item(&self, item: QualityChecklistItem) -> StorageResult<()>;
}

/// Storage for uploaded documents
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    async fn get_document(&self, id: &DocumentId) -> StorageResult<Option<Document>>;

    /// Documents of a project, newest first
    async fn list_documents(&self, project: &ProjectId) -> StorageResult<Vec<Document>>;

    /// Documents across all projects with the given review status
    async fn list_documents_pending_review(&self) -> StorageResult<Vec<Document>>;

    async fn insert_document(&self, document: Document) -> StorageResult<()>;

    async fn update_document(&self, document: Document) -> StorageResult<()>;
}

/// Storage for phase templates
#[async_trait]
pub trait TemplateStorage: Send + Sync {
    async fn get_template(&self, id: &PhaseTemplateId) -> StorageResult<Option<PhaseTemplate>>;

    /// Active templates ordered by phase
    async fn list_templates(&self) -> StorageResult<Vec<PhaseTemplate>>;

    /// Insert a template, deactivating earlier ones for the same slot
    async fn insert_template(&self, template: PhaseTemplate) -> StorageResult<()>;
}

/// Append-only phase history
#[async_trait]
pub trait PhaseLogStorage: Send + Sync {
    async fn append_phase_log(&self, log: PhaseLog) -> StorageResult<()>;

    /// History of a project, oldest first
    async fn list_phase_logs(&self, project: &ProjectId) -> StorageResult<Vec<PhaseLog>>;
}

/// Storage for project chat
#[async_trait]
pub trait ChatStorage: Send + Sync {
    async fn insert_message(&self, message: ChatMessage) -> StorageResult<()>;

    /// Messages of a project, oldest first
    async fn list_messages(&self, project: &ProjectId) -> StorageResult<Vec<ChatMessage>>;

    /// Mark messages not sent by `reader` as read; returns how many changed
    async fn mark_messages_read(&self, project: &ProjectId, reader: &UserId)
        -> StorageResult<usize>;
}

/// Storage for notifications
#[async_trait]
pub trait NotificationStorage: Send + Sync {
    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StorageResult<()>;

    /// Newest first, at most `limit`
    async fn list_notifications(&self, user: &UserId, limit: usize)
        -> StorageResult<Vec<Notification>>;

    async fn unread_count(&self, user: &UserId) -> StorageResult<usize>;

    /// Mark one of the user's notifications read; `false` if it is not theirs
    async fn mark_notification_read(
        &self,
        user: &UserId,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    async fn mark_all_read(&self, user: &UserId, at: DateTime<Utc>) -> StorageResult<usize>;
}

/// Storage for announcements
#[async_trait]
pub trait AnnouncementStorage: Send + Sync {
    async fn get_announcement(&self, id: &AnnouncementId) -> StorageResult<Option<Announcement>>;

    /// All announcements, newest first, including inactive ones
    async fn list_announcements(&self) -> StorageResult<Vec<Announcement>>;

    async fn insert_announcement(&self, announcement: Announcement) -> StorageResult<()>;

    async fn update_announcement(&self, announcement: Announcement) -> StorageResult<()>;
}

/// Storage for CPD logs
#[async_trait]
pub trait CpdStorage: Send + Sync {
    async fn get_cpd_log(&self, id: &CpdLogId) -> StorageResult<Option<CpdLog>>;

    /// Logs of one assessor, or all when `None`; newest first
    async fn list_cpd_logs(&self, assessor: Option<&UserId>) -> StorageResult<Vec<CpdLog>>;

    async fn insert_cpd_log(&self, log: CpdLog) -> StorageResult<()>;

    async fn update_cpd_log(&self, log: CpdLog) -> StorageResult<()>;
}

/// Reminder dedup records
#[async_trait]
pub trait ReminderStorage: Send + Sync {
    /// Record a reminder together with its notifications unless a row with
    /// the same key exists; `true` if recorded.
    ///
    /// Must be atomic: of two concurrent calls with one key, one wins, and a
    /// key is never recorded without its notifications.
    async fn record_reminder(
        &self,
        reminder: ScheduledReminder,
        notifications: Vec<Notification>,
    ) -> StorageResult<bool>;

    async fn list_reminders(&self) -> StorageResult<Vec<ScheduledReminder>>;
}
