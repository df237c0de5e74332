//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use gea_types::{
    Announcement, AnnouncementId, ChatMessage, ChecklistItem, ChecklistItemId, Client, ClientId,
    CpdLog, CpdLogId, Document, DocumentId, Glab, GlabId, Notification, NotificationId, Phase,
    PhaseLog, PhaseTemplate, PhaseTemplateId, Project, ProjectId, QualityChecklistItem,
    QualityItemId, ReminderKey, ReviewStatus, ScheduledReminder, User, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for development and testing
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    glabs: Arc<RwLock<HashMap<GlabId, Glab>>>,
    clients: Arc<RwLock<HashMap<ClientId, Client>>>,
    projects: Arc<RwLock<HashMap<ProjectId, Project>>>,
    checklist: Arc<RwLock<HashMap<ChecklistItemId, ChecklistItem>>>,
    quality: Arc<RwLock<HashMap<QualityItemId, QualityChecklistItem>>>,
    documents: Arc<RwLock<HashMap<DocumentId, Document>>>,
    templates: Arc<RwLock<HashMap<PhaseTemplateId, PhaseTemplate>>>,
    phase_logs: Arc<RwLock<Vec<PhaseLog>>>,
    messages: Arc<RwLock<Vec<ChatMessage>>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
    announcements: Arc<RwLock<HashMap<AnnouncementId, Announcement>>>,
    cpd_logs: Arc<RwLock<HashMap<CpdLogId, CpdLog>>>,
    reminders: Arc<RwLock<HashMap<ReminderKey, ScheduledReminder>>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut items: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
}

#[async_trait]
impl UserStorage for InMemoryStorage {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(newest_first(users.values().cloned().collect(), |u| u.created_at))
    }

    async fn insert_user(&self, user: User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict(format!(
                "username '{}' already exists",
                user.username
            )));
        }
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict(format!(
                "email '{}' already registered",
                user.email
            )));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StorageError::Conflict(format!(
                "email '{}' already registered",
                user.email
            )));
        }
        let Some(stored) = users.get_mut(&user.id) else {
            return Err(StorageError::NotFound(format!("user {}", user.id)));
        };
        let is_active = stored.is_active;
        let password_hash = std::mem::take(&mut stored.password_hash);
        *stored = User {
            is_active,
            password_hash,
            ..user
        };
        Ok(())
    }

    async fn set_user_active(&self, id: &UserId, active: bool) -> StorageResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", id)))?;
        user.is_active = active;
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: &UserId, password_hash: String) -> StorageResult<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(format!("user {}", id)))?;
        user.password_hash = password_hash;
        Ok(())
    }

    async fn count_users(&self) -> StorageResult<usize> {
        Ok(self.users.read().await.len())
    }
}

#[async_trait]
impl SessionStorage for InMemoryStorage {
    async fn create_session(&self, session: Session) -> StorageResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn get_session(&self, token: &str, now: DateTime<Utc>) -> StorageResult<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(token).filter(|s| s.expires_at > now).cloned())
    }

    async fn delete_session(&self, token: &str) -> StorageResult<bool> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.remove(token).is_some())
    }
}

#[async_trait]
impl GlabStorage for InMemoryStorage {
    async fn get_glab(&self, id: &GlabId) -> StorageResult<Option<Glab>> {
        let glabs = self.glabs.read().await;
        Ok(glabs.get(id).cloned())
    }

    async fn list_glabs(&self) -> StorageResult<Vec<Glab>> {
        let glabs = self.glabs.read().await;
        let mut all: Vec<Glab> = glabs.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn insert_glab(&self, glab: Glab) -> StorageResult<()> {
        let mut glabs = self.glabs.write().await;
        if glabs.values().any(|g| g.license_number == glab.license_number) {
            return Err(StorageError::Conflict(format!(
                "license number '{}' already exists",
                glab.license_number
            )));
        }
        glabs.insert(glab.id, glab);
        Ok(())
    }

    async fn update_glab(&self, glab: Glab) -> StorageResult<()> {
        let mut glabs = self.glabs.write().await;
        if !glabs.contains_key(&glab.id) {
            return Err(StorageError::NotFound(format!("GLAB {}", glab.id)));
        }
        glabs.insert(glab.id, glab);
        Ok(())
    }
}

#[async_trait]
impl ClientStorage for InMemoryStorage {
    async fn get_client(&self, id: &ClientId) -> StorageResult<Option<Client>> {
        let clients = self.clients.read().await;
        Ok(clients.get(id).cloned())
    }

    async fn list_clients(&self, glab: Option<&GlabId>) -> StorageResult<Vec<Client>> {
        let clients = self.clients.read().await;
        let matching = clients
            .values()
            .filter(|c| glab.map_or(true, |g| &c.glab_id == g))
            .cloned()
            .collect();
        Ok(newest_first(matching, |c| c.created_at))
    }

    async fn insert_client(&self, client: Client) -> StorageResult<()> {
        let mut clients = self.clients.write().await;
        clients.insert(client.id, client);
        Ok(())
    }
}

#[async_trait]
impl ProjectStorage for InMemoryStorage {
    async fn get_project(&self, id: &ProjectId) -> StorageResult<Option<Project>> {
        let projects = self.projects.read().await;
        Ok(projects.get(id).cloned())
    }

    async fn list_projects(&self) -> StorageResult<Vec<Project>> {
        let projects = self.projects.read().await;
        Ok(newest_first(projects.values().cloned().collect(), |p| p.created_at))
    }

    async fn list_projects_for_glab(&self, glab: &GlabId) -> StorageResult<Vec<Project>> {
        let projects = self.projects.read().await;
        let matching = projects
            .values()
            .filter(|p| &p.glab_id == glab)
            .cloned()
            .collect();
        Ok(newest_first(matching, |p| p.created_at))
    }

    async fn count_projects_in_year(&self, glab: &GlabId, year: i32) -> StorageResult<usize> {
        let projects = self.projects.read().await;
        Ok(projects
            .values()
            .filter(|p| &p.glab_id == glab && p.created_at.year() == year)
            .count())
    }

    async fn insert_project(&self, project: Project) -> StorageResult<()> {
        let mut projects = self.projects.write().await;
        if projects
            .values()
            .any(|p| p.reference_number == project.reference_number)
        {
            return Err(StorageError::Conflict(format!(
                "reference number '{}' already exists",
                project.reference_number
            )));
        }
        projects.insert(project.id, project);
        Ok(())
    }

    async fn update_project(&self, project: Project, expected: Phase) -> StorageResult<()> {
        if project.current_phase != expected {
            return Err(StorageError::InvalidData(format!(
                "project {} update would move it out of phase {}",
                project.id,
                expected.number()
            )));
        }
        let mut projects = self.projects.write().await;
        match projects.get(&project.id) {
            None => Err(StorageError::NotFound(format!("project {}", project.id))),
            Some(stored) if stored.current_phase != expected => Err(StorageError::Conflict(
                format!("project {} is no longer in phase {}", project.id, expected.number()),
            )),
            Some(_) => {
                projects.insert(project.id, project);
                Ok(())
            }
        }
    }

    async fn commit_advance(&self, commit: AdvanceCommit) -> StorageResult<()> {
        commit.validate()?;

        // Every lock is held until all writes are applied
        let mut projects = self.projects.write().await;
        let mut checklist = self.checklist.write().await;
        let mut quality = self.quality.write().await;
        let mut phase_logs = self.phase_logs.write().await;

        let AdvanceCommit {
            project,
            expected,
            checklist: seeded,
            quality: seeded_quality,
            log,
        } = commit;

        let stored = projects
            .get_mut(&project.id)
            .ok_or_else(|| StorageError::NotFound(format!("project {}", project.id)))?;
        if stored.current_phase != expected {
            return Err(StorageError::Conflict(format!(
                "project {} is no longer in phase {}",
                project.id,
                expected.number()
            )));
        }

        stored.current_phase = project.current_phase;
        stored.review = project.review;
        stored.updated_at = project.updated_at;
        for item in seeded {
            checklist.insert(item.id, item);
        }
        for item in seeded_quality {
            quality.insert(item.id, item);
        }
        phase_logs.push(log);
        Ok(())
    }
}

#[async_trait]
impl ChecklistStorage for InMemoryStorage {
    async fn list_checklist(&self, project: &ProjectId) -> StorageResult<Vec<ChecklistItem>> {
        let checklist = self.checklist.read().await;
        let mut items: Vec<ChecklistItem> = checklist
            .values()
            .filter(|i| &i.project_id == project)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.phase, i.order));
        Ok(items)
    }

    async fn get_checklist_item(
        &self,
        id: &ChecklistItemId,
    ) -> StorageResult<Option<ChecklistItem>> {
        let checklist = self.checklist.read().await;
        Ok(checklist.get(id).cloned())
    }

    async fn insert_checklist_items(&self, items: Vec<ChecklistItem>) -> StorageResult<()> {
        let mut checklist = self.checklist.write().await;
        for item in items {
            checklist.insert(item.id, item);
        }
        Ok(())
    }

    async fn update_checklist_item(&self, item: ChecklistItem) -> StorageResult<()> {
        let mut checklist = self.checklist.write().await;
        if !checklist.contains_key(&item.id) {
            return Err(StorageError::NotFound(format!("checklist item {}", item.id)));
        }
        checklist.insert(item.id, item);
        Ok(())
    }

    async fn list_quality_checklist(
        &self,
        project: &ProjectId,
    ) -> StorageResult<Vec<QualityChecklistItem>> {
        let quality = self.quality.read().await;
        let mut items: Vec<QualityChecklistItem> = quality
            .values()
            .filter(|i| &i.project_id == project)
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.phase, i.order));
        Ok(items)
    }

    async fn get_quality_item(
        &self,
        id: &QualityItemId,
    ) -> StorageResult<Option<QualityChecklistItem>> {
        let quality = self.quality.read().await;
        Ok(quality.get(id).cloned())
    }

    async fn insert_quality_items(&self, items: Vec<QualityChecklistItem>) -> StorageResult<()> {
        let mut quality = self.quality.write().await;
        for item in items {
            quality.insert(item.id, item);
        }
        Ok(())
    }

    async fn update_quality_item(&self, item: QualityChecklistItem) -> StorageResult<()> {
        let mut quality = self.quality.write().await;
        if !quality.contains_key(&item.id) {
            return Err(StorageError::NotFound(format!("quality item {}", item.id)));
        }
        quality.insert(item.id, item);
        Ok(())
    }
}

#[async_trait]
impl DocumentStorage for InMemoryStorage {
    async fn get_document(&self, id: &DocumentId) -> StorageResult<Option<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.get(id).cloned())
    }

    async fn list_documents(&self, project: &ProjectId) -> StorageResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let matching = documents
            .values()
            .filter(|d| &d.project_id == project)
            .cloned()
            .collect();
        Ok(newest_first(matching, |d| d.uploaded_at))
    }

    async fn list_documents_pending_review(&self) -> StorageResult<Vec<Document>> {
        let documents = self.documents.read().await;
        let matching = documents
            .values()
            .filter(|d| d.status == ReviewStatus::Pending)
            .cloned()
            .collect();
        Ok(newest_first(matching, |d| d.uploaded_at))
    }

    async fn insert_document(&self, document: Document) -> StorageResult<()> {
        let mut documents = self.documents.write().await;
        documents.insert(document.id, document);
        Ok(())
    }

    async fn update_document(&self, document: Document) -> StorageResult<()> {
        let mut documents = self.documents.write().await;
        if !documents.contains_key(&document.id) {
            return Err(StorageError::NotFound(format!("document {}", document.id)));
        }
        documents.insert(document.id, document);
        Ok(())
    }
}

#[async_trait]
impl TemplateStorage for InMemoryStorage {
    async fn get_template(&self, id: &PhaseTemplateId) -> StorageResult<Option<PhaseTemplate>> {
        let templates = self.templates.read().await;
        Ok(templates.get(id).cloned())
    }

    async fn list_templates(&self) -> StorageResult<Vec<PhaseTemplate>> {
        let templates = self.templates.read().await;
        let mut active: Vec<PhaseTemplate> =
            templates.values().filter(|t| t.is_active).cloned().collect();
        active.sort_by(|a, b| (a.phase, &a.slot_key).cmp(&(b.phase, &b.slot_key)));
        Ok(active)
    }

    async fn insert_template(&self, template: PhaseTemplate) -> StorageResult<()> {
        let mut templates = self.templates.write().await;
        for existing in templates.values_mut() {
            if existing.phase == template.phase && existing.slot_key == template.slot_key {
                existing.is_active = false;
            }
        }
        templates.insert(template.id, template);
        Ok(())
    }
}

#[async_trait]
impl PhaseLogStorage for InMemoryStorage {
    async fn append_phase_log(&self, log: PhaseLog) -> StorageResult<()> {
        self.phase_logs.write().await.push(log);
        Ok(())
    }

    async fn list_phase_logs(&self, project: &ProjectId) -> StorageResult<Vec<PhaseLog>> {
        let logs = self.phase_logs.read().await;
        Ok(logs
            .iter()
            .filter(|l| &l.project_id == project)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChatStorage for InMemoryStorage {
    async fn insert_message(&self, message: ChatMessage) -> StorageResult<()> {
        self.messages.write().await.push(message);
        Ok(())
    }

    async fn list_messages(&self, project: &ProjectId) -> StorageResult<Vec<ChatMessage>> {
        let messages = self.messages.read().await;
        Ok(messages
            .iter()
            .filter(|m| &m.project_id == project)
            .cloned()
            .collect())
    }

    async fn mark_messages_read(
        &self,
        project: &ProjectId,
        reader: &UserId,
    ) -> StorageResult<usize> {
        let mut messages = self.messages.write().await;
        let mut changed = 0;
        for message in messages
            .iter_mut()
            .filter(|m| &m.project_id == project && &m.sender_id != reader && !m.is_read)
        {
            message.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl NotificationStorage for InMemoryStorage {
    async fn insert_notifications(&self, notifications: Vec<Notification>) -> StorageResult<()> {
        self.notifications.write().await.extend(notifications);
        Ok(())
    }

    async fn list_notifications(
        &self,
        user: &UserId,
        limit: usize,
    ) -> StorageResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        let mine = notifications
            .iter()
            .filter(|n| &n.user_id == user)
            .cloned()
            .collect();
        let mut sorted = newest_first(mine, |n| n.created_at);
        sorted.truncate(limit);
        Ok(sorted)
    }

    async fn unread_count(&self, user: &UserId) -> StorageResult<usize> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .iter()
            .filter(|n| &n.user_id == user && !n.is_read)
            .count())
    }

    async fn mark_notification_read(
        &self,
        user: &UserId,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let mut notifications = self.notifications.write().await;
        match notifications
            .iter_mut()
            .find(|n| &n.id == id && &n.user_id == user)
        {
            Some(n) => {
                n.mark_read(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, user: &UserId, at: DateTime<Utc>) -> StorageResult<usize> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for n in notifications
            .iter_mut()
            .filter(|n| &n.user_id == user && !n.is_read)
        {
            n.mark_read(at);
            changed += 1;
        }
        Ok(changed)
    }
}

#[async_trait]
impl AnnouncementStorage for InMemoryStorage {
    async fn get_announcement(&self, id: &AnnouncementId) -> StorageResult<Option<Announcement>> {
        let announcements = self.announcements.read().await;
        Ok(announcements.get(id).cloned())
    }

    async fn list_announcements(&self) -> StorageResult<Vec<Announcement>> {
        let announcements = self.announcements.read().await;
        Ok(newest_first(
            announcements.values().cloned().collect(),
            |a| a.created_at,
        ))
    }

    async fn insert_announcement(&self, announcement: Announcement) -> StorageResult<()> {
        let mut announcements = self.announcements.write().await;
        announcements.insert(announcement.id, announcement);
        Ok(())
    }

    async fn update_announcement(&self, announcement: Announcement) -> StorageResult<()> {
        let mut announcements = self.announcements.write().await;
        if !announcements.contains_key(&announcement.id) {
            return Err(StorageError::NotFound(format!(
                "announcement {}",
                announcement.id
            )));
        }
        announcements.insert(announcement.id, announcement);
        Ok(())
    }
}

#[async_trait]
impl CpdStorage for InMemoryStorage {
    async fn get_cpd_log(&self, id: &CpdLogId) -> StorageResult<Option<CpdLog>> {
        let logs = self.cpd_logs.read().await;
        Ok(logs.get(id).cloned())
    }

    async fn list_cpd_logs(&self, assessor: Option<&UserId>) -> StorageResult<Vec<CpdLog>> {
        let logs = self.cpd_logs.read().await;
        let matching = logs
            .values()
            .filter(|l| assessor.map_or(true, |a| &l.assessor_id == a))
            .cloned()
            .collect();
        Ok(newest_first(matching, |l| l.submitted_at))
    }

    async fn insert_cpd_log(&self, log: CpdLog) -> StorageResult<()> {
        let mut logs = self.cpd_logs.write().await;
        logs.insert(log.id, log);
        Ok(())
    }

    async fn update_cpd_log(&self, log: CpdLog) -> StorageResult<()> {
        let mut logs = self.cpd_logs.write().await;
        if !logs.contains_key(&log.id) {
            return Err(StorageError::NotFound(format!("CPD log {}", log.id)));
        }
        logs.insert(log.id, log);
        Ok(())
    }
}

#[async_trait]
impl ReminderStorage for InMemoryStorage {
    async fn record_reminder(
        &self,
        reminder: ScheduledReminder,
        notifications: Vec<Notification>,
    ) -> StorageResult<bool> {
        let mut reminders = self.reminders.write().await;
        if reminders.contains_key(&reminder.key) {
            return Ok(false);
        }
        self.notifications.write().await.extend(notifications);
        reminders.insert(reminder.key, reminder);
        Ok(true)
    }

    async fn list_reminders(&self) -> StorageResult<Vec<ScheduledReminder>> {
        let reminders = self.reminders.read().await;
        Ok(reminders.values().cloned().collect())
    }
}

impl Storage for InMemoryStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use gea_types::{
        FeeSchedule, FeeSplit, NotificationKind, ReminderTarget, ReminderType, Role,
    };

    #[tokio::test]
    async fn test_user_uniqueness() {
        let storage = InMemoryStorage::new();
        storage
            .insert_user(User::new("alice", "alice@x.test", "h", Role::GeaStaff))
            .await
            .unwrap();

        let dup_name = User::new("alice", "other@x.test", "h", Role::GeaStaff);
        assert!(matches!(
            storage.insert_user(dup_name).await,
            Err(StorageError::Conflict(_))
        ));
        let dup_email = User::new("bob", "alice@x.test", "h", Role::GeaStaff);
        assert!(matches!(
            storage.insert_user(dup_email).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(storage.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reference_number_unique() {
        let storage = InMemoryStorage::new();
        let glab = GlabId::generate();
        let project = |r: &str| {
            Project::new(r, glab, ClientId::generate(), FeeSchedule::default(), FeeSplit::default())
        };
        storage.insert_project(project("GL-2025-0001")).await.unwrap();
        assert!(matches!(
            storage.insert_project(project("GL-2025-0001")).await,
            Err(StorageError::Conflict(_))
        ));
        let year = Utc::now().year();
        assert_eq!(storage.count_projects_in_year(&glab, year).await.unwrap(), 1);
    }

    fn phase_one_project() -> Project {
        Project::new(
            "GL-2025-0001",
            GlabId::generate(),
            ClientId::generate(),
            FeeSchedule::default(),
            FeeSplit::default(),
        )
    }

    fn advance_commit(project: &Project, to: u8) -> AdvanceCommit {
        let mut advanced = project.clone();
        let expected = advanced.current_phase;
        advanced.current_phase = Phase::new(to).unwrap();
        advanced.review.reset();
        let actor = UserId::generate();
        AdvanceCommit {
            checklist: gea_workflow::checklist::seed_phase(advanced.id, advanced.current_phase),
            quality: gea_workflow::checklist::seed_quality(advanced.id, advanced.current_phase),
            log: PhaseLog::advanced(
                advanced.id,
                expected,
                advanced.current_phase,
                actor,
                Utc::now(),
            ),
            project: advanced,
            expected,
        }
    }

    #[tokio::test]
    async fn test_stale_write_cannot_regress_phase() {
        let storage = InMemoryStorage::new();
        let project = phase_one_project();
        storage.insert_project(project.clone()).await.unwrap();

        // A reviewer loads the project, then an advance lands first
        let mut stale = project.clone();
        storage
            .commit_advance(advance_commit(&project, 2))
            .await
            .unwrap();

        stale.review.status = ReviewStatus::Approved;
        assert!(matches!(
            storage.update_project(stale, Phase::FIRST).await,
            Err(StorageError::Conflict(_))
        ));

        let stored = storage.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(stored.current_phase, Phase::new(2).unwrap());
        assert_eq!(stored.review.status, ReviewStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_project_never_moves_phase() {
        let storage = InMemoryStorage::new();
        let mut project = phase_one_project();
        storage.insert_project(project.clone()).await.unwrap();

        project.current_phase = Phase::new(3).unwrap();
        assert!(matches!(
            storage.update_project(project.clone(), Phase::FIRST).await,
            Err(StorageError::InvalidData(_))
        ));

        project.current_phase = Phase::FIRST;
        project.assessors.push(UserId::generate());
        storage.update_project(project.clone(), Phase::FIRST).await.unwrap();
        let stored = storage.get_project(&project.id).await.unwrap().unwrap();
        assert_eq!(stored.assessors.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_advance_is_all_or_nothing() {
        let storage = InMemoryStorage::new();
        let project = phase_one_project();
        storage.insert_project(project.clone()).await.unwrap();

        let commit = advance_commit(&project, 2);
        let seeded = commit.checklist.len();
        assert!(seeded > 0);
        storage.commit_advance(commit).await.unwrap();

        assert_eq!(storage.list_checklist(&project.id).await.unwrap().len(), seeded);
        assert_eq!(storage.list_phase_logs(&project.id).await.unwrap().len(), 1);

        // A second advance from the same loaded phase writes nothing
        assert!(matches!(
            storage.commit_advance(advance_commit(&project, 2)).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(storage.list_checklist(&project.id).await.unwrap().len(), seeded);
        assert_eq!(storage.list_phase_logs(&project.id).await.unwrap().len(), 1);

        // Skipping a phase is refused outright
        let stored = storage.get_project(&project.id).await.unwrap().unwrap();
        assert!(matches!(
            storage.commit_advance(advance_commit(&stored, 4)).await,
            Err(StorageError::InvalidData(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_write_keeps_active_flag_and_password() {
        let storage = InMemoryStorage::new();
        let user = User::new("carol", "carol@x.test", "old$hash", Role::GlabAssessor);
        storage.insert_user(user.clone()).await.unwrap();

        let deactivated = storage.set_user_active(&user.id, false).await.unwrap();
        assert!(!deactivated.is_active);
        storage
            .set_password_hash(&user.id, "new$hash".to_string())
            .await
            .unwrap();

        // Snapshot taken before both changes
        let mut stale = user.clone();
        stale.phone = Some("+254 700 000".to_string());
        storage.update_user(stale).await.unwrap();

        let stored = storage.get_user(&user.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(stored.password_hash, "new$hash");
        assert_eq!(stored.phone.as_deref(), Some("+254 700 000"));
    }

    #[tokio::test]
    async fn test_reminder_recorded_with_notifications() {
        let storage = InMemoryStorage::new();
        let key = ReminderKey {
            reminder_type: ReminderType::LicensePayment,
            target: ReminderTarget::Glab(GlabId::generate()),
            days_before: 30,
        };
        let due = Utc::now().date_naive();
        let admin = UserId::generate();
        let notice = || {
            vec![Notification::new(
                admin,
                NotificationKind::LicenseReminder,
                "License payment due",
                "Due in 30 days",
                None,
            )]
        };

        let first = ScheduledReminder::new(key, due, Utc::now());
        let second = ScheduledReminder::new(key, due, Utc::now());
        assert!(storage.record_reminder(first, notice()).await.unwrap());
        assert!(!storage.record_reminder(second, notice()).await.unwrap());
        assert_eq!(storage.list_reminders().await.unwrap().len(), 1);
        assert_eq!(storage.unread_count(&admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_template_supersedes_previous() {
        let storage = InMemoryStorage::new();
        let template = |name: &str| PhaseTemplate {
            id: PhaseTemplateId::generate(),
            phase: Phase::FIRST,
            slot_key: "enrollment_form".into(),
            template_name: name.into(),
            original_filename: "form.docx".into(),
            stored_filename: "x_form.docx".into(),
            uploaded_by: UserId::generate(),
            uploaded_at: Utc::now(),
            is_active: true,
        };
        storage.insert_template(template("v1")).await.unwrap();
        storage.insert_template(template("v2")).await.unwrap();
        let active = storage.list_templates().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].template_name, "v2");
    }

    #[tokio::test]
    async fn test_mark_messages_read_skips_own() {
        let storage = InMemoryStorage::new();
        let project = ProjectId::generate();
        let alice = UserId::generate();
        let bob = UserId::generate();
        storage.insert_message(ChatMessage::new(project, alice, "hi")).await.unwrap();
        storage.insert_message(ChatMessage::new(project, bob, "hello")).await.unwrap();

        assert_eq!(storage.mark_messages_read(&project, &alice).await.unwrap(), 1);
        let messages = storage.list_messages(&project).await.unwrap();
        assert!(!messages[0].is_read);
        assert!(messages[1].is_read);
    }
}
