//! Project chat, announcements and per-user notifications

use crate::{
    AnnouncementId, ChatMessageId, CpdLogId, GlabId, NotificationId, ProjectId, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message on a project thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub project_id: ProjectId,
    pub sender_id: UserId,
    pub message: String,
    pub sent_at: DateTime<Utc>,

    /// Set once another user has listed the thread
    pub is_read: bool,
}

impl ChatMessage {
    pub fn new(project_id: ProjectId, sender_id: UserId, message: impl Into<String>) -> Self {
        Self {
            id: ChatMessageId::generate(),
            project_id,
            sender_id,
            message: message.into(),
            sent_at: Utc::now(),
            is_read: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// A GEA broadcast to one GLAB or to all of them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub message: String,
    pub priority: AnnouncementPriority,

    /// `None` targets every GLAB
    pub target_glab_id: Option<GlabId>,

    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,

    /// Cleared on delete; rows are never removed
    pub is_active: bool,
}

impl Announcement {
    /// Whether a viewer from `glab` (or GEA, when `None`) should see this now
    pub fn visible_to(&self, glab: Option<GlabId>, now: DateTime<Utc>) -> bool {
        if !self.is_active || self.expires_at.is_some_and(|at| at <= now) {
            return false;
        }
        match (self.target_glab_id, glab) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(target), Some(viewer)) => target == viewer,
        }
    }
}

/// Category of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PhaseAdvanced,
    ProjectReviewed,
    DocumentReviewed,
    ChatMessage,
    Announcement,
    AssessorAssignment,
    ExpertAssigned,
    CommitteeAssigned,
    CpdReview,
    LicenseReminder,
    RecertificationReminder,
}

/// What a notification points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum LinkRef {
    Project(ProjectId),
    Announcement(AnnouncementId),
    Glab(GlabId),
    Cpd(Option<CpdLogId>),
}

/// A message delivered to one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<LinkRef>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        link: Option<LinkRef>,
    ) -> Self {
        Self {
            id: NotificationId::generate(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            link,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn announcement(target: Option<GlabId>) -> Announcement {
        Announcement {
            id: AnnouncementId::generate(),
            title: "Maintenance".into(),
            message: "Portal offline Sunday".into(),
            priority: AnnouncementPriority::High,
            target_glab_id: target,
            created_by: UserId::generate(),
            created_at: Utc::now(),
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn test_targeted_announcement_visibility() {
        let mine = GlabId::generate();
        let other = GlabId::generate();
        let a = announcement(Some(mine));
        let now = Utc::now();
        assert!(a.visible_to(Some(mine), now));
        assert!(!a.visible_to(Some(other), now));
        assert!(a.visible_to(None, now));
        assert!(announcement(None).visible_to(Some(other), now));
    }

    #[test]
    fn test_expired_or_deleted_hidden() {
        let now = Utc::now();
        let mut a = announcement(None);
        a.expires_at = Some(now - Duration::hours(1));
        assert!(!a.visible_to(None, now));

        let mut b = announcement(None);
        b.is_active = false;
        assert!(!b.visible_to(None, now));
    }

    #[test]
    fn test_link_json() {
        let id = ProjectId::generate();
        let json = serde_json::to_value(LinkRef::Project(id)).unwrap();
        assert_eq!(json["type"], "project");
    }
}
