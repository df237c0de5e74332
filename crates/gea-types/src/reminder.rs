//! Deadline reminders and their dedup record

use crate::{GlabId, ReminderId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    LicensePayment,
    Recertification,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::LicensePayment => "license_payment",
            ReminderType::Recertification => "recertification",
        }
    }
}

/// Entity a reminder is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ReminderTarget {
    Glab(GlabId),
    Assessor(UserId),
}

impl ReminderTarget {
    pub fn type_str(&self) -> &'static str {
        match self {
            ReminderTarget::Glab(_) => "glab",
            ReminderTarget::Assessor(_) => "assessor",
        }
    }

    pub fn id_uuid(&self) -> uuid::Uuid {
        match self {
            ReminderTarget::Glab(id) => *id.as_uuid(),
            ReminderTarget::Assessor(id) => *id.as_uuid(),
        }
    }
}

/// Uniqueness key of a reminder: at most one row per tuple, ever
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderKey {
    pub reminder_type: ReminderType,
    pub target: ReminderTarget,
    pub days_before: u32,
}

impl fmt::Display for ReminderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}:{}/{}d",
            self.reminder_type.as_str(),
            self.target.type_str(),
            self.target.id_uuid(),
            self.days_before
        )
    }
}

/// Record that a reminder went out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledReminder {
    pub id: ReminderId,
    pub key: ReminderKey,
    pub due_date: NaiveDate,
    pub sent_at: DateTime<Utc>,
}

impl ScheduledReminder {
    pub fn new(key: ReminderKey, due_date: NaiveDate, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: ReminderId::generate(),
            key,
            due_date,
            sent_at,
        }
    }
}
