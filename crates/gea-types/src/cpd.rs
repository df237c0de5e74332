//! Continuing professional development logs kept by assessors

use crate::{CpdLogId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpdStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// One CPD activity submitted for GEA review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpdLog {
    pub id: CpdLogId,
    pub assessor_id: UserId,

    /// training, workshop, seminar, self-study...
    pub activity_type: String,
    pub activity_title: String,
    pub activity_date: NaiveDate,
    pub hours: f64,
    pub description: Option<String>,

    pub evidence_filename: Option<String>,
    pub evidence_stored_filename: Option<String>,

    pub status: CpdStatus,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl CpdLog {
    pub fn is_approved(&self) -> bool {
        self.status == CpdStatus::Approved
    }

    /// Hours counted towards recertification: approved logs only
    pub fn approved_hours<'a>(logs: impl IntoIterator<Item = &'a CpdLog>) -> f64 {
        logs.into_iter()
            .filter(|l| l.is_approved())
            .map(|l| l.hours)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(hours: f64, status: CpdStatus) -> CpdLog {
        CpdLog {
            id: CpdLogId::generate(),
            assessor_id: UserId::generate(),
            activity_type: "workshop".into(),
            activity_title: "Root cause analysis".into(),
            activity_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            hours,
            description: None,
            evidence_filename: None,
            evidence_stored_filename: None,
            status,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn test_only_approved_hours_count() {
        let logs = [
            log(4.0, CpdStatus::Approved),
            log(2.5, CpdStatus::Pending),
            log(3.0, CpdStatus::Rejected),
            log(1.5, CpdStatus::Approved),
        ];
        assert_eq!(CpdLog::approved_hours(&logs), 5.5);
    }
}
