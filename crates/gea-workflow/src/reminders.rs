//! Deadline reminder planning
//!
//! A reminder is due when `deadline - offset == today` for one of the
//! configured offsets. Planning is pure; the daemon records each
//! [`ReminderKey`] with an insert-if-absent and only notifies when the
//! insert wins.

use chrono::NaiveDate;
use gea_types::{
    Glab, LinkRef, Notification, NotificationKind, ReminderKey, ReminderTarget, ReminderType,
    Role, User, UserId,
};

/// Days before a deadline at which reminders go out
pub const DEFAULT_REMINDER_OFFSETS: [u32; 4] = [60, 30, 15, 5];

/// A reminder that should be sent today
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    pub key: ReminderKey,
    pub due_date: NaiveDate,

    /// GLAB name or assessor display name
    pub subject: String,
}

/// The offset that makes `today` a reminder day for `due`, if any
pub fn matching_offset(due: NaiveDate, today: NaiveDate, offsets: &[u32]) -> Option<u32> {
    let days_left = (due - today).num_days();
    offsets
        .iter()
        .copied()
        .find(|offset| i64::from(*offset) == days_left)
}

/// License payment reminders for active GLABs
pub fn license_reminders(glabs: &[Glab], today: NaiveDate, offsets: &[u32]) -> Vec<DueReminder> {
    glabs
        .iter()
        .filter(|g| g.is_active())
        .filter_map(|g| {
            let due = g.next_payment_due?;
            let days_before = matching_offset(due, today, offsets)?;
            Some(DueReminder {
                key: ReminderKey {
                    reminder_type: ReminderType::LicensePayment,
                    target: ReminderTarget::Glab(g.id),
                    days_before,
                },
                due_date: due,
                subject: g.name.clone(),
            })
        })
        .collect()
}

/// Recertification reminders for active assessors
pub fn recertification_reminders(
    users: &[User],
    today: NaiveDate,
    offsets: &[u32],
) -> Vec<DueReminder> {
    users
        .iter()
        .filter(|u| u.is_active && u.role == Role::GlabAssessor)
        .filter_map(|u| {
            let due = u.recertification_due?;
            let days_before = matching_offset(due, today, offsets)?;
            Some(DueReminder {
                key: ReminderKey {
                    reminder_type: ReminderType::Recertification,
                    target: ReminderTarget::Assessor(u.id),
                    days_before,
                },
                due_date: due,
                subject: u.display_name().to_string(),
            })
        })
        .collect()
}

impl DueReminder {
    /// Notifications for this reminder
    ///
    /// License reminders go to the GLAB's administrators and to GEA users;
    /// recertification reminders go to the assessor alone.
    pub fn notifications(&self, glab_admins: &[UserId], gea_users: &[UserId]) -> Vec<Notification> {
        let days = self.key.days_before;
        let due = self.due_date.format("%B %d, %Y");

        match self.key.target {
            ReminderTarget::Glab(glab_id) => {
                let link = Some(LinkRef::Glab(glab_id));
                let to_glab = glab_admins.iter().map(|user| {
                    Notification::new(
                        *user,
                        NotificationKind::LicenseReminder,
                        format!("License Payment Due in {} Days", days),
                        format!(
                            "Your GLAB license payment is due on {}. Please ensure timely payment to maintain your license.",
                            due
                        ),
                        link,
                    )
                });
                let to_gea = gea_users.iter().map(|user| {
                    Notification::new(
                        *user,
                        NotificationKind::LicenseReminder,
                        format!("GLAB License Payment Due: {}", self.subject),
                        format!(
                            "{} license payment is due in {} days ({}).",
                            self.subject, days, due
                        ),
                        link,
                    )
                });
                to_glab.chain(to_gea).collect()
            }
            ReminderTarget::Assessor(user) => vec![Notification::new(
                user,
                NotificationKind::RecertificationReminder,
                format!("Recertification Due in {} Days", days),
                format!(
                    "Your assessor certification expires on {}. Please ensure you have completed the required CPD hours and apply for recertification.",
                    due
                ),
                Some(LinkRef::Cpd(None)),
            )],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gea_types::GlabStatus;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_matching_offset() {
        let today = day(2025, 1, 1);
        let offsets = &DEFAULT_REMINDER_OFFSETS;
        assert_eq!(matching_offset(today + Duration::days(30), today, offsets), Some(30));
        assert_eq!(matching_offset(today + Duration::days(31), today, offsets), None);
        assert_eq!(matching_offset(today - Duration::days(5), today, offsets), None);
    }

    #[test]
    fn test_license_reminders_skip_inactive() {
        let today = day(2025, 6, 1);
        let mut due = Glab::new("Due", "GL-1", "KE", "a@x.test");
        due.next_payment_due = Some(today + Duration::days(15));
        let mut suspended = due.clone();
        suspended.id = gea_types::GlabId::generate();
        suspended.status = GlabStatus::Suspended;
        let mut later = due.clone();
        later.id = gea_types::GlabId::generate();
        later.next_payment_due = Some(today + Duration::days(16));

        let glabs = [due.clone(), suspended, later];
        let planned = license_reminders(&glabs, today, &DEFAULT_REMINDER_OFFSETS);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].key.target, ReminderTarget::Glab(due.id));
        assert_eq!(planned[0].key.days_before, 15);
    }

    #[test]
    fn test_recertification_only_for_assessors() {
        let today = day(2025, 6, 1);
        let mut assessor = User::new("a1", "a1@x.test", "", Role::GlabAssessor);
        assessor.recertification_due = Some(today + Duration::days(60));
        let mut admin = User::new("g1", "g1@x.test", "", Role::GlabAdmin);
        admin.recertification_due = Some(today + Duration::days(60));

        let users = [assessor.clone(), admin];
        let planned = recertification_reminders(&users, today, &DEFAULT_REMINDER_OFFSETS);
        assert_eq!(planned.len(), 1);

        let notes = planned[0].notifications(&[UserId::generate()], &[UserId::generate()]);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].user_id, assessor.id);
        assert_eq!(notes[0].kind, NotificationKind::RecertificationReminder);
    }

    #[test]
    fn test_license_notifications_fan_out() {
        let today = day(2025, 6, 1);
        let mut glab = Glab::new("Acme Labs", "GL-1", "KE", "a@x.test");
        glab.next_payment_due = Some(today + Duration::days(5));
        let planned = license_reminders(&[glab], today, &DEFAULT_REMINDER_OFFSETS);
        let admins = [UserId::generate(), UserId::generate()];
        let gea = [UserId::generate()];
        let notes = planned[0].notifications(&admins, &gea);
        assert_eq!(notes.len(), 3);
        assert!(notes[2].title.contains("Acme Labs"));
        assert_eq!(notes[0].title, "License Payment Due in 5 Days");
    }
}
