//! Reminder scheduler
//!
//! Wakes up on an interval and scans for license payment and assessor
//! recertification deadlines. A scan runs at most once per calendar day
//! unless explicitly triggered. Storage records each reminder key with an
//! insert-if-absent, so overlapping scans never notify twice.

use crate::config::ReminderConfig;
use crate::storage::{
    GlabStorage, NotificationStorage, ReminderStorage, Storage, StorageResult, UserStorage,
};
use chrono::{NaiveDate, Utc};
use gea_types::{ReminderTarget, Role, ScheduledReminder, UserId};
use gea_workflow::reminders::{license_reminders, recertification_reminders};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};

/// Outcome of one scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub date: Option<NaiveDate>,
    /// Reminders whose offset matched today
    pub due: usize,
    /// Reminders recorded by this scan
    pub sent: usize,
    /// Reminders another scan had already recorded
    pub already_sent: usize,
    pub notifications: usize,
}

/// Scheduler state
pub struct ReminderScheduler {
    config: ReminderConfig,
    storage: Arc<dyn Storage>,
    trigger_tx: mpsc::Sender<()>,
    running: Arc<RwLock<bool>>,
    last_scan: RwLock<Option<NaiveDate>>,
}

impl ReminderScheduler {
    /// Create a new scheduler
    pub fn new(
        config: ReminderConfig,
        storage: Arc<dyn Storage>,
    ) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (trigger_tx, trigger_rx) = mpsc::channel(10);

        let scheduler = Arc::new(Self {
            config,
            storage,
            trigger_tx,
            running: Arc::new(RwLock::new(false)),
            last_scan: RwLock::new(None),
        });

        (scheduler, trigger_rx)
    }

    /// Request a scan now, even if today's scan already ran
    pub async fn trigger_scan(&self) {
        let _ = self.trigger_tx.send(()).await;
    }

    /// Date of the last completed scan
    pub async fn last_scan(&self) -> Option<NaiveDate> {
        *self.last_scan.read().await
    }

    /// Start the background loop
    pub async fn start(self: Arc<Self>, mut trigger_rx: mpsc::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Reminder scheduler disabled");
            return;
        }

        {
            let mut running = self.running.write().await;
            *running = true;
        }

        tracing::info!(
            interval_secs = self.config.scan_interval_secs,
            offsets = ?self.config.offsets,
            "Reminder scheduler started"
        );

        let mut ticker = interval(Duration::from_secs(self.config.scan_interval_secs.max(1)));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let today = Utc::now().date_naive();
                    if self.last_scan().await == Some(today) {
                        continue;
                    }
                    if let Err(e) = self.scan(today).await {
                        tracing::error!(error = %e, "Reminder scan failed");
                    }
                }
                Some(_) = trigger_rx.recv() => {
                    if let Err(e) = self.scan(Utc::now().date_naive()).await {
                        tracing::error!(error = %e, "Triggered reminder scan failed");
                    }
                }
                else => break,
            }

            let running = self.running.read().await;
            if !*running {
                break;
            }
        }

        tracing::info!("Reminder scheduler stopped");
    }

    /// Stop the scheduler
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    /// Scan for reminders due on `today` and notify recipients
    pub async fn scan(&self, today: NaiveDate) -> StorageResult<ScanReport> {
        let glabs = self.storage.list_glabs().await?;
        let users = self.storage.list_users().await?;

        let mut due = license_reminders(&glabs, today, &self.config.offsets);
        due.extend(recertification_reminders(&users, today, &self.config.offsets));

        let gea_users: Vec<UserId> = users
            .iter()
            .filter(|u| u.is_active && u.role.is_gea())
            .map(|u| u.id)
            .collect();

        let mut report = ScanReport {
            date: Some(today),
            due: due.len(),
            ..ScanReport::default()
        };

        for reminder in due {
            let glab_admins: Vec<UserId> = match reminder.key.target {
                ReminderTarget::Glab(glab) => users
                    .iter()
                    .filter(|u| u.is_active && u.role == Role::GlabAdmin && u.glab_id == Some(glab))
                    .map(|u| u.id)
                    .collect(),
                ReminderTarget::Assessor(_) => Vec::new(),
            };

            let notifications = reminder.notifications(&glab_admins, &gea_users);
            let count = notifications.len();
            let row = ScheduledReminder::new(reminder.key, reminder.due_date, Utc::now());
            if !self.storage.record_reminder(row, notifications).await? {
                report.already_sent += 1;
                continue;
            }
            report.sent += 1;
            report.notifications += count;

            tracing::info!(
                reminder = %reminder.key,
                due_date = %reminder.due_date,
                "Reminder sent"
            );
        }

        *self.last_scan.write().await = Some(today);

        tracing::info!(
            date = %today,
            due = report.due,
            sent = report.sent,
            "Reminder scan complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use chrono::Duration as Days;
    use gea_types::{Glab, NotificationKind, User};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded() -> (Arc<InMemoryStorage>, NaiveDate, UserId, UserId, UserId) {
        let storage = Arc::new(InMemoryStorage::new());
        let today = day(2025, 9, 1);

        let mut glab = Glab::new("Acme Labs", "GL-KE-01", "Kenya", "ops@acme.test");
        glab.next_payment_due = Some(today + Days::days(30));
        storage.insert_glab(glab.clone()).await.unwrap();

        let gea = User::new("gea", "gea@gea.test", "x", Role::GeaStaff);
        let admin = User::new("ga", "ga@acme.test", "x", Role::GlabAdmin).with_glab(glab.id);
        let mut assessor =
            User::new("as", "as@acme.test", "x", Role::GlabAssessor).with_glab(glab.id);
        assessor.recertification_due = Some(today + Days::days(5));

        let ids = (gea.id, admin.id, assessor.id);
        for user in [gea, admin, assessor] {
            storage.insert_user(user).await.unwrap();
        }
        (storage, today, ids.0, ids.1, ids.2)
    }

    #[tokio::test]
    async fn test_scan_notifies_each_audience() {
        let (storage, today, gea, admin, assessor) = seeded().await;
        let (scheduler, _rx) = ReminderScheduler::new(ReminderConfig::default(), storage.clone());

        let report = scheduler.scan(today).await.unwrap();
        assert_eq!(report.due, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.notifications, 3);

        let to_admin = storage.list_notifications(&admin, 50).await.unwrap();
        assert_eq!(to_admin.len(), 1);
        assert_eq!(to_admin[0].kind, NotificationKind::LicenseReminder);
        assert_eq!(storage.list_notifications(&gea, 50).await.unwrap().len(), 1);

        let to_assessor = storage.list_notifications(&assessor, 50).await.unwrap();
        assert_eq!(to_assessor[0].kind, NotificationKind::RecertificationReminder);
        assert_eq!(scheduler.last_scan().await, Some(today));
    }

    #[tokio::test]
    async fn test_repeated_scan_sends_nothing_new() {
        let (storage, today, _, admin, _) = seeded().await;
        let (scheduler, _rx) = ReminderScheduler::new(ReminderConfig::default(), storage.clone());

        scheduler.scan(today).await.unwrap();
        let again = scheduler.scan(today).await.unwrap();
        assert_eq!(again.sent, 0);
        assert_eq!(again.already_sent, 2);
        assert_eq!(storage.list_reminders().await.unwrap().len(), 2);
        assert_eq!(storage.unread_count(&admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_scans_record_each_key_once() {
        let (storage, today, gea, admin, assessor) = seeded().await;
        let (a, _rx_a) = ReminderScheduler::new(ReminderConfig::default(), storage.clone());
        let (b, _rx_b) = ReminderScheduler::new(ReminderConfig::default(), storage.clone());

        let (ra, rb) = tokio::join!(a.scan(today), b.scan(today));
        let (ra, rb) = (ra.unwrap(), rb.unwrap());
        assert_eq!(ra.sent + rb.sent, 2);
        assert_eq!(ra.notifications + rb.notifications, 3);
        assert_eq!(storage.list_reminders().await.unwrap().len(), 2);
        for user in [gea, admin, assessor] {
            assert_eq!(storage.unread_count(&user).await.unwrap(), 1);
        }
    }

    #[tokio::test]
    async fn test_off_offset_day_sends_nothing() {
        let (storage, today, _, _, _) = seeded().await;
        let (scheduler, _rx) = ReminderScheduler::new(ReminderConfig::default(), storage.clone());
        let report = scheduler.scan(today + Days::days(1)).await.unwrap();
        assert_eq!(report.due, 0);
    }
}
