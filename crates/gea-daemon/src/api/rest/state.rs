//! Application state for API handlers

use crate::files::FileStore;
use crate::scheduler::ReminderScheduler;
use crate::storage::Storage;
use gea_workflow::FeeCalculator;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage backend
    pub storage: Arc<dyn Storage>,

    /// Uploaded documents and templates
    pub files: Arc<FileStore>,

    /// GEA / GLAB fee split
    pub fees: FeeCalculator,

    /// Reminder scheduler handle
    pub scheduler: Arc<ReminderScheduler>,

    /// Per-file upload limit in bytes
    pub max_upload_bytes: u64,

    /// Lifetime of a login session
    pub session_ttl: chrono::Duration,

    /// Allow cross-origin requests
    pub enable_cors: bool,

    /// Daemon version
    pub version: String,

    /// Daemon start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        storage: Arc<dyn Storage>,
        files: Arc<FileStore>,
        fees: FeeCalculator,
        scheduler: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            storage,
            files,
            fees,
            scheduler,
            max_upload_bytes: gea_workflow::upload::DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: chrono::Duration::hours(12),
            enable_cors: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: u64) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_session_ttl_hours(mut self, hours: i64) -> Self {
        self.session_ttl = chrono::Duration::hours(hours);
        self
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.enable_cors = enabled;
        self
    }

    /// Get uptime as a human-readable string
    pub fn uptime(&self) -> String {
        let duration = chrono::Utc::now() - self.started_at;
        let secs = duration.num_seconds();

        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}
