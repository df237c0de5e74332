//! Configuration for gea-daemon

use gea_workflow::fees::DEFAULT_GEA_FEE_BPS;
use gea_workflow::reminders::DEFAULT_REMINDER_OFFSETS;
use gea_workflow::upload::DEFAULT_MAX_UPLOAD_BYTES;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upload and template directories
    #[serde(default)]
    pub files: FilesConfig,

    /// Fee settings
    #[serde(default)]
    pub finance: FinanceConfig,

    /// Reminder scheduler
    #[serde(default)]
    pub reminders: ReminderConfig,

    /// Initial administrator account
    #[serde(default)]
    pub bootstrap: BootstrapConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Maximum size of a single uploaded file in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// Session lifetime in hours
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl_hours: default_session_ttl(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Where uploaded files live on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    #[serde(default = "default_template_dir")]
    pub template_dir: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            template_dir: default_template_dir(),
        }
    }
}

/// Fee settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinanceConfig {
    /// GEA share of project fees in basis points
    #[serde(default = "default_gea_fee_bps")]
    pub gea_fee_bps: u32,
}

impl Default for FinanceConfig {
    fn default() -> Self {
        Self {
            gea_fee_bps: DEFAULT_GEA_FEE_BPS,
        }
    }
}

/// Reminder scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderConfig {
    /// Run the background scan
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// How often the scheduler wakes up; the scan itself runs once per day
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Days before a deadline at which reminders go out
    #[serde(default = "default_offsets")]
    pub offsets: Vec<u32>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: default_scan_interval(),
            offsets: default_offsets(),
        }
    }
}

/// Administrator created when the user table is empty
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    #[serde(default = "default_admin_password")]
    pub admin_password: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: default_admin_password(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_session_ttl() -> i64 {
    12
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("data/templates")
}

fn default_gea_fee_bps() -> u32 {
    DEFAULT_GEA_FEE_BPS
}

fn default_scan_interval() -> u64 {
    3600
}

fn default_offsets() -> Vec<u32> {
    DEFAULT_REMINDER_OFFSETS.to_vec()
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@gea.local".to_string()
}

fn default_admin_password() -> String {
    "admin123".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `GEA_*`
    /// environment variables (`GEA_SERVER__LISTEN_ADDR`, ...)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with GEA_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("GEA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("reminders.offsets"),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(matches!(config.storage, StorageConfig::Memory));
        assert_eq!(config.finance.gea_fee_bps, 1_500);
        assert_eq!(config.server.max_upload_bytes, 50 * 1024 * 1024);
    }

    #[test]
    fn test_reminder_defaults() {
        let config = ReminderConfig::default();
        assert!(config.enabled);
        assert_eq!(config.offsets, vec![60, 30, 15, 5]);
    }

    #[test]
    fn test_load_without_file_yields_defaults() {
        let config = DaemonConfig::load(None).unwrap();
        assert_eq!(config.bootstrap.admin_username, "admin");
        assert_eq!(config.files.upload_dir, PathBuf::from("data/uploads"));
    }
}
