//! GEA Portal daemon library
//!
//! This module provides the core components of the portal daemon:
//! - REST API handlers
//! - Storage backends
//! - Local file store for uploads and templates
//! - Reminder scheduler
//! - Server lifecycle management

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod files;
pub mod scheduler;
pub mod server;
pub mod storage;

pub use config::DaemonConfig;
pub use error::{ApiError, DaemonError, StorageError};
pub use scheduler::ReminderScheduler;
pub use server::Server;
pub use storage::{InMemoryStorage, PostgresStorage, Storage};
