//! Background jobs

mod reminders;

pub use reminders::{ReminderScheduler, ScanReport};
