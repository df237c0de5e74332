//! API request handlers

mod announcements;
mod assignments;
mod chat;
mod checklist;
mod clients;
mod cpd;
mod dashboard;
mod documents;
mod glabs;
mod health;
mod notifications;
mod projects;
mod reminders;
mod session;
mod templates;
mod users;

pub use announcements::*;
pub use assignments::*;
pub use chat::*;
pub use checklist::*;
pub use clients::*;
pub use cpd::*;
pub use dashboard::*;
pub use documents::*;
pub use glabs::*;
pub use health::*;
pub use notifications::*;
pub use projects::*;
pub use reminders::*;
pub use session::*;
pub use templates::*;
pub use users::*;
