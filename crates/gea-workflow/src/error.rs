//! Error types for the workflow layer

use crate::engine::Blocker;
use gea_types::Phase;

/// Errors raised by domain operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Advancement refused; every unmet gate is listed
    #[error("Cannot advance from {phase}: {}", format_blockers(.blockers))]
    Blocked { phase: Phase, blockers: Vec<Blocker> },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid fee: {0}")]
    InvalidFee(String),

    #[error("Fees are locked once a payment has been recorded")]
    FeesLocked,

    #[error("File type not allowed: {0}")]
    FileTypeNotAllowed(String),

    #[error("File too large: {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Unknown document slot '{slot}' for phase {phase}")]
    UnknownSlot { phase: u8, slot: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid password hash format")]
    MalformedHash,
}

fn format_blockers(blockers: &[Blocker]) -> String {
    blockers
        .iter()
        .map(|b| b.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
