//! Error taxonomy for the load harness.
//!
//! Collaborator faults are mapped into [`LoadError`] at the session-step
//! boundary. Only `ExhaustedSessions` concerns the run as a whole.

use crate::game::Operation;
use crate::moves::SelectError;
use crate::telemetry::Severity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The service was unreachable, the call timed out, or the reply was unreadable.
    #[error("{op} transport failure: {detail}")]
    Transport { op: Operation, detail: String },

    /// The service answered with a non-success status.
    #[error("{op} rejected with status {status}: {detail}")]
    Rejected {
        op: Operation,
        status: u16,
        detail: String,
    },

    /// Internal logic fault, e.g. move selection without a playable move.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("only {survivors} sessions authenticated, at least {required} required")]
    ExhaustedSessions { survivors: usize, required: usize },

    #[error("illegal session transition {from} -> {to}")]
    IllegalTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl LoadError {
    /// Telemetry severity used when this error removes a session from a phase.
    pub fn severity(&self) -> Severity {
        match self {
            LoadError::Rejected { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Short machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::Transport { .. } => "transport",
            LoadError::Rejected { .. } => "rejected",
            LoadError::InvalidInput(_) => "invalid_input",
            LoadError::ExhaustedSessions { .. } => "exhausted_sessions",
            LoadError::IllegalTransition { .. } => "illegal_transition",
        }
    }
}

impl From<SelectError> for LoadError {
    fn from(e: SelectError) -> Self {
        LoadError::InvalidInput(e.to_string())
    }
}
