//! Remote game service seam.
//!
//! Sessions only talk to the service through [`GameClient`]. Implementations
//! report raw outcomes as [`ClientError`]; the session steps translate them
//! into the harness taxonomy and never let them escape.

use async_trait::async_trait;

use swarm_core::game::{AuthToken, Credentials, MatchId, MatchState, Move, Operation};
use swarm_core::LoadError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Unreachable, connection reset, client-side timeout.
    #[error("transport: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("status {status}: {detail}")]
    Status { status: u16, detail: String },

    /// Success status, unreadable body.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ClientError {
    pub fn into_load_error(self, op: Operation) -> LoadError {
        match self {
            ClientError::Transport(detail) => LoadError::Transport { op, detail },
            ClientError::Malformed(detail) => LoadError::Transport {
                op,
                detail: format!("malformed response: {detail}"),
            },
            ClientError::Status { status, detail } => LoadError::Rejected { op, status, detail },
        }
    }
}

/// The four operations a session needs from the game service.
///
/// One client is shared by every session of a run, so implementations must
/// tolerate concurrent calls.
#[async_trait]
pub trait GameClient: Send + Sync {
    /// Create a new account. Not idempotent: each call is a new account.
    async fn register(&self, label: &str, signup_secret: &str) -> Result<Credentials, ClientError>;

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, ClientError>;

    /// Fetch the player's current match, creating or joining one if needed.
    async fn acquire_or_fetch_match(&self, token: &AuthToken) -> Result<MatchState, ClientError>;

    async fn submit_move(
        &self,
        token: &AuthToken,
        match_id: &MatchId,
        move_number: u32,
        mv: &Move,
    ) -> Result<(), ClientError>;
}
