//! Game-facing domain types shared by the client, the sessions, and the
//! stand-in service.
//!
//! Field names on the wire follow the remote service (camelCase). Inside the
//! harness these are plain owned values; nothing here performs I/O.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ── Identity ──────────────────────────────────────────────────────────────────

/// Credential pair issued by registration. Opaque to the harness.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bearer token issued by authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

// ── Matches ───────────────────────────────────────────────────────────────────

/// Identifier of a match on the remote service.
///
/// The service may send it as a JSON number or a string; both deserialize
/// to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MatchId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => MatchId(s),
            Raw::Number(n) => MatchId(n.to_string()),
        })
    }
}

/// Legal destination squares for one origin square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalMoves {
    pub start_square: String,
    #[serde(default)]
    pub end_squares: Vec<String>,
}

impl LegalMoves {
    pub fn new(start: &str, ends: &[&str]) -> Self {
        Self {
            start_square: start.to_string(),
            end_squares: ends.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A chosen move: origin and destination square.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub start: String,
    pub end: String,
}

impl Move {
    /// Coordinate notation as the service expects it, e.g. `e2e4`.
    pub fn notation(&self) -> String {
        format!("{}{}", self.start, self.end)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Snapshot of a match as seen by one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub match_id: MatchId,
    pub move_number: u32,
    /// Empty when the player has nothing to play (opponent's turn, game over).
    pub legal_moves: Vec<LegalMoves>,
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Collaborator operations whose response time is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Register,
    Authenticate,
    FetchMatch,
    SubmitMove,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Register => "Register",
            Operation::Authenticate => "Authenticate",
            Operation::FetchMatch => "Fetch Match",
            Operation::SubmitMove => "Submit Move",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
