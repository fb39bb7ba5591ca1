//! swarm-core — shared types, telemetry, and configuration for the load harness.
//! All other swarm crates depend on this one.

pub mod config;
pub mod error;
pub mod game;
pub mod moves;
pub mod telemetry;

pub use error::LoadError;
pub use game::{AuthToken, Credentials, LegalMoves, MatchId, MatchState, Move, Operation};
pub use telemetry::{
    ResponseTimeSample, SessionSummary, Severity, TelemetryEvent, TelemetryRecorder,
};
