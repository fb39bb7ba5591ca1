//! swarm-services — session lifecycle, phase runner, and orchestrator.

pub mod client;
pub mod http_client;
pub mod lifecycle;
pub mod orchestrator;
pub mod phase;
pub mod session;
pub mod testing;

pub use client::{ClientError, GameClient};
pub use http_client::HttpGameClient;
pub use lifecycle::{AuthenticateStep, MatchStep, PhaseStep, PlayStep, RegisterStep, StepContext};
pub use orchestrator::{run, Orchestrator, PhaseTally, RunOutcome, RunReport, RunSettings};
pub use phase::{execute, run_phase, Phase, PhaseOutcome};
pub use session::{Session, SessionState};
