//! Phase steps — what one session does in each phase.
//!
//! Each step drives exactly one session through one phase. Collaborator
//! calls are timed, bounded by the per-operation timeout, and translated
//! into [`LoadError`] here; nothing the client returns leaves this module
//! unmapped.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use swarm_core::config::PacingConfig;
use swarm_core::game::{AuthToken, Operation};
use swarm_core::moves::{has_playable_move, select_move};
use swarm_core::telemetry::{SessionSummary, TelemetryRecorder};
use swarm_core::LoadError;

use crate::client::{ClientError, GameClient};
use crate::phase::Phase;
use crate::session::{Session, SessionState};

/// One unit of phase work, applied to one session at a time.
#[async_trait]
pub trait PhaseStep: Send + Sync + 'static {
    fn phase(&self) -> Phase;

    /// On `Err` the phase runner marks the session failed and drops it.
    async fn run(&self, session: &mut Session) -> Result<(), LoadError>;
}

/// Shared by every step of a run.
pub struct StepContext {
    pub client: Arc<dyn GameClient>,
    pub recorder: TelemetryRecorder,
    pub op_timeout: Duration,
}

impl StepContext {
    pub fn new(client: Arc<dyn GameClient>, recorder: TelemetryRecorder, op_timeout: Duration) -> Self {
        Self {
            client,
            recorder,
            op_timeout,
        }
    }

    /// Run one collaborator call under the timeout and record its response time.
    async fn call<T, F>(&self, session: &str, op: Operation, fut: F) -> (Duration, Result<T, LoadError>)
    where
        F: Future<Output = Result<T, ClientError>> + Send,
    {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(r) => r.map_err(|e| e.into_load_error(op)),
            Err(_) => Err(LoadError::Transport {
                op,
                detail: format!("timed out after {}ms", self.op_timeout.as_millis()),
            }),
        };
        let elapsed = started.elapsed();
        self.recorder.record_sample(session, op, elapsed);
        (elapsed, result)
    }
}

async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}

// ── Register ──────────────────────────────────────────────────────────────────

pub struct RegisterStep {
    ctx: Arc<StepContext>,
    signup_secret: String,
}

impl RegisterStep {
    pub fn new(ctx: Arc<StepContext>, signup_secret: impl Into<String>) -> Self {
        Self {
            ctx,
            signup_secret: signup_secret.into(),
        }
    }
}

#[async_trait]
impl PhaseStep for RegisterStep {
    fn phase(&self) -> Phase {
        Phase::Register
    }

    async fn run(&self, session: &mut Session) -> Result<(), LoadError> {
        session.check_transition(SessionState::Registered)?;
        let label = session.label().to_string();

        let (_, result) = self
            .ctx
            .call(
                &label,
                Operation::Register,
                self.ctx.client.register(&label, &self.signup_secret),
            )
            .await;
        session.registered(result?)?;

        self.ctx.recorder.info(format!("Registered {label}"));
        Ok(())
    }
}

// ── Authenticate ──────────────────────────────────────────────────────────────

pub struct AuthenticateStep {
    ctx: Arc<StepContext>,
}

impl AuthenticateStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl PhaseStep for AuthenticateStep {
    fn phase(&self) -> Phase {
        Phase::Authenticate
    }

    async fn run(&self, session: &mut Session) -> Result<(), LoadError> {
        session.check_transition(SessionState::Authenticated)?;
        let label = session.label().to_string();
        let credentials = session
            .credentials()
            .cloned()
            .ok_or_else(|| LoadError::InvalidInput(format!("{label} has no credentials")))?;

        let (_, result) = self
            .ctx
            .call(
                &label,
                Operation::Authenticate,
                self.ctx.client.authenticate(&credentials),
            )
            .await;
        session.authenticated(result?)?;

        self.ctx.recorder.info(format!("{label} logged in"));
        Ok(())
    }
}

// ── Match acquisition ─────────────────────────────────────────────────────────

pub struct MatchStep {
    ctx: Arc<StepContext>,
}

impl MatchStep {
    pub fn new(ctx: Arc<StepContext>) -> Self {
        Self { ctx }
    }
}

fn require_token(session: &Session) -> Result<AuthToken, LoadError> {
    session
        .token()
        .cloned()
        .ok_or_else(|| LoadError::InvalidInput(format!("{} has no token", session.label())))
}

#[async_trait]
impl PhaseStep for MatchStep {
    fn phase(&self) -> Phase {
        Phase::MatchAcquire
    }

    async fn run(&self, session: &mut Session) -> Result<(), LoadError> {
        session.check_transition(SessionState::Matched)?;
        let label = session.label().to_string();
        let token = require_token(session)?;

        let (_, result) = self
            .ctx
            .call(
                &label,
                Operation::FetchMatch,
                self.ctx.client.acquire_or_fetch_match(&token),
            )
            .await;
        let state = result?;
        session.matched(state.match_id.clone())?;

        self.ctx
            .recorder
            .info(format!("{label} is playing Game ID: {}", state.match_id));
        Ok(())
    }
}

// ── Play ──────────────────────────────────────────────────────────────────────

pub struct PlayStep {
    ctx: Arc<StepContext>,
    attempts: u32,
    pacing: PacingConfig,
}

impl PlayStep {
    pub fn new(ctx: Arc<StepContext>, attempts: u32, pacing: PacingConfig) -> Self {
        Self {
            ctx,
            attempts,
            pacing,
        }
    }

    /// The attempt loop. Returning `Ok` means the session finished normally,
    /// including running out of legal moves.
    async fn play(&self, session: &mut Session, token: &AuthToken) -> Result<(), LoadError> {
        let label = session.label().to_string();
        let recorder = &self.ctx.recorder;

        for attempt in 1..=self.attempts {
            tracing::debug!(session = %label, attempt, "play attempt");
            pause(self.pacing.lead_in()).await;

            let (elapsed, fetched) = self
                .ctx
                .call(
                    &label,
                    Operation::FetchMatch,
                    self.ctx.client.acquire_or_fetch_match(token),
                )
                .await;
            session.add_response_time(elapsed);
            let state = match fetched {
                Ok(state) => state,
                Err(e) => {
                    session.record_move(false);
                    return Err(e);
                }
            };
            session.refresh_match(state.match_id.clone());

            if !has_playable_move(&state.legal_moves) {
                recorder.warn(format!("{label} has no legal moves in Game {}.", state.match_id));
                return Ok(());
            }
            let mv = select_move(&state.legal_moves, session.rng())?;

            pause(self.pacing.think()).await;

            let (elapsed, submitted) = self
                .ctx
                .call(
                    &label,
                    Operation::SubmitMove,
                    self.ctx
                        .client
                        .submit_move(token, &state.match_id, state.move_number, &mv),
                )
                .await;
            session.add_response_time(elapsed);

            match submitted {
                Ok(()) => {
                    session.record_move(true);
                    recorder.info(format!(
                        "{label} moved {mv} in Game {} (Move #{})",
                        state.match_id, state.move_number
                    ));
                }
                // The service refused this move; the game goes on.
                Err(e @ LoadError::Rejected { .. }) => {
                    session.record_move(false);
                    recorder.error(format!("{label} failed to move: {e}"));
                }
                Err(e) => {
                    session.record_move(false);
                    return Err(e);
                }
            }

            if attempt < self.attempts {
                pause(self.pacing.settle()).await;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl PhaseStep for PlayStep {
    fn phase(&self) -> Phase {
        Phase::Play
    }

    async fn run(&self, session: &mut Session) -> Result<(), LoadError> {
        let token = require_token(session)?;
        session.transition(SessionState::Playing)?;
        let started = Instant::now();

        let outcome = match self.play(session, &token).await {
            Ok(()) => session.transition(SessionState::Finished),
            Err(e) => Err(e),
        };

        // Every session that entered play gets a summary, however it leaves.
        self.ctx.recorder.record_summary(SessionSummary::new(
            session.label(),
            session.moves_succeeded(),
            session.moves_failed(),
            session.response_total(),
            started.elapsed(),
            outcome.is_ok(),
        ));
        outcome
    }
}
