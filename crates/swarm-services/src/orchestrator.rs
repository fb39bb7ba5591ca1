//! Orchestrator — drives one load run through every phase in order.
//!
//! Register → Authenticate → MatchAcquire → Play. Each phase receives the
//! survivors of the previous one. A run whose Authenticate phase leaves fewer
//! than `min_authenticated` sessions is aborted there; every other shortfall
//! just makes the following phases smaller. The run always produces a report.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::broadcast;

use swarm_core::config::{PacingConfig, SwarmConfig};
use swarm_core::game::Operation;
use swarm_core::telemetry::{
    ResponseTimeSample, SessionSummary, TelemetryEvent, TelemetryRecorder,
};
use swarm_core::LoadError;

use crate::client::GameClient;
use crate::lifecycle::{AuthenticateStep, MatchStep, PhaseStep, PlayStep, RegisterStep, StepContext};
use crate::phase::{run_phase, Phase};
use crate::session::Session;

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(10);

// ── Settings ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub attempts_per_session: u32,
    pub pacing: PacingConfig,
    /// Upper bound on each collaborator call.
    pub op_timeout: Duration,
    pub min_authenticated: usize,
    pub label_prefix: String,
    /// Fixes session labels and move choices when set.
    pub seed: Option<u64>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&SwarmConfig::default())
    }
}

impl RunSettings {
    pub fn from_config(config: &SwarmConfig) -> Self {
        Self {
            attempts_per_session: config.run.attempts_per_session,
            pacing: config.pacing.clone(),
            op_timeout: config.target.request_timeout(),
            min_authenticated: config.run.min_authenticated,
            label_prefix: config.run.label_prefix.clone(),
            seed: config.run.seed,
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Aborted after Authenticate.
    Exhausted { survivors: usize, required: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseTally {
    pub phase: Phase,
    pub entered: usize,
    pub survived: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sessions_requested: usize,
    /// Phases that actually ran, in order.
    pub phases: Vec<PhaseTally>,
    pub outcome: RunOutcome,
    /// Sessions that reached `Finished`, in session order.
    pub summaries: Vec<SessionSummary>,
    /// Sessions that entered play and failed there, in session order.
    pub incomplete: Vec<SessionSummary>,
    pub events: Vec<TelemetryEvent>,
    pub samples: Vec<ResponseTimeSample>,
    pub operation_averages: BTreeMap<Operation, Duration>,
    pub duration: Duration,
}

impl RunReport {
    /// Survivors of `phase`, or `None` if it never ran.
    pub fn survivors(&self, phase: Phase) -> Option<usize> {
        self.phases.iter().find(|t| t.phase == phase).map(|t| t.survived)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Exhausted { .. })
    }

    pub fn total_moves(&self) -> (u32, u32) {
        self.summaries
            .iter()
            .chain(&self.incomplete)
            .fold((0, 0), |(ok, failed), s| (ok + s.moves_succeeded, failed + s.moves_failed))
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct Orchestrator {
    client: Arc<dyn GameClient>,
    settings: RunSettings,
    recorder: TelemetryRecorder,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn GameClient>, settings: RunSettings) -> Self {
        Self {
            client,
            settings,
            recorder: TelemetryRecorder::new(),
        }
    }

    pub fn recorder(&self) -> &TelemetryRecorder {
        &self.recorder
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Live events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.recorder.subscribe()
    }

    /// Create `count` fresh sessions. Each one gets its own rng, derived from
    /// the run seed when there is one.
    fn create_sessions(&self, count: usize) -> Vec<Session> {
        let mut run_rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..count)
            .map(|index| {
                let suffix: u32 = run_rng.gen_range(1000..=9999);
                let label = format!("{}{index}_{suffix}", self.settings.label_prefix);
                Session::new(index, label, StdRng::seed_from_u64(run_rng.gen()))
            })
            .collect()
    }

    pub async fn run(&self, num_sessions: usize, signup_secret: &str) -> RunReport {
        let started = Instant::now();
        let ctx = Arc::new(StepContext::new(
            self.client.clone(),
            self.recorder.clone(),
            self.settings.op_timeout,
        ));

        let sessions = self.create_sessions(num_sessions);
        let order: HashMap<String, usize> = sessions
            .iter()
            .map(|s| (s.label().to_string(), s.index()))
            .collect();
        tracing::info!(sessions = num_sessions, "load run starting");

        let mut phases = Vec::with_capacity(Phase::ORDER.len());

        let registered = self
            .phase(Arc::new(RegisterStep::new(ctx.clone(), signup_secret)), sessions, &mut phases)
            .await;
        let authenticated = self
            .phase(Arc::new(AuthenticateStep::new(ctx.clone())), registered, &mut phases)
            .await;

        let required = self.settings.min_authenticated;
        let outcome = if authenticated.len() < required {
            let err = LoadError::ExhaustedSessions {
                survivors: authenticated.len(),
                required,
            };
            self.recorder.error(format!("Aborting run: {err}"));
            RunOutcome::Exhausted {
                survivors: authenticated.len(),
                required,
            }
        } else {
            let matched = self
                .phase(Arc::new(MatchStep::new(ctx.clone())), authenticated, &mut phases)
                .await;
            let play = PlayStep::new(
                ctx.clone(),
                self.settings.attempts_per_session,
                self.settings.pacing.clone(),
            );
            self.phase(Arc::new(play), matched, &mut phases).await;
            RunOutcome::Completed
        };

        self.recorder.info("Load test complete.");
        let report = self.report(num_sessions, phases, outcome, &order, started.elapsed());
        tracing::info!(
            summaries = report.summaries.len(),
            incomplete = report.incomplete.len(),
            elapsed_ms = report.duration.as_millis() as u64,
            "load run finished"
        );
        report
    }

    async fn phase(
        &self,
        step: Arc<dyn PhaseStep>,
        sessions: Vec<Session>,
        tallies: &mut Vec<PhaseTally>,
    ) -> Vec<Session> {
        let phase = step.phase();
        let entered = sessions.len();
        let survivors = run_phase(step, sessions, &self.recorder).await;
        tallies.push(PhaseTally {
            phase,
            entered,
            survived: survivors.len(),
        });
        survivors
    }

    fn report(
        &self,
        sessions_requested: usize,
        phases: Vec<PhaseTally>,
        outcome: RunOutcome,
        order: &HashMap<String, usize>,
        duration: Duration,
    ) -> RunReport {
        let snapshot = self.recorder.snapshot();
        let operation_averages = snapshot.operation_averages();

        let (mut summaries, mut incomplete): (Vec<_>, Vec<_>) =
            snapshot.summaries.into_iter().partition(|s| s.completed);
        let rank = |s: &SessionSummary| order.get(&s.session).copied().unwrap_or(usize::MAX);
        summaries.sort_by_key(rank);
        incomplete.sort_by_key(rank);

        RunReport {
            sessions_requested,
            phases,
            outcome,
            summaries,
            incomplete,
            events: snapshot.events,
            samples: snapshot.samples,
            operation_averages,
            duration,
        }
    }
}

/// One-shot run with default settings. `inter_attempt_delay` is the only
/// pause: it separates consecutive attempts of a session.
pub async fn run(
    client: Arc<dyn GameClient>,
    num_sessions: usize,
    signup_secret: &str,
    attempts_per_session: u32,
    inter_attempt_delay: Duration,
) -> RunReport {
    let pacing = PacingConfig {
        settle_ms: u64::try_from(inter_attempt_delay.as_millis()).unwrap_or(u64::MAX),
        ..PacingConfig::none()
    };
    let settings = RunSettings {
        attempts_per_session,
        pacing,
        op_timeout: DEFAULT_OP_TIMEOUT,
        ..RunSettings::default()
    };
    Orchestrator::new(client, settings)
        .run(num_sessions, signup_secret)
        .await
}
