//! Phase runner — apply one step to every surviving session at once.
//!
//! One tokio task per session, no throttling. [`run_phase`] does not return
//! until every task has finished, so no session can start the next phase
//! while another is still in this one. Failed sessions are dropped from the
//! returned set with one telemetry event each; the phase itself never fails.

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use swarm_core::telemetry::TelemetryRecorder;
use swarm_core::LoadError;

use crate::lifecycle::PhaseStep;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Register,
    Authenticate,
    MatchAcquire,
    Play,
}

impl Phase {
    /// Run order.
    pub const ORDER: [Phase; 4] = [
        Phase::Register,
        Phase::Authenticate,
        Phase::MatchAcquire,
        Phase::Play,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Register => "Register",
            Phase::Authenticate => "Authenticate",
            Phase::MatchAcquire => "MatchAcquire",
            Phase::Play => "Play",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one session's step in one phase.
#[derive(Debug)]
pub enum PhaseOutcome {
    Success(Session),
    Failure(Session, LoadError),
    /// The step's task panicked; the session went down with it.
    Aborted { label: String, reason: String },
}

/// Run `step` on every session concurrently and wait for all of them.
/// Outcomes come back in input order.
pub async fn execute(step: Arc<dyn PhaseStep>, sessions: Vec<Session>) -> Vec<PhaseOutcome> {
    let labels: Vec<String> = sessions.iter().map(|s| s.label().to_string()).collect();

    let handles: Vec<_> = sessions
        .into_iter()
        .map(|mut session| {
            let step = step.clone();
            tokio::spawn(async move {
                match step.run(&mut session).await {
                    Ok(()) => PhaseOutcome::Success(session),
                    Err(e) => PhaseOutcome::Failure(session, e),
                }
            })
        })
        .collect();

    join_all(handles)
        .await
        .into_iter()
        .zip(labels)
        .map(|(joined, label)| match joined {
            Ok(outcome) => outcome,
            Err(e) => PhaseOutcome::Aborted {
                label,
                reason: e.to_string(),
            },
        })
        .collect()
}

/// Run one phase and return the sessions that succeeded, in input order.
pub async fn run_phase(
    step: Arc<dyn PhaseStep>,
    sessions: Vec<Session>,
    recorder: &TelemetryRecorder,
) -> Vec<Session> {
    if sessions.is_empty() {
        return Vec::new();
    }
    let phase = step.phase();
    let entered = sessions.len();

    let mut survivors = Vec::with_capacity(entered);
    for outcome in execute(step, sessions).await {
        match outcome {
            PhaseOutcome::Success(session) => survivors.push(session),
            PhaseOutcome::Failure(mut session, e) => {
                let message = match &e {
                    LoadError::InvalidInput(_) | LoadError::IllegalTransition { .. } => {
                        format!("{} internal fault during {phase}: {e}", session.label())
                    }
                    _ => format!("{} failed {phase}: {e}", session.label()),
                };
                recorder.log(e.severity(), message);
                session.fail(e);
            }
            PhaseOutcome::Aborted { label, reason } => {
                recorder.error(format!("{label} internal fault during {phase}: task aborted: {reason}"));
            }
        }
    }

    tracing::info!(
        phase = phase.as_str(),
        entered,
        survived = survivors.len(),
        "phase complete"
    );
    survivors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use swarm_core::game::Operation;
    use swarm_core::telemetry::Severity;

    use crate::client::GameClient;
    use crate::lifecycle::{AuthenticateStep, RegisterStep, StepContext};
    use crate::session::SessionState;
    use crate::testing::ScriptedClient;

    fn sessions(n: usize) -> Vec<Session> {
        (0..n)
            .map(|i| Session::new(i, format!("bot_user_{i}_1000"), StdRng::seed_from_u64(i as u64)))
            .collect()
    }

    fn ctx(client: Arc<ScriptedClient>, recorder: &TelemetryRecorder) -> Arc<StepContext> {
        Arc::new(StepContext::new(
            client as Arc<dyn GameClient>,
            recorder.clone(),
            Duration::from_secs(5),
        ))
    }

    #[tokio::test]
    async fn empty_input_returns_empty_and_logs_nothing() {
        let recorder = TelemetryRecorder::new();
        let client = Arc::new(ScriptedClient::new());
        let step = Arc::new(RegisterStep::new(ctx(client.clone(), &recorder), "code"));

        let out = run_phase(step, Vec::new(), &recorder).await;
        assert!(out.is_empty());
        assert!(recorder.snapshot().events.is_empty());
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn survivors_are_a_subset_in_input_order() {
        let recorder = TelemetryRecorder::new();
        let client = Arc::new(
            ScriptedClient::new()
                .reject(Operation::Register, &[1, 4])
                // Reverse finishing order relative to input order.
                .delay_for(Operation::Register, &[0], Duration::from_millis(60))
                .delay_for(Operation::Register, &[2], Duration::from_millis(30)),
        );
        let step = Arc::new(RegisterStep::new(ctx(client, &recorder), "code"));

        let out = run_phase(step, sessions(6), &recorder).await;
        let indices: Vec<usize> = out.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 2, 3, 5]);
        assert!(out.iter().all(|s| s.state() == SessionState::Registered));

        let snap = recorder.snapshot();
        let failures: Vec<_> = snap
            .events
            .iter()
            .filter(|e| e.severity != Severity::Info)
            .collect();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|e| e.message.contains("failed Register")));
        assert!(failures.iter().any(|e| e.message.starts_with("bot_user_1_1000")));
        assert!(failures.iter().any(|e| e.message.starts_with("bot_user_4_1000")));
    }

    #[tokio::test]
    async fn phase_is_a_barrier() {
        let recorder = TelemetryRecorder::new();
        let client = Arc::new(
            ScriptedClient::new()
                .delay_for(Operation::Register, &[3], Duration::from_millis(150))
                .delay(Operation::Authenticate, Duration::from_millis(5)),
        );
        let ctx = ctx(client.clone(), &recorder);

        let registered = run_phase(Arc::new(RegisterStep::new(ctx.clone(), "code")), sessions(5), &recorder).await;
        let authenticated = run_phase(Arc::new(AuthenticateStep::new(ctx)), registered, &recorder).await;
        assert_eq!(authenticated.len(), 5);

        let calls = client.calls();
        let last_register_done = calls
            .iter()
            .filter(|c| c.op == Operation::Register)
            .map(|c| c.finished)
            .max()
            .unwrap();
        let first_auth_start = calls
            .iter()
            .filter(|c| c.op == Operation::Authenticate)
            .map(|c| c.started)
            .min()
            .unwrap();
        assert!(last_register_done <= first_auth_start);
    }

    #[tokio::test]
    async fn sessions_run_concurrently() {
        let recorder = TelemetryRecorder::new();
        let client = Arc::new(ScriptedClient::new().delay(Operation::Register, Duration::from_millis(200)));
        let step = Arc::new(RegisterStep::new(ctx(client, &recorder), "code"));

        let started = Instant::now();
        let out = run_phase(step, sessions(20), &recorder).await;
        assert_eq!(out.len(), 20);
        // Serial execution would take four seconds.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    struct Panicky;

    #[async_trait]
    impl PhaseStep for Panicky {
        fn phase(&self) -> Phase {
            Phase::Play
        }

        async fn run(&self, session: &mut Session) -> Result<(), LoadError> {
            if session.index() == 1 {
                panic!("step bug");
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn panicking_step_drops_only_that_session() {
        let recorder = TelemetryRecorder::new();
        let out = run_phase(Arc::new(Panicky), sessions(3), &recorder).await;
        let indices: Vec<usize> = out.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![0, 2]);

        let snap = recorder.snapshot();
        assert_eq!(snap.count(Severity::Error), 1);
        assert!(snap.events[0].message.contains("internal fault during Play"));
    }

    #[tokio::test]
    async fn execute_hands_back_failed_sessions() {
        let client = Arc::new(ScriptedClient::new().reject(Operation::Register, &[0]));
        let recorder = TelemetryRecorder::new();
        let step = Arc::new(RegisterStep::new(ctx(client, &recorder), "code"));

        let outcomes = execute(step, sessions(2)).await;
        assert!(matches!(&outcomes[0], PhaseOutcome::Failure(s, _) if s.index() == 0));
        assert!(matches!(&outcomes[1], PhaseOutcome::Success(s) if s.index() == 1));
    }
}
