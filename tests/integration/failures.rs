use std::sync::Arc;
use std::time::Duration;

use swarm_core::telemetry::Severity;
use swarm_mock::MockConfig;
use swarm_services::{run, GameClient, HttpGameClient, Phase, RunOutcome, RunSettings};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Degenerate runs
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_wrong_signup_code_exhausts_the_run() {
    let h = start_solo().await.unwrap();
    let report = h.orchestrator(fast(1)).run(3, "not-the-code").await;

    assert_eq!(
        report.outcome,
        RunOutcome::Exhausted {
            survivors: 0,
            required: 1
        }
    );
    assert_eq!(report.survivors(Phase::Register), Some(0));
    assert!(report.summaries.is_empty());

    let rejected = report
        .events
        .iter()
        .filter(|e| e.severity == Severity::Warning && e.message.contains("status 403"))
        .count();
    assert_eq!(rejected, 3);
    assert!(report.events.iter().any(|e| e.message.starts_with("Aborting run")));
    assert_eq!(h.state.stats().accounts, 0);
}

#[tokio::test]
async fn test_unreachable_service_is_reported_not_raised() {
    let client = HttpGameClient::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
    let settings = RunSettings {
        op_timeout: Duration::from_secs(1),
        ..fast(1)
    };
    let report = swarm_services::Orchestrator::new(Arc::new(client) as Arc<dyn GameClient>, settings)
        .run(2, SIGNUP_CODE)
        .await;

    assert!(report.is_exhausted());
    let transport = report
        .events
        .iter()
        .filter(|e| e.severity == Severity::Error && e.message.contains("transport failure"))
        .count();
    assert_eq!(transport, 2);
}

#[tokio::test]
async fn test_reused_seed_collides_on_the_same_service() {
    let h = start_solo().await.unwrap();
    let first = h.orchestrator(fast(1)).run(2, SIGNUP_CODE).await;
    assert_eq!(first.outcome, RunOutcome::Completed);

    // Same seed, same usernames: every registration is refused.
    let second = h.orchestrator(fast(1)).run(2, SIGNUP_CODE).await;
    assert!(second.is_exhausted());
    assert!(second
        .events
        .iter()
        .any(|e| e.message.contains("status 409")));
    assert_eq!(h.state.stats().accounts, 2);
}

#[tokio::test]
async fn test_entry_point_runs_against_http() {
    let h = start(MockConfig {
        signup_code: String::new(),
        ..MockConfig::default()
    })
    .await
    .unwrap();
    let report = run(h.client.clone() as Arc<dyn GameClient>, 3, "", 1, Duration::ZERO).await;
    assert_eq!(report.summaries.len(), 3);
    assert_eq!(h.state.stats().moves, 3);
}
