use swarm_core::telemetry::Severity;
use swarm_mock::MockConfig;
use swarm_services::{Phase, RunOutcome};

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Complete runs over HTTP
// ══════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_full_run_plays_every_attempt() {
    let h = start_solo().await.unwrap();
    let report = h.orchestrator(fast(3)).run(6, SIGNUP_CODE).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    for phase in Phase::ORDER {
        assert_eq!(report.survivors(phase), Some(6), "{phase}");
    }
    assert_eq!(report.summaries.len(), 6);
    assert!(report.summaries.iter().all(|s| s.moves_succeeded == 3 && s.moves_failed == 0));
    assert_eq!(report.events.iter().filter(|e| e.severity != Severity::Info).count(), 0);

    let stats = h.state.stats();
    assert_eq!(stats.accounts, 6);
    assert_eq!(stats.games, 6);
    assert_eq!(stats.moves, 18);

    // Register, authenticate, match, then fetch + submit per attempt.
    assert_eq!(report.samples.len(), 6 * (3 + 2 * 3));
    assert_eq!(report.operation_averages.len(), 4);
}

#[tokio::test]
async fn test_games_that_run_dry_finish_cleanly() {
    let h = start_solo().await.unwrap();
    let report = h.orchestrator(fast(40)).run(2, SIGNUP_CODE).await;

    assert_eq!(report.summaries.len(), 2);
    for s in &report.summaries {
        assert!(s.completed);
        assert!(s.moves_succeeded <= 32, "{} moved {} times", s.session, s.moves_succeeded);
        assert_eq!(s.moves_failed, 0);
    }
    let dry: Vec<_> = report
        .events
        .iter()
        .filter(|e| e.message.contains("has no legal moves"))
        .collect();
    assert_eq!(dry.len(), 2);
    assert!(dry.iter().all(|e| e.severity == Severity::Warning));
    assert_eq!(report.events.iter().filter(|e| e.severity == Severity::Error).count(), 0);
}

#[tokio::test]
async fn test_paired_sessions_share_games() {
    let h = start(MockConfig {
        pairing: true,
        ..MockConfig::default()
    })
    .await
    .unwrap();
    let report = h.orchestrator(fast(2)).run(4, SIGNUP_CODE).await;

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.summaries.len(), 4);
    assert_eq!(h.state.stats().games, 2);

    // Waiting for the opponent shows up as an empty move list, never as an error.
    assert_eq!(report.events.iter().filter(|e| e.severity == Severity::Error).count(), 0);
    let (ok, failed) = report.total_moves();
    assert_eq!(failed, 0);
    assert!(ok >= 2);
    assert_eq!(u64::from(ok), h.state.stats().moves);
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let h = start_solo().await.unwrap();
    let report = h.orchestrator(fast(1)).run(2, SIGNUP_CODE).await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["sessions_requested"], 2);
    assert_eq!(json["outcome"]["status"], "completed");
    assert_eq!(json["summaries"].as_array().map(Vec::len), Some(2));
    assert!(json["operation_averages"]["SubmitMove"].is_object());
}
