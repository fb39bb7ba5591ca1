use std::path::PathBuf;

use swarm_core::telemetry::LogFormat;

use crate::*;

// ══════════════════════════════════════════════════════════════════════════════
//  Persisted telemetry
// ══════════════════════════════════════════════════════════════════════════════

fn scratch(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("swarm-it-{}-{name}", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

#[tokio::test]
async fn test_text_log_holds_the_whole_run() {
    let h = start_solo().await.unwrap();
    let orchestrator = h.orchestrator(fast(2));
    let report = orchestrator.run(3, SIGNUP_CODE).await;

    let path = scratch("run.log");
    let lines = orchestrator.recorder().write_log(&path, LogFormat::Text).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), lines);
    assert_eq!(lines, report.events.len() + report.samples.len());

    assert_eq!(text.matches(" Stats: 2 Moves, 0 Failures").count(), 3);
    assert!(text.contains(" - INFO - Load test complete."));
    assert!(text.contains("Submit Move Response Time:"));

    // Appending a second time doubles the file.
    orchestrator.recorder().write_log(&path, LogFormat::Text).unwrap();
    let again = std::fs::read_to_string(&path).unwrap();
    assert_eq!(again.lines().count(), 2 * lines);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_json_log_lines_parse() {
    let h = start_solo().await.unwrap();
    let orchestrator = h.orchestrator(fast(1));
    let report = orchestrator.run(2, SIGNUP_CODE).await;

    let path = scratch("run.jsonl");
    orchestrator.recorder().write_log(&path, LogFormat::Json).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();

    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let of = |kind: &str| records.iter().filter(|r| r["type"] == kind).count();
    assert_eq!(of("event"), report.events.len());
    assert_eq!(of("sample"), report.samples.len());
    assert_eq!(of("summary"), 2);
    let _ = std::fs::remove_file(&path);
}
