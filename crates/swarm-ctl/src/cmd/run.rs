//! Load run: stream live events, then print the report and append the log.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;

use swarm_core::config::SwarmConfig;
use swarm_core::telemetry::{TelemetryEvent, TelemetryRecorder};
use swarm_services::{HttpGameClient, Orchestrator, RunOutcome, RunReport, RunSettings};

fn print_event(event: &TelemetryEvent) {
    println!("{} - {}", event.severity.as_str(), event.message);
}

fn flush_log(recorder: &TelemetryRecorder, config: &SwarmConfig) -> Result<()> {
    let lines = recorder
        .write_log(&config.log.path, config.log.format)
        .with_context(|| format!("failed to write {}", config.log.path.display()))?;
    tracing::info!(path = %config.log.path.display(), lines, "telemetry log written");
    Ok(())
}

pub async fn cmd_run(config: SwarmConfig, json: bool) -> Result<()> {
    let client = HttpGameClient::new(&config.target.base_url, config.target.request_timeout())
        .context("failed to build HTTP client")?;
    let orchestrator = Orchestrator::new(Arc::new(client), RunSettings::from_config(&config));
    let recorder = orchestrator.recorder().clone();
    let mut live = orchestrator.subscribe();

    tracing::info!(
        base_url = %config.target.base_url,
        sessions = config.run.sessions,
        attempts = config.run.attempts_per_session,
        "starting load run"
    );

    let run = orchestrator.run(config.run.sessions, &config.target.signup_code);
    tokio::pin!(run);

    let report = loop {
        tokio::select! {
            report = &mut run => break Some(report),
            event = live.recv() => match event {
                Ok(e) => print_event(&e),
                Err(RecvError::Lagged(n)) => println!("  … {n} events not shown"),
                Err(RecvError::Closed) => {}
            },
            _ = tokio::signal::ctrl_c() => break None,
        }
    };
    while let Ok(e) = live.try_recv() {
        print_event(&e);
    }

    let Some(report) = report else {
        recorder.warn("Interrupted; writing telemetry recorded so far.");
        flush_log(&recorder, &config)?;
        let snapshot = recorder.snapshot();
        println!(
            "Interrupted after {} events, {} session summaries.",
            snapshot.events.len(),
            snapshot.summaries.len()
        );
        return Ok(());
    };

    flush_log(&recorder, &config)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_exhausted() {
        std::process::exit(2);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("═══════════════════════════════════════");
    println!("  Load Run Report");
    println!("═══════════════════════════════════════");
    println!("  Sessions requested : {}", report.sessions_requested);
    match report.outcome {
        RunOutcome::Completed => println!("  Outcome            : completed"),
        RunOutcome::Exhausted {
            survivors,
            required,
        } => println!("  Outcome            : aborted, {survivors} of {required} required sessions authenticated"),
    }
    println!("  Duration           : {:.2}s", report.duration.as_secs_f64());
    let (ok, failed) = report.total_moves();
    println!("  Moves              : {ok} ok, {failed} failed");

    println!("\n  Phases:");
    for t in &report.phases {
        println!("  {:<14} {:>4} → {:<4}", t.phase.as_str(), t.entered, t.survived);
    }

    if !report.operation_averages.is_empty() {
        println!("\n  Average response time:");
        for (op, avg) in &report.operation_averages {
            println!("  {:<14} {:.3}s", op.as_str(), avg.as_secs_f64());
        }
    }

    if report.summaries.is_empty() && report.incomplete.is_empty() {
        println!("\n  No session reached play.");
        return;
    }
    println!("\n  Sessions:");
    for s in report.summaries.iter().chain(&report.incomplete) {
        let status = if s.completed { "finished" } else { "failed" };
        println!("  ┌─ {} ({status})", s.session);
        println!("  │  moves    : {} ok, {} failed", s.moves_succeeded, s.moves_failed);
        println!("  │  avg resp : {:.2}s", s.average_response.as_secs_f64());
        println!("  └─ duration : {:.2}s", s.duration.as_secs_f64());
    }
}
