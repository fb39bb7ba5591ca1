//! Telemetry recorder — the single sink for events, response-time samples,
//! and end-of-session summaries.
//!
//! Every write takes the same mutex, so records from concurrent sessions never
//! interleave and the log order is the arrival order. Events are mirrored to
//! `tracing` and published on a broadcast channel for live observers; the
//! broadcast happens under the lock, so subscribers see log order too.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::game::Operation;

/// Events buffered per live subscriber before it starts lagging.
const LIVE_CAPACITY: usize = 1024;

// ── Records ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Unix milliseconds.
    pub timestamp_ms: u64,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTimeSample {
    pub session: String,
    pub operation: Operation,
    pub elapsed: Duration,
}

/// Final counters of one session that entered play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session: String,
    pub moves_succeeded: u32,
    pub moves_failed: u32,
    pub average_response: Duration,
    /// Wall-clock time spent in play.
    pub duration: Duration,
    /// False when the session left play through a failure.
    pub completed: bool,
}

impl SessionSummary {
    pub fn new(
        session: impl Into<String>,
        moves_succeeded: u32,
        moves_failed: u32,
        total_response: Duration,
        duration: Duration,
        completed: bool,
    ) -> Self {
        Self {
            session: session.into(),
            moves_succeeded,
            moves_failed,
            average_response: average_response_time(total_response, moves_succeeded, moves_failed),
            duration,
            completed,
        }
    }
}

/// `total / max(1, succeeded + failed)`.
pub fn average_response_time(total: Duration, succeeded: u32, failed: u32) -> Duration {
    total / succeeded.saturating_add(failed).max(1)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Everything recorded so far, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub events: Vec<TelemetryEvent>,
    pub samples: Vec<ResponseTimeSample>,
    pub summaries: Vec<SessionSummary>,
}

impl TelemetrySnapshot {
    /// Run-wide mean response time per operation. Operations never sampled are absent.
    pub fn operation_averages(&self) -> BTreeMap<Operation, Duration> {
        let mut totals: BTreeMap<Operation, (Duration, u32)> = BTreeMap::new();
        for s in &self.samples {
            let entry = totals.entry(s.operation).or_default();
            entry.0 += s.elapsed;
            entry.1 += 1;
        }
        totals
            .into_iter()
            .map(|(op, (total, n))| (op, total / n.max(1)))
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.events.iter().filter(|e| e.severity == severity).count()
    }
}

// ── Log output ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `<unix ms> - LEVEL - message`, one record per line.
    #[default]
    Text,
    /// One JSON object per line, tagged by record type.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected text or json)")),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LogLine<'a> {
    Event(&'a TelemetryEvent),
    Sample(&'a ResponseTimeSample),
    Summary(&'a SessionSummary),
}

// ── Recorder ──────────────────────────────────────────────────────────────────

struct Inner {
    log: TelemetrySnapshot,
    live: broadcast::Sender<TelemetryEvent>,
}

/// Shared, cloneable handle to one run's telemetry.
#[derive(Clone)]
pub struct TelemetryRecorder {
    inner: Arc<Mutex<Inner>>,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                log: TelemetrySnapshot::default(),
                live,
            })),
        }
    }

    /// Live stream of events recorded after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.lock().live.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a half-written record:
        // every write is a single push.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        let event = TelemetryEvent {
            timestamp_ms: now_ms(),
            severity,
            message: message.into(),
        };
        mirror(&event);

        let mut inner = self.lock();
        let _ = inner.live.send(event.clone());
        inner.log.events.push(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    pub fn record_sample(&self, session: &str, operation: Operation, elapsed: Duration) {
        tracing::debug!(
            session,
            operation = operation.as_str(),
            elapsed_ms = elapsed.as_millis() as u64,
            "response time"
        );
        self.lock().log.samples.push(ResponseTimeSample {
            session: session.to_string(),
            operation,
            elapsed,
        });
    }

    /// Store a summary and log its stats line as one atomic write.
    pub fn record_summary(&self, summary: SessionSummary) {
        let event = TelemetryEvent {
            timestamp_ms: now_ms(),
            severity: Severity::Info,
            message: format!(
                "{} Stats: {} Moves, {} Failures, Avg API Response Time: {:.2}s, Session Duration: {:.2}s",
                summary.session,
                summary.moves_succeeded,
                summary.moves_failed,
                summary.average_response.as_secs_f64(),
                summary.duration.as_secs_f64(),
            ),
        };
        mirror(&event);

        let mut inner = self.lock();
        let _ = inner.live.send(event.clone());
        inner.log.events.push(event);
        inner.log.summaries.push(summary);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.lock().log.clone()
    }

    /// Append everything recorded so far to `path`. Returns the number of lines written.
    pub fn write_log(&self, path: &Path, format: LogFormat) -> std::io::Result<usize> {
        let snapshot = self.snapshot();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut out = BufWriter::new(file);
        let mut lines = 0;

        match format {
            LogFormat::Text => {
                for e in &snapshot.events {
                    writeln!(out, "{} - {} - {}", e.timestamp_ms, e.severity.as_str(), e.message)?;
                    lines += 1;
                }
                for s in &snapshot.samples {
                    writeln!(
                        out,
                        "sample - {} - {} Response Time: {:.3}s",
                        s.session,
                        s.operation,
                        s.elapsed.as_secs_f64()
                    )?;
                    lines += 1;
                }
            }
            LogFormat::Json => {
                let records = snapshot
                    .events
                    .iter()
                    .map(LogLine::Event)
                    .chain(snapshot.samples.iter().map(LogLine::Sample))
                    .chain(snapshot.summaries.iter().map(LogLine::Summary));
                for record in records {
                    let line = serde_json::to_string(&record).map_err(std::io::Error::other)?;
                    writeln!(out, "{line}")?;
                    lines += 1;
                }
            }
        }

        out.flush()?;
        Ok(lines)
    }
}

fn mirror(event: &TelemetryEvent) {
    match event.severity {
        Severity::Info => tracing::info!("{}", event.message),
        Severity::Warning => tracing::warn!("{}", event.message),
        Severity::Error => tracing::error!("{}", event.message),
    }
}
