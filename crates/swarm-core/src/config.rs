//! Configuration system for swarm.
//!
//! Resolution order: environment variables → config file → defaults.
//! Command-line flags are applied on top by the binary.
//!
//! Config file location:
//!   1. $SWARM_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/swarm/config.toml
//!   3. ~/.config/swarm/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::telemetry::LogFormat;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub target: TargetConfig,
    pub run: RunConfig,
    pub pacing: PacingConfig,
    pub log: LogConfig,
}

/// The remote game service under load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub base_url: String,
    /// Signup code required by account registration.
    pub signup_code: String,
    /// Per-request timeout for every collaborator call.
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Simulated sessions per run.
    pub sessions: usize,
    /// Move attempts per session during play.
    pub attempts_per_session: u32,
    /// Fewer authenticated sessions than this aborts the run before matchmaking.
    pub min_authenticated: usize,
    /// Username prefix; sessions are named `{prefix}{index}_{1000..=9999}`.
    pub label_prefix: String,
    /// Fixes labels and move choices. Absent = fresh entropy per run.
    pub seed: Option<u64>,
}

/// Human pacing inside each play attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Before each match fetch.
    pub lead_in_ms: u64,
    /// Between fetch and submit.
    pub think_ms: u64,
    /// Between consecutive attempts.
    pub settle_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Telemetry log file, appended at the end of each run.
    pub path: PathBuf,
    pub format: LogFormat,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            signup_code: String::new(),
            request_timeout_ms: 10_000,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            sessions: 10,
            attempts_per_session: 1,
            min_authenticated: 1,
            label_prefix: "bot_user_".to_string(),
            seed: None,
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            lead_in_ms: 3_000,
            think_ms: 0,
            settle_ms: 5_000,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("swarm_load_test.log"),
            format: LogFormat::Text,
        }
    }
}

impl TargetConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PacingConfig {
    /// No delays at all. Used by tests and dry runs.
    pub fn none() -> Self {
        Self {
            lead_in_ms: 0,
            think_ms: 0,
            settle_ms: 0,
        }
    }

    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    pub fn think(&self) -> Duration {
        Duration::from_millis(self.think_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("swarm")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SwarmConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults if it does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            SwarmConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SWARM_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = SwarmConfig::default().to_toml()?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)
    }

    /// Apply SWARM_* overrides. `lookup` is `std::env::var` outside of tests.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("SWARM_TARGET__BASE_URL") {
            self.target.base_url = v;
        }
        if let Some(v) = lookup("SWARM_TARGET__SIGNUP_CODE") {
            self.target.signup_code = v;
        }
        if let Some(Ok(v)) = lookup("SWARM_TARGET__REQUEST_TIMEOUT_MS").map(|v| v.parse()) {
            self.target.request_timeout_ms = v;
        }
        if let Some(Ok(v)) = lookup("SWARM_RUN__SESSIONS").map(|v| v.parse()) {
            self.run.sessions = v;
        }
        if let Some(Ok(v)) = lookup("SWARM_RUN__ATTEMPTS_PER_SESSION").map(|v| v.parse()) {
            self.run.attempts_per_session = v;
        }
        if let Some(Ok(v)) = lookup("SWARM_RUN__SEED").map(|v| v.parse()) {
            self.run.seed = Some(v);
        }
        if let Some(Ok(v)) = lookup("SWARM_PACING__SETTLE_MS").map(|v| v.parse()) {
            self.pacing.settle_ms = v;
        }
        if let Some(Ok(v)) = lookup("SWARM_LOG__FORMAT").map(|v| v.parse()) {
            self.log.format = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_observed_workload() {
        let config = SwarmConfig::default();
        assert_eq!(config.run.sessions, 10);
        assert_eq!(config.run.attempts_per_session, 1);
        assert_eq!(config.run.min_authenticated, 1);
        assert_eq!(config.pacing.lead_in(), Duration::from_secs(3));
        assert_eq!(config.pacing.settle(), Duration::from_secs(5));
        assert!(config.run.seed.is_none());
    }

    #[test]
    fn overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("SWARM_TARGET__BASE_URL", "http://game.example:9000"),
            ("SWARM_RUN__SESSIONS", "250"),
            ("SWARM_RUN__SEED", "42"),
            ("SWARM_RUN__ATTEMPTS_PER_SESSION", "not-a-number"),
            ("SWARM_LOG__FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = SwarmConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.target.base_url, "http://game.example:9000");
        assert_eq!(config.run.sessions, 250);
        assert_eq!(config.run.seed, Some(42));
        // Unparseable values are ignored.
        assert_eq!(config.run.attempts_per_session, 1);
        assert_eq!(config.log.format, LogFormat::Json);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let text = r#"
            [run]
            sessions = 3

            [pacing]
            settle_ms = 0
        "#;
        let config: SwarmConfig = toml::from_str(text).unwrap();
        assert_eq!(config.run.sessions, 3);
        assert_eq!(config.run.label_prefix, "bot_user_");
        assert_eq!(config.pacing.settle_ms, 0);
        assert_eq!(config.pacing.lead_in_ms, 3_000);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = SwarmConfig::default();
        let text = config.to_toml().unwrap();
        let back: SwarmConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn load_from_missing_path_gives_defaults() {
        let path = std::env::temp_dir()
            .join(format!("swarm-config-missing-{}", std::process::id()))
            .join("config.toml");
        let config = SwarmConfig::load_from(&path).expect("load should succeed");
        assert_eq!(config.run.label_prefix, "bot_user_");
    }
}
