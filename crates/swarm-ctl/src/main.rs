//! swarm-ctl — drive load runs against the chess game service.

mod cmd;

use std::path::PathBuf;

use anyhow::{Context, Result};

use swarm_core::config::{PacingConfig, SwarmConfig};

const DEFAULT_MOCK_PORT: u16 = 8080;

/// Command-line overrides, applied on top of the loaded config.
#[derive(Default)]
struct Flags {
    sessions: Option<usize>,
    attempts: Option<u32>,
    signup_code: Option<String>,
    base_url: Option<String>,
    seed: Option<u64>,
    log: Option<PathBuf>,
    config: Option<PathBuf>,
    port: Option<u16>,
    pairing: bool,
    no_pacing: bool,
    json: bool,
}

impl Flags {
    /// Split `args` into flags and the remaining command words.
    fn parse(args: &[String]) -> Result<(Self, Vec<&str>)> {
        let mut flags = Flags::default();
        let mut remaining = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            match arg {
                "--sessions" => {
                    flags.sessions = Some(take(args, &mut i, arg)?.parse().context("--sessions must be a number")?)
                }
                "--attempts" => {
                    flags.attempts = Some(take(args, &mut i, arg)?.parse().context("--attempts must be a number")?)
                }
                "--seed" => flags.seed = Some(take(args, &mut i, arg)?.parse().context("--seed must be a number")?),
                "--port" => flags.port = Some(take(args, &mut i, arg)?.parse().context("--port must be a number")?),
                "--signup-code" => flags.signup_code = Some(take(args, &mut i, arg)?.clone()),
                "--base-url" => flags.base_url = Some(take(args, &mut i, arg)?.clone()),
                "--log" => flags.log = Some(PathBuf::from(take(args, &mut i, arg)?)),
                "--config" => flags.config = Some(PathBuf::from(take(args, &mut i, arg)?)),
                "--pairing" => flags.pairing = true,
                "--no-pacing" => flags.no_pacing = true,
                "--json" => flags.json = true,
                other => remaining.push(other),
            }
            i += 1;
        }
        Ok((flags, remaining))
    }

    fn apply(&self, config: &mut SwarmConfig) {
        if let Some(n) = self.sessions {
            config.run.sessions = n;
        }
        if let Some(n) = self.attempts {
            config.run.attempts_per_session = n;
        }
        if let Some(seed) = self.seed {
            config.run.seed = Some(seed);
        }
        if let Some(code) = &self.signup_code {
            config.target.signup_code = code.clone();
        }
        if let Some(url) = &self.base_url {
            config.target.base_url = url.clone();
        }
        if let Some(path) = &self.log {
            config.log.path = path.clone();
        }
        if self.no_pacing {
            config.pacing = PacingConfig::none();
        }
    }
}

/// The value following flag `name`.
fn take<'a>(args: &'a [String], i: &mut usize, name: &str) -> Result<&'a String> {
    *i += 1;
    args.get(*i).with_context(|| format!("{name} requires a value"))
}

fn load_config(flags: &Flags) -> Result<SwarmConfig> {
    let mut config = match &flags.config {
        Some(path) => SwarmConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SwarmConfig::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            SwarmConfig::default()
        }),
    };
    flags.apply(&mut config);
    Ok(config)
}

/// `--base-url` wins; otherwise the stand-in on the local `--port`.
fn stats_target(flags: &Flags) -> String {
    match &flags.base_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => cmd::http::base_url(flags.port.unwrap_or(DEFAULT_MOCK_PORT)),
    }
}

fn print_usage() {
    println!("Usage: swarm-ctl [options] <command>");
    println!();
    println!("Commands:");
    println!("  run           Run a load test against the game service (default)");
    println!("  mock          Serve an in-memory stand-in of the game service");
    println!("  stats         Show counters of a running stand-in service");
    println!("  config        Write the default config if missing and print the resolved one");
    println!();
    println!("Options:");
    println!("  --sessions <n>        Concurrent simulated players");
    println!("  --attempts <n>        Move attempts per player");
    println!("  --signup-code <code>  Registration code");
    println!("  --base-url <url>      Game service base URL (run, stats)");
    println!("  --seed <n>            Make labels and move choices reproducible");
    println!("  --log <path>          Telemetry log file (appended)");
    println!("  --config <path>       Config file (default: $SWARM_CONFIG or ~/.config/swarm/config.toml)");
    println!("  --no-pacing           Skip the delays between play steps");
    println!("  --json                Print the run report as JSON");
    println!("  --port <port>         Port for mock/stats (default: {})", DEFAULT_MOCK_PORT);
    println!("  --pairing             mock: seat two players per game");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (flags, remaining) = Flags::parse(&args)?;
    let port = flags.port.unwrap_or(DEFAULT_MOCK_PORT);

    match remaining.as_slice() {
        ["run"] | [] => cmd::run::cmd_run(load_config(&flags)?, flags.json).await,
        ["mock"] => {
            let config = load_config(&flags)?;
            cmd::mock::cmd_mock(port, config.target.signup_code, flags.pairing).await
        }
        ["stats"] => cmd::stats::cmd_stats(&stats_target(&flags)).await,
        ["config"] => cmd::config::cmd_config(&flags.config),
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
