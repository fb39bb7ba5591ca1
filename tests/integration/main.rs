//! swarm integration test harness.
//!
//! Every test starts its own stand-in game service on an ephemeral port and
//! drives it over real HTTP with the same client the CLI uses:
//!
//!   cargo test --test integration
//!
//! Pacing is switched off so runs finish in well under a second.

mod failures;
mod runs;
mod telemetry_log;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use swarm_core::config::PacingConfig;
use swarm_mock::{MockConfig, MockState};
use swarm_services::{GameClient, HttpGameClient, Orchestrator, RunSettings};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const SIGNUP_CODE: &str = "swarm";

pub struct Harness {
    pub state: MockState,
    pub addr: SocketAddr,
    pub client: Arc<HttpGameClient>,
}

impl Harness {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn orchestrator(&self, settings: RunSettings) -> Orchestrator {
        Orchestrator::new(self.client.clone() as Arc<dyn GameClient>, settings)
    }
}

/// Start a stand-in service and an HTTP client pointed at it.
pub async fn start(config: MockConfig) -> Result<Harness> {
    let state = MockState::new(config);
    let addr = swarm_mock::spawn(state.clone())
        .await
        .context("failed to start mock game service")?;
    let client = HttpGameClient::new(&format!("http://{addr}"), Duration::from_secs(5))
        .context("failed to build client")?;
    Ok(Harness {
        state,
        addr,
        client: Arc::new(client),
    })
}

pub async fn start_solo() -> Result<Harness> {
    start(MockConfig::default()).await
}

/// No pacing, fixed seed.
pub fn fast(attempts: u32) -> RunSettings {
    RunSettings {
        attempts_per_session: attempts,
        pacing: PacingConfig::none(),
        op_timeout: Duration::from_secs(5),
        seed: Some(42),
        ..RunSettings::default()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_mock_service_answers() {
    let h = start_solo().await.unwrap();
    let creds = h.client.register("probe_0_1000", SIGNUP_CODE).await.unwrap();
    assert_eq!(creds.username, "probe_0_1000");
    assert!(!creds.password.is_empty());

    let token = h.client.authenticate(&creds).await.unwrap();
    let state = h.client.acquire_or_fetch_match(&token).await.unwrap();
    assert_eq!(state.move_number, 0);
    assert_eq!(state.legal_moves.len(), 8);
    println!("mock game service up at {}", h.base_url());
}
