//! Serve the stand-in game service in the foreground.

use anyhow::Result;

use swarm_mock::{MockConfig, MockState};

pub async fn cmd_mock(port: u16, signup_code: String, pairing: bool) -> Result<()> {
    if signup_code.is_empty() {
        println!("Accepting any signup code.");
    }
    let state = MockState::new(MockConfig {
        signup_code,
        pairing,
    });
    println!("Mock game service on http://127.0.0.1:{port} (Ctrl-C to stop)");

    tokio::select! {
        r = swarm_mock::serve(state, port) => r,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            Ok(())
        }
    }
}
