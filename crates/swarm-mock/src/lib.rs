//! swarm-mock — an in-memory stand-in for the chess game service.
//!
//! Speaks the same wire contract as the real service so that load runs and
//! integration tests can go end to end without it.

pub mod board;
pub mod handlers;
pub mod state;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use state::{GameView, MockConfig, MockState, MockStats};

pub fn router(state: MockState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/Account/{username}", post(handlers::handle_register))
        .route("/Token", post(handlers::handle_token))
        .route(
            "/Game",
            get(handlers::handle_get_game).post(handlers::handle_move),
        )
        .route("/stats", get(handlers::handle_stats))
        .with_state(state)
        .layer(cors)
}

/// Serve on 127.0.0.1:`port` until the process ends.
pub async fn serve(state: MockState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "mock game service listening on 127.0.0.1");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Serve on an ephemeral port in the background. Returns the bound address.
pub async fn spawn(state: MockState) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::warn!(error = %e, "mock game service stopped");
        }
    });
    tracing::debug!(%addr, "mock game service spawned");
    Ok(addr)
}
