//! HTTP handlers — the game service's wire contract over [`MockState`].

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::state::{GameView, MockState, MockStats, Refusal};

fn bearer_user(state: &MockState, headers: &HeaderMap) -> Result<String, Refusal> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "missing bearer token".to_string()))?;
    state.user_for_token(token.trim())
}

// ── POST /Account/{username} ──────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub password: String,
}

pub async fn handle_register(
    State(state): State<MockState>,
    Path(username): Path<String>,
    Json(signup_code): Json<String>,
) -> Result<Json<RegisterResponse>, Refusal> {
    let password = state.register(&username, &signup_code)?;
    tracing::debug!(username = %username, "account created");
    Ok(Json(RegisterResponse { password }))
}

// ── POST /Token?username= ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub username: String,
}

/// The token goes back as a bare JSON string.
pub async fn handle_token(
    State(state): State<MockState>,
    Query(query): Query<TokenQuery>,
    Json(password): Json<String>,
) -> Result<Json<String>, Refusal> {
    state.issue_token(&query.username, &password).map(Json)
}

// ── GET /Game ─────────────────────────────────────────────────────────────────

pub async fn handle_get_game(
    State(state): State<MockState>,
    headers: HeaderMap,
) -> Result<Json<GameView>, Refusal> {
    let user = bearer_user(&state, &headers)?;
    Ok(Json(state.current_game(&user)))
}

// ── POST /Game?gameId=&move=&moveNumber= ──────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveQuery {
    pub game_id: u64,
    #[serde(rename = "move")]
    pub notation: String,
    pub move_number: u32,
}

pub async fn handle_move(
    State(state): State<MockState>,
    headers: HeaderMap,
    Query(query): Query<MoveQuery>,
) -> Result<Json<GameView>, Refusal> {
    let user = bearer_user(&state, &headers)?;
    let view = state
        .submit_move(&user, query.game_id, &query.notation, query.move_number)
        .inspect_err(|(status, reason)| {
            tracing::debug!(user = %user, status = status.as_u16(), reason = %reason, "move refused");
        })?;
    Ok(Json(view))
}

// ── GET /stats ────────────────────────────────────────────────────────────────

pub async fn handle_stats(State(state): State<MockState>) -> Json<MockStats> {
    Json(state.stats())
}
