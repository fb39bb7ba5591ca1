//! HTTP implementation of [`GameClient`] for the chess game service.
//!
//! One `reqwest::Client` is shared by every session. It is cheap to clone,
//! safe for concurrent use, and pools connections per host; when the pool or
//! the service cannot keep up, calls fail with transport errors that only
//! affect the session that made them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Response, Url};
use serde::Deserialize;

use swarm_core::game::{AuthToken, Credentials, LegalMoves, MatchId, MatchState, Move};

use crate::client::{ClientError, GameClient};

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RegisterResponse {
    password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GameResponse {
    game_id: MatchId,
    current_move_number: u32,
    #[serde(default)]
    legal_moves_by_square: Option<Vec<LegalMoves>>,
}

impl From<GameResponse> for MatchState {
    fn from(g: GameResponse) -> Self {
        MatchState {
            match_id: g.game_id,
            move_number: g.current_move_number,
            legal_moves: g.legal_moves_by_square.unwrap_or_default(),
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct HttpGameClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGameClient {
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn account_url(&self, username: &str) -> String {
        format!("{}/Account/{}", self.base_url, username)
    }

    fn token_url(&self, username: &str) -> Result<Url, ClientError> {
        Url::parse_with_params(&format!("{}/Token", self.base_url), &[("username", username)])
            .map_err(|e| ClientError::Transport(format!("invalid url: {e}")))
    }

    fn game_url(&self) -> String {
        format!("{}/Game", self.base_url)
    }

    fn move_url(&self, match_id: &MatchId, move_number: u32, mv: &Move) -> Result<Url, ClientError> {
        let notation = mv.notation();
        let number = move_number.to_string();
        Url::parse_with_params(
            &self.game_url(),
            &[
                ("gameId", match_id.as_str()),
                ("move", notation.as_str()),
                ("moveNumber", number.as_str()),
            ],
        )
        .map_err(|e| ClientError::Transport(format!("invalid url: {e}")))
    }
}

fn transport(e: reqwest::Error) -> ClientError {
    ClientError::Transport(e.to_string())
}

/// Pass 2xx responses through; turn anything else into `ClientError::Status`.
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        detail,
    })
}

#[async_trait]
impl GameClient for HttpGameClient {
    async fn register(&self, label: &str, signup_secret: &str) -> Result<Credentials, ClientError> {
        let resp = self
            .http
            .post(self.account_url(label))
            .header(ACCEPT, "application/json")
            .json(signup_secret)
            .send()
            .await
            .map_err(transport)?;

        let body: RegisterResponse = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;
        let password = body
            .password
            .ok_or_else(|| ClientError::Malformed("no password returned".to_string()))?;

        Ok(Credentials {
            username: label.to_string(),
            password,
        })
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, ClientError> {
        let resp = self
            .http
            .post(self.token_url(&credentials.username)?)
            .json(&credentials.password)
            .send()
            .await
            .map_err(transport)?;

        // The token comes back as a JSON string literal.
        let text = check(resp).await?.text().await.map_err(transport)?;
        let token = text.trim().trim_matches('"');
        if token.is_empty() {
            return Err(ClientError::Malformed("empty token".to_string()));
        }
        Ok(AuthToken::new(token))
    }

    async fn acquire_or_fetch_match(&self, token: &AuthToken) -> Result<MatchState, ClientError> {
        let resp = self
            .http
            .get(self.game_url())
            .bearer_auth(token.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        let game: GameResponse = check(resp)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::Malformed(e.to_string()))?;
        Ok(game.into())
    }

    async fn submit_move(
        &self,
        token: &AuthToken,
        match_id: &MatchId,
        move_number: u32,
        mv: &Move,
    ) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.move_url(match_id, move_number, mv)?)
            .bearer_auth(token.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport)?;

        check(resp).await.map(|_| ())
    }
}
