//! Accounts, tokens and games of the stand-in service.
//!
//! All stores are `DashMap`s shared through one `Arc`. The only lock is the
//! matchmaking slot, held just long enough to pair a player.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use dashmap::DashMap;
use rand::Rng;
use serde::Serialize;

use crate::board::{Board, Side, Square};

/// Status and message handed straight back to the caller.
pub type Refusal = (StatusCode, String);

fn refuse(status: StatusCode, msg: impl Into<String>) -> Refusal {
    (status, msg.into())
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Required registration code; empty accepts anything.
    pub signup_code: String,
    /// Seat two players per game instead of one player playing both sides.
    pub pairing: bool,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            signup_code: "swarm".to_string(),
            pairing: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: u64,
    pub white: String,
    pub black: Option<String>,
    pub board: Board,
    /// Half-moves played so far.
    pub move_number: u32,
}

impl Game {
    fn new(id: u64, white: &str) -> Self {
        Self {
            id,
            white: white.to_string(),
            black: None,
            board: Board::new(),
            move_number: 0,
        }
    }

    fn side_to_move(&self) -> Side {
        if self.move_number % 2 == 0 {
            Side::White
        } else {
            Side::Black
        }
    }

    /// Whether `user` may move now. A game without a second player is played
    /// from both sides by its owner unless `pairing` is on.
    fn may_move(&self, user: &str, pairing: bool) -> bool {
        match (self.side_to_move(), &self.black) {
            (Side::White, _) => self.white == user,
            (Side::Black, Some(black)) => black == user,
            (Side::Black, None) => !pairing && self.white == user,
        }
    }

    fn view(&self, user: &str, pairing: bool) -> GameView {
        let legal = if self.may_move(user, pairing) {
            self.board
                .legal_moves(self.side_to_move())
                .into_iter()
                .map(|(from, ends)| SquareMoves {
                    start_square: from.to_string(),
                    end_squares: ends.iter().map(|e| e.to_string()).collect(),
                })
                .collect()
        } else {
            Vec::new()
        };
        GameView {
            game_id: self.id,
            current_move_number: self.move_number,
            legal_moves_by_square: legal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SquareMoves {
    pub start_square: String,
    pub end_squares: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub game_id: u64,
    pub current_move_number: u32,
    pub legal_moves_by_square: Vec<SquareMoves>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MockStats {
    pub accounts: usize,
    pub tokens: usize,
    pub games: usize,
    pub moves: u64,
}

struct Inner {
    config: MockConfig,
    /// username → password
    accounts: DashMap<String, String>,
    /// token → username
    tokens: DashMap<String, String>,
    games: DashMap<u64, Game>,
    /// username → game id
    seats: DashMap<String, u64>,
    /// Game waiting for a second player.
    waiting: Mutex<Option<u64>>,
    next_game: AtomicU64,
    moves: AtomicU64,
}

#[derive(Clone)]
pub struct MockState {
    inner: Arc<Inner>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                accounts: DashMap::new(),
                tokens: DashMap::new(),
                games: DashMap::new(),
                seats: DashMap::new(),
                waiting: Mutex::new(None),
                next_game: AtomicU64::new(1),
                moves: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &MockConfig {
        &self.inner.config
    }

    pub fn stats(&self) -> MockStats {
        MockStats {
            accounts: self.inner.accounts.len(),
            tokens: self.inner.tokens.len(),
            games: self.inner.games.len(),
            moves: self.inner.moves.load(Ordering::Relaxed),
        }
    }

    /// Create an account and return its generated password.
    pub fn register(&self, username: &str, signup_code: &str) -> Result<String, Refusal> {
        let expected = &self.inner.config.signup_code;
        if !expected.is_empty() && expected != signup_code {
            return Err(refuse(StatusCode::FORBIDDEN, "invalid signup code"));
        }
        if username.is_empty() {
            return Err(refuse(StatusCode::BAD_REQUEST, "empty username"));
        }
        let password = random_hex(8);
        match self.inner.accounts.entry(username.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(refuse(StatusCode::CONFLICT, "username already taken"))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(password.clone());
                Ok(password)
            }
        }
    }

    pub fn issue_token(&self, username: &str, password: &str) -> Result<String, Refusal> {
        let valid = self
            .inner
            .accounts
            .get(username)
            .is_some_and(|p| p.value() == password);
        if !valid {
            return Err(refuse(StatusCode::UNAUTHORIZED, "invalid credentials"));
        }
        let token = random_hex(16);
        self.inner.tokens.insert(token.clone(), username.to_string());
        Ok(token)
    }

    pub fn user_for_token(&self, token: &str) -> Result<String, Refusal> {
        self.inner
            .tokens
            .get(token)
            .map(|u| u.value().clone())
            .ok_or_else(|| refuse(StatusCode::UNAUTHORIZED, "invalid or expired token"))
    }

    /// The caller's game, seating them in a new or waiting one first if needed.
    pub fn current_game(&self, user: &str) -> GameView {
        let id = match self.inner.seats.get(user).map(|g| *g.value()) {
            Some(id) => id,
            None => self.seat(user),
        };
        let pairing = self.inner.config.pairing;
        self.inner
            .games
            .get(&id)
            .map(|g| g.view(user, pairing))
            .unwrap_or(GameView {
                game_id: id,
                current_move_number: 0,
                legal_moves_by_square: Vec::new(),
            })
    }

    fn seat(&self, user: &str) -> u64 {
        let inner = &self.inner;
        if inner.config.pairing {
            let mut waiting = inner.waiting.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(id) = waiting.take() {
                let joined = inner.games.get_mut(&id).map(|mut g| {
                    g.black = Some(user.to_string());
                });
                if joined.is_some() {
                    inner.seats.insert(user.to_string(), id);
                    tracing::debug!(user, game = id, "joined as black");
                    return id;
                }
            }
            let id = self.open_game(user);
            *waiting = Some(id);
            return id;
        }
        self.open_game(user)
    }

    fn open_game(&self, user: &str) -> u64 {
        let id = self.inner.next_game.fetch_add(1, Ordering::Relaxed);
        self.inner.games.insert(id, Game::new(id, user));
        self.inner.seats.insert(user.to_string(), id);
        tracing::debug!(user, game = id, "new game");
        id
    }

    /// Play `notation` (e.g. `e2e4`) for `user`.
    pub fn submit_move(
        &self,
        user: &str,
        game_id: u64,
        notation: &str,
        move_number: u32,
    ) -> Result<GameView, Refusal> {
        let seat = self.inner.seats.get(user).map(|g| *g.value());
        if seat != Some(game_id) {
            return Err(refuse(StatusCode::BAD_REQUEST, "not a player in this game"));
        }
        let pairing = self.inner.config.pairing;
        let mut game = self
            .inner
            .games
            .get_mut(&game_id)
            .ok_or_else(|| refuse(StatusCode::NOT_FOUND, "no such game"))?;

        if !game.may_move(user, pairing) {
            return Err(refuse(StatusCode::BAD_REQUEST, "not your turn"));
        }
        if game.move_number != move_number {
            return Err(refuse(
                StatusCode::BAD_REQUEST,
                format!("stale move number {move_number}, game is at {}", game.move_number),
            ));
        }
        let (from, to) = match (notation.get(..2), notation.get(2..)) {
            (Some(a), Some(b)) => (Square::parse(a), Square::parse(b)),
            _ => (None, None),
        };
        let (Some(from), Some(to)) = (from, to) else {
            return Err(refuse(StatusCode::BAD_REQUEST, format!("malformed move {notation}")));
        };
        let side = game.side_to_move();
        if !game.board.apply(side, from, to) {
            return Err(refuse(StatusCode::BAD_REQUEST, format!("illegal move {notation}")));
        }
        game.move_number += 1;
        self.inner.moves.fetch_add(1, Ordering::Relaxed);
        Ok(game.view(user, pairing))
    }
}
