//! In-process stand-in for the game service, for tests and dry runs.
//!
//! `ScriptedClient` answers deterministically, can delay or fail chosen
//! operations for chosen sessions, and keeps a log of every call with its
//! start and finish instants. Sessions are identified by the index embedded
//! in their label (`bot_user_{index}_{suffix}`, the default label form).

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use swarm_core::game::{AuthToken, Credentials, LegalMoves, MatchId, MatchState, Move, Operation};

use crate::client::{ClientError, GameClient};

const TOKEN_PREFIX: &str = "tok:";
const LABEL_PREFIX: &str = "bot_user_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub op: Operation,
    pub session: usize,
    pub started: Instant,
    pub finished: Instant,
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    Reject(u16),
    Disconnect,
}

#[derive(Debug, Clone)]
struct FaultRule {
    op: Operation,
    sessions: HashSet<usize>,
    /// Calls with a lower per-session ordinal succeed.
    from_call: u32,
    fault: Fault,
}

#[derive(Debug, Clone)]
struct DelayRule {
    op: Operation,
    sessions: Option<HashSet<usize>>,
    delay: Duration,
}

#[derive(Default)]
struct Log {
    calls: Vec<CallRecord>,
    ordinals: HashMap<(Operation, usize), u32>,
    submitted: Vec<(usize, Move)>,
}

pub struct ScriptedClient {
    faults: Vec<FaultRule>,
    delays: Vec<DelayRule>,
    legal_moves: Vec<LegalMoves>,
    stuck: HashSet<usize>,
    log: Mutex<Log>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self {
            faults: Vec::new(),
            delays: Vec::new(),
            legal_moves: vec![
                LegalMoves::new("e2", &["e3", "e4"]),
                LegalMoves::new("d2", &["d3", "d4"]),
                LegalMoves::new("g1", &["f3", "h3"]),
            ],
            stuck: HashSet::new(),
            log: Mutex::new(Log::default()),
        }
    }

    /// Every `op` call by these sessions is answered with status 400.
    pub fn reject(self, op: Operation, sessions: &[usize]) -> Self {
        self.reject_from_call(op, sessions, 0)
    }

    /// Like [`reject`](Self::reject), but the first `from_call` calls succeed.
    pub fn reject_from_call(mut self, op: Operation, sessions: &[usize], from_call: u32) -> Self {
        self.faults.push(FaultRule {
            op,
            sessions: sessions.iter().copied().collect(),
            from_call,
            fault: Fault::Reject(400),
        });
        self
    }

    /// Every `op` call by these sessions fails at the transport level.
    pub fn disconnect(mut self, op: Operation, sessions: &[usize]) -> Self {
        self.faults.push(FaultRule {
            op,
            sessions: sessions.iter().copied().collect(),
            from_call: 0,
            fault: Fault::Disconnect,
        });
        self
    }

    pub fn delay(mut self, op: Operation, delay: Duration) -> Self {
        self.delays.push(DelayRule {
            op,
            sessions: None,
            delay,
        });
        self
    }

    pub fn delay_for(mut self, op: Operation, sessions: &[usize], delay: Duration) -> Self {
        self.delays.push(DelayRule {
            op,
            sessions: Some(sessions.iter().copied().collect()),
            delay,
        });
        self
    }

    pub fn legal_moves(mut self, legal: Vec<LegalMoves>) -> Self {
        self.legal_moves = legal;
        self
    }

    /// These sessions always see a match with nothing to play.
    pub fn no_legal_moves_for(mut self, sessions: &[usize]) -> Self {
        self.stuck.extend(sessions.iter().copied());
        self
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    pub fn calls(&self) -> Vec<CallRecord> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: Operation) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Successfully submitted moves, by session index.
    pub fn submitted(&self) -> Vec<(usize, Move)> {
        self.lock().submitted.clone()
    }

    // ── Internals ────────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Log> {
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn index_of(&self, label: &str) -> usize {
        label
            .strip_prefix(LABEL_PREFIX)
            .and_then(|rest| rest.split('_').next())
            .and_then(|i| i.parse().ok())
            .unwrap_or(usize::MAX)
    }

    fn index_of_token(&self, token: &AuthToken) -> usize {
        token
            .as_str()
            .strip_prefix(TOKEN_PREFIX)
            .map(|label| self.index_of(label))
            .unwrap_or(usize::MAX)
    }

    fn next_ordinal(&self, op: Operation, session: usize) -> u32 {
        let mut log = self.lock();
        let n = log.ordinals.entry((op, session)).or_insert(0);
        let ordinal = *n;
        *n += 1;
        ordinal
    }

    fn delay_of(&self, op: Operation, session: usize) -> Duration {
        self.delays
            .iter()
            .filter(|d| d.op == op && d.sessions.as_ref().map_or(true, |s| s.contains(&session)))
            .map(|d| d.delay)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    fn fault_of(&self, op: Operation, session: usize, ordinal: u32) -> Option<Fault> {
        self.faults
            .iter()
            .find(|f| f.op == op && f.sessions.contains(&session) && ordinal >= f.from_call)
            .map(|f| f.fault)
    }

    /// Common path of every call: count, wait, decide, log.
    async fn answer(&self, op: Operation, session: usize) -> Result<u32, ClientError> {
        let started = Instant::now();
        let ordinal = self.next_ordinal(op, session);

        let delay = self.delay_of(op, session);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match self.fault_of(op, session, ordinal) {
            None => Ok(ordinal),
            Some(Fault::Reject(status)) => Err(ClientError::Status {
                status,
                detail: format!("scripted rejection of {op}"),
            }),
            Some(Fault::Disconnect) => Err(ClientError::Transport("connection reset by peer".to_string())),
        };

        self.lock().calls.push(CallRecord {
            op,
            session,
            started,
            finished: Instant::now(),
        });
        result
    }
}

#[async_trait]
impl GameClient for ScriptedClient {
    async fn register(&self, label: &str, _signup_secret: &str) -> Result<Credentials, ClientError> {
        self.answer(Operation::Register, self.index_of(label)).await?;
        Ok(Credentials {
            username: label.to_string(),
            password: format!("pw-{label}"),
        })
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthToken, ClientError> {
        self.answer(Operation::Authenticate, self.index_of(&credentials.username))
            .await?;
        Ok(AuthToken::new(format!("{TOKEN_PREFIX}{}", credentials.username)))
    }

    async fn acquire_or_fetch_match(&self, token: &AuthToken) -> Result<MatchState, ClientError> {
        let session = self.index_of_token(token);
        self.answer(Operation::FetchMatch, session).await?;

        let submitted = self.lock().submitted.iter().filter(|(s, _)| *s == session).count();
        let legal_moves = if self.stuck.contains(&session) {
            Vec::new()
        } else {
            self.legal_moves.clone()
        };
        Ok(MatchState {
            match_id: MatchId::new(format!("game-{}", session / 2)),
            move_number: submitted as u32,
            legal_moves,
        })
    }

    async fn submit_move(
        &self,
        token: &AuthToken,
        _match_id: &MatchId,
        _move_number: u32,
        mv: &Move,
    ) -> Result<(), ClientError> {
        let session = self.index_of_token(token);
        self.answer(Operation::SubmitMove, session).await?;
        self.lock().submitted.push((session, mv.clone()));
        Ok(())
    }
}
