//! Session — one simulated player across the whole run.
//!
//! A session moves strictly forward through
//! `Created → Registered → Authenticated → Matched → Playing → Finished`,
//! and can drop into the absorbing `Failed` state from any non-terminal
//! state. Only the task currently running a phase step for the session
//! touches it; sessions are moved into that task and handed back afterwards.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use serde::Serialize;

use swarm_core::game::{AuthToken, Credentials, MatchId};
use swarm_core::telemetry::average_response_time;
use swarm_core::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    Created,
    Registered,
    Authenticated,
    Matched,
    Playing,
    Finished,
    Failed,
}

impl SessionState {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Created => "Created",
            SessionState::Registered => "Registered",
            SessionState::Authenticated => "Authenticated",
            SessionState::Matched => "Matched",
            SessionState::Playing => "Playing",
            SessionState::Finished => "Finished",
            SessionState::Failed => "Failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Finished | SessionState::Failed)
    }

    /// The only forward successor, if any.
    pub fn next(self) -> Option<SessionState> {
        match self {
            SessionState::Created => Some(SessionState::Registered),
            SessionState::Registered => Some(SessionState::Authenticated),
            SessionState::Authenticated => Some(SessionState::Matched),
            SessionState::Matched => Some(SessionState::Playing),
            SessionState::Playing => Some(SessionState::Finished),
            SessionState::Finished | SessionState::Failed => None,
        }
    }

    pub fn can_transition(self, to: SessionState) -> bool {
        match to {
            SessionState::Failed => !self.is_terminal(),
            _ => self.next() == Some(to),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Session {
    index: usize,
    label: String,
    state: SessionState,
    /// Every state entered, starting with `Created`.
    trail: Vec<SessionState>,
    credentials: Option<Credentials>,
    token: Option<AuthToken>,
    match_id: Option<MatchId>,
    moves_succeeded: u32,
    moves_failed: u32,
    response_total: Duration,
    failure: Option<LoadError>,
    rng: StdRng,
}

impl Session {
    pub fn new(index: usize, label: impl Into<String>, rng: StdRng) -> Self {
        Self {
            index,
            label: label.into(),
            state: SessionState::Created,
            trail: vec![SessionState::Created],
            credentials: None,
            token: None,
            match_id: None,
            moves_succeeded: 0,
            moves_failed: 0,
            response_total: Duration::ZERO,
            failure: None,
            rng,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn trail(&self) -> &[SessionState] {
        &self.trail
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn token(&self) -> Option<&AuthToken> {
        self.token.as_ref()
    }

    pub fn match_id(&self) -> Option<&MatchId> {
        self.match_id.as_ref()
    }

    pub fn moves_succeeded(&self) -> u32 {
        self.moves_succeeded
    }

    pub fn moves_failed(&self) -> u32 {
        self.moves_failed
    }

    pub fn response_total(&self) -> Duration {
        self.response_total
    }

    pub fn average_response(&self) -> Duration {
        average_response_time(self.response_total, self.moves_succeeded, self.moves_failed)
    }

    /// Why the session failed, once it has.
    pub fn failure(&self) -> Option<&LoadError> {
        self.failure.as_ref()
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    pub fn check_transition(&self, to: SessionState) -> Result<(), LoadError> {
        if self.state.can_transition(to) {
            Ok(())
        } else {
            Err(LoadError::IllegalTransition {
                from: self.state.as_str(),
                to: to.as_str(),
            })
        }
    }

    pub fn transition(&mut self, to: SessionState) -> Result<(), LoadError> {
        self.check_transition(to)?;
        self.state = to;
        self.trail.push(to);
        Ok(())
    }

    pub fn registered(&mut self, credentials: Credentials) -> Result<(), LoadError> {
        self.transition(SessionState::Registered)?;
        self.credentials = Some(credentials);
        Ok(())
    }

    pub fn authenticated(&mut self, token: AuthToken) -> Result<(), LoadError> {
        self.transition(SessionState::Authenticated)?;
        self.token = Some(token);
        Ok(())
    }

    pub fn matched(&mut self, match_id: MatchId) -> Result<(), LoadError> {
        self.transition(SessionState::Matched)?;
        self.match_id = Some(match_id);
        Ok(())
    }

    /// Record the match id from a later fetch; the service may move us to a new game.
    pub fn refresh_match(&mut self, match_id: MatchId) {
        self.match_id = Some(match_id);
    }

    /// Enter `Failed`. No-op on a terminal session.
    pub fn fail(&mut self, reason: LoadError) {
        if self.transition(SessionState::Failed).is_ok() {
            self.failure = Some(reason);
        }
    }

    // ── Counters ─────────────────────────────────────────────────────────────

    pub fn record_move(&mut self, succeeded: bool) {
        if succeeded {
            self.moves_succeeded = self.moves_succeeded.saturating_add(1);
        } else {
            self.moves_failed = self.moves_failed.saturating_add(1);
        }
    }

    pub fn add_response_time(&mut self, elapsed: Duration) {
        self.response_total = self.response_total.saturating_add(elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use swarm_core::game::Operation;

    fn session() -> Session {
        Session::new(0, "bot_user_0_1234", StdRng::seed_from_u64(0))
    }

    fn creds() -> Credentials {
        Credentials {
            username: "bot_user_0_1234".into(),
            password: "pw".into(),
        }
    }

    #[test]
    fn full_lifecycle_visits_every_state_in_order() {
        let mut s = session();
        s.registered(creds()).unwrap();
        s.authenticated(AuthToken::new("t")).unwrap();
        s.matched(MatchId::new("1")).unwrap();
        s.transition(SessionState::Playing).unwrap();
        s.transition(SessionState::Finished).unwrap();

        assert_eq!(
            s.trail(),
            &[
                SessionState::Created,
                SessionState::Registered,
                SessionState::Authenticated,
                SessionState::Matched,
                SessionState::Playing,
                SessionState::Finished,
            ]
        );
    }

    #[test]
    fn skipping_a_state_is_rejected() {
        let mut s = session();
        let err = s.authenticated(AuthToken::new("t")).unwrap_err();
        assert_eq!(
            err,
            LoadError::IllegalTransition {
                from: "Created",
                to: "Authenticated",
            }
        );
        assert_eq!(s.state(), SessionState::Created);
        assert!(s.token().is_none());
    }

    #[test]
    fn every_non_terminal_state_can_fail() {
        let states = [
            SessionState::Created,
            SessionState::Registered,
            SessionState::Authenticated,
            SessionState::Matched,
            SessionState::Playing,
        ];
        for from in states {
            assert!(from.can_transition(SessionState::Failed), "{from} -> Failed");
        }
        assert!(!SessionState::Finished.can_transition(SessionState::Failed));
        assert!(!SessionState::Failed.can_transition(SessionState::Failed));
        assert!(!SessionState::Failed.can_transition(SessionState::Registered));
    }

    #[test]
    fn failed_is_absorbing() {
        let mut s = session();
        s.registered(creds()).unwrap();
        s.fail(LoadError::Rejected {
            op: Operation::Authenticate,
            status: 401,
            detail: "nope".into(),
        });
        assert_eq!(s.state(), SessionState::Failed);
        assert!(s.authenticated(AuthToken::new("t")).is_err());

        // A second failure does not overwrite the first reason.
        s.fail(LoadError::InvalidInput("later".into()));
        assert_eq!(s.failure().unwrap().kind(), "rejected");
        assert_eq!(s.trail().last(), Some(&SessionState::Failed));
    }

    #[test]
    fn average_response_uses_attempt_count() {
        let mut s = session();
        assert_eq!(s.average_response(), Duration::ZERO);

        s.add_response_time(Duration::from_millis(400));
        // No attempts yet: divide by one.
        assert_eq!(s.average_response(), Duration::from_millis(400));

        s.record_move(true);
        s.record_move(false);
        assert_eq!(s.moves_succeeded(), 1);
        assert_eq!(s.moves_failed(), 1);
        assert_eq!(s.average_response(), Duration::from_millis(200));
    }
}
