//! Move selection — pick a random legal move from a match snapshot.
//!
//! Uniform over origin squares first, then uniform over that square's
//! destinations. Origins with no destinations are never picked.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::game::{LegalMoves, Move};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    #[error("invalid input: no selectable move among {0} origin squares")]
    InvalidInput(usize),
}

/// True if at least one origin square has a destination.
///
/// Callers check this before [`select_move`]; an empty result is the
/// "no legal moves" end of a game, not a fault.
pub fn has_playable_move(legal: &[LegalMoves]) -> bool {
    legal.iter().any(|lm| !lm.end_squares.is_empty())
}

pub fn select_move<R: Rng + ?Sized>(legal: &[LegalMoves], rng: &mut R) -> Result<Move, SelectError> {
    let playable: Vec<&LegalMoves> = legal
        .iter()
        .filter(|lm| !lm.end_squares.is_empty())
        .collect();

    let choice = playable
        .choose(rng)
        .ok_or(SelectError::InvalidInput(legal.len()))?;
    let end = choice
        .end_squares
        .choose(rng)
        .ok_or(SelectError::InvalidInput(legal.len()))?;

    Ok(Move {
        start: choice.start_square.clone(),
        end: end.clone(),
    })
}
