//! Pawn race — the rules the stand-in service enforces.
//!
//! Each side has eight pawns on its home rank. A pawn moves one square
//! forward onto an empty square, or two from its home rank when both squares
//! are empty. There are no captures, so every file eventually locks up and the
//! game ends with no legal moves for either side, which is exactly the
//! situation load sessions have to cope with.

use std::fmt;

const FILES: &[u8; 8] = b"abcdefgh";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    fn forward(self) -> i8 {
        match self {
            Side::White => 1,
            Side::Black => -1,
        }
    }

    fn home_rank(self) -> i8 {
        match self {
            Side::White => 2,
            Side::Black => 7,
        }
    }
}

/// A square as (file 0..8, rank 1..=8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square {
    file: usize,
    rank: i8,
}

impl Square {
    fn new(file: usize, rank: i8) -> Option<Self> {
        (file < 8 && (1..=8).contains(&rank)).then_some(Self { file, rank })
    }

    pub fn parse(s: &str) -> Option<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let file = FILES.iter().position(|f| *f == bytes[0])?;
        let rank = (bytes[1] as char).to_digit(10)? as i8;
        Self::new(file, rank)
    }

    fn step(self, by: i8) -> Option<Self> {
        Self::new(self.file, self.rank + by)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", FILES[self.file] as char, self.rank)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// `cells[file][rank - 1]`
    cells: [[Option<Side>; 8]; 8],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        let mut cells = [[None; 8]; 8];
        for file in cells.iter_mut() {
            file[(Side::White.home_rank() - 1) as usize] = Some(Side::White);
            file[(Side::Black.home_rank() - 1) as usize] = Some(Side::Black);
        }
        Self { cells }
    }

    fn at(&self, sq: Square) -> Option<Side> {
        self.cells[sq.file][(sq.rank - 1) as usize]
    }

    fn set(&mut self, sq: Square, side: Option<Side>) {
        self.cells[sq.file][(sq.rank - 1) as usize] = side;
    }

    fn targets(&self, side: Side, from: Square) -> Vec<Square> {
        let mut out = Vec::with_capacity(2);
        let Some(one) = from.step(side.forward()).filter(|s| self.at(*s).is_none()) else {
            return out;
        };
        out.push(one);
        if from.rank == side.home_rank() {
            if let Some(two) = one.step(side.forward()).filter(|s| self.at(*s).is_none()) {
                out.push(two);
            }
        }
        out
    }

    /// Movable pawns of `side` with their destinations, files a to h.
    /// Blocked pawns are left out.
    pub fn legal_moves(&self, side: Side) -> Vec<(Square, Vec<Square>)> {
        let mut out = Vec::new();
        for file in 0..8 {
            for rank in 1..=8 {
                let Some(sq) = Square::new(file, rank) else { continue };
                if self.at(sq) != Some(side) {
                    continue;
                }
                let targets = self.targets(side, sq);
                if !targets.is_empty() {
                    out.push((sq, targets));
                }
            }
        }
        out
    }

    /// Move a pawn of `side`; `false` if the move is not legal.
    pub fn apply(&mut self, side: Side, from: Square, to: Square) -> bool {
        if self.at(from) != Some(side) || !self.targets(side, from).contains(&to) {
            return false;
        }
        self.set(from, None);
        self.set(to, Some(side));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(s: &str) -> Square {
        Square::parse(s).unwrap()
    }

    #[test]
    fn opening_offers_single_and_double_steps() {
        let board = Board::new();
        let white = board.legal_moves(Side::White);
        assert_eq!(white.len(), 8);
        assert_eq!(white[4].0, sq("e2"));
        assert_eq!(white[4].1, vec![sq("e3"), sq("e4")]);

        let black = board.legal_moves(Side::Black);
        assert_eq!(black[0].0, sq("a7"));
        assert_eq!(black[0].1, vec![sq("a6"), sq("a5")]);
    }

    #[test]
    fn squares_parse_and_print() {
        assert_eq!(sq("h8").to_string(), "h8");
        assert!(Square::parse("i1").is_none());
        assert!(Square::parse("a9").is_none());
        assert!(Square::parse("a").is_none());
    }

    #[test]
    fn blocked_pawn_has_no_moves() {
        let mut board = Board::new();
        assert!(board.apply(Side::White, sq("e2"), sq("e4")));
        assert!(board.apply(Side::Black, sq("e7"), sq("e5")));
        assert!(!board.legal_moves(Side::White).iter().any(|(from, _)| *from == sq("e4")));
        assert!(!board.apply(Side::White, sq("e4"), sq("e5")));
    }

    #[test]
    fn wrong_side_or_shape_is_refused() {
        let mut board = Board::new();
        assert!(!board.apply(Side::Black, sq("e2"), sq("e3")));
        assert!(!board.apply(Side::White, sq("e2"), sq("e5")));
        assert!(!board.apply(Side::White, sq("e3"), sq("e4")));
    }

    #[test]
    fn every_game_runs_dry() {
        let mut board = Board::new();
        let mut side = Side::White;
        let mut plies = 0;
        while let Some((from, to)) = board
            .legal_moves(side)
            .first()
            .map(|(from, ends)| (*from, ends[0]))
        {
            assert!(board.apply(side, from, to));
            plies += 1;
            side = if side == Side::White { Side::Black } else { Side::White };
        }
        assert!(plies <= 32);
        assert!(board.legal_moves(side).is_empty());
    }
}
