use crate::{GameError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire code for "no move". Never accepted as a reveal.
pub const UNSET_MOVE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Move {
    Rock = 1,
    Paper = 2,
    Scissors = 3,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse a wire code. `0` (unset) and anything above `3` are rejected.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Move::Rock),
            2 => Ok(Move::Paper),
            3 => Ok(Move::Scissors),
            other => Err(GameError::InvalidMove(other)),
        }
    }

    /// The move this one defeats.
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Scissors => Move::Paper,
            Move::Paper => Move::Rock,
        }
    }
}

impl TryFrom<u8> for Move {
    type Error = GameError;

    fn try_from(code: u8) -> Result<Self> {
        Move::from_code(code)
    }
}

impl From<Move> for u8 {
    fn from(mv: Move) -> u8 {
        mv.code()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Rock => "rock",
            Move::Paper => "paper",
            Move::Scissors => "scissors",
        };
        f.write_str(name)
    }
}

impl FromStr for Move {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rock" | "r" => Ok(Move::Rock),
            "paper" | "p" => Ok(Move::Paper),
            "scissors" | "s" => Ok(Move::Scissors),
            other => other
                .parse::<u8>()
                .map_err(|_| GameError::InvalidMove(UNSET_MOVE))
                .and_then(Move::from_code),
        }
    }
}
