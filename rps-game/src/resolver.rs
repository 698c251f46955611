use crate::moves::Move;
use serde::{Deserialize, Serialize};

/// Result of a single round, seen from the first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Draw,
    AWins,
    BWins,
}

/// Rock beats Scissors, Scissors beats Paper, Paper beats Rock.
pub fn resolve(a: Move, b: Move) -> Outcome {
    if a == b {
        Outcome::Draw
    } else if a.beats() == b {
        Outcome::AWins
    } else {
        Outcome::BWins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cyclic_dominance() {
        assert_eq!(resolve(Move::Rock, Move::Scissors), Outcome::AWins);
        assert_eq!(resolve(Move::Scissors, Move::Paper), Outcome::AWins);
        assert_eq!(resolve(Move::Paper, Move::Rock), Outcome::AWins);

        assert_eq!(resolve(Move::Scissors, Move::Rock), Outcome::BWins);
        assert_eq!(resolve(Move::Paper, Move::Scissors), Outcome::BWins);
        assert_eq!(resolve(Move::Rock, Move::Paper), Outcome::BWins);
    }

    #[test]
    fn test_equal_moves_draw() {
        for mv in Move::ALL {
            assert_eq!(resolve(mv, mv), Outcome::Draw);
        }
    }

    #[test]
    fn test_swapping_players_swaps_winner() {
        for a in Move::ALL {
            for b in Move::ALL {
                let flipped = match resolve(a, b) {
                    Outcome::Draw => Outcome::Draw,
                    Outcome::AWins => Outcome::BWins,
                    Outcome::BWins => Outcome::AWins,
                };
                assert_eq!(resolve(b, a), flipped);
            }
        }
    }
}
