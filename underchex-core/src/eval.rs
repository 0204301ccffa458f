//! Position evaluation
//!
//! Scores are integers in centipawns from White's perspective unless noted.

use crate::board::{Hex, BOARD_RADIUS};
use crate::movegen::{all_legal_moves, is_in_check};
use crate::pieces::{Color, Piece, PieceType};
use crate::position::Position;
use serde::{Deserialize, Serialize};

/// Score of a position where the side to move has been mated at the root
pub const CHECKMATE_VALUE: i32 = 100_000;

/// Score of a drawn position
pub const STALEMATE_VALUE: i32 = 0;

/// Tunable weights for the static evaluator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Bonus per ring closer to the center
    pub centrality: i32,
    /// Bonus per legal move of advantage
    pub mobility: i32,
    /// Penalty for the side in check
    pub check_penalty: i32,
    /// Pawn bonus at full progress (scaled by progress squared)
    pub pawn_advance_scale: i32,
}

impl Default for EvalWeights {
    fn default() -> Self {
        Self {
            centrality: 5,
            mobility: 2,
            check_penalty: 50,
            pawn_advance_scale: 50,
        }
    }
}

impl EvalWeights {
    pub fn centrality_bonus(&self, hex: Hex) -> i32 {
        (BOARD_RADIUS - hex.distance_to_center()) as i32 * self.centrality
    }

    /// Grows with the square of the fraction of the board the pawn has crossed
    pub fn pawn_advance_bonus(&self, hex: Hex, color: Color) -> i32 {
        let start_r = -color.promotion_row() as f64;
        let total = (2 * BOARD_RADIUS) as f64;
        let progress = (hex.r as f64 - start_r).abs() / total;
        (progress * progress * self.pawn_advance_scale as f64) as i32
    }

    /// Material plus placement value of one piece, always positive
    pub fn piece_score(&self, piece: &Piece, hex: Hex) -> i32 {
        let mut score = piece.piece_type.value() + self.centrality_bonus(hex);
        if piece.piece_type == PieceType::Pawn {
            score += self.pawn_advance_bonus(hex, piece.color);
        }
        score
    }
}

/// Material and placement only, White's perspective
pub fn evaluate_material(pos: &Position, weights: &EvalWeights) -> i32 {
    pos.pieces()
        .map(|(hex, piece)| {
            let value = weights.piece_score(&piece, hex);
            match piece.color {
                Color::White => value,
                Color::Black => -value,
            }
        })
        .sum()
}

/// Full static evaluation from White's perspective
pub fn evaluate(pos: &Position, weights: &EvalWeights) -> i32 {
    let mut score = evaluate_material(pos, weights);

    let white_mobility = all_legal_moves(pos, Color::White).len() as i32;
    let black_mobility = all_legal_moves(pos, Color::Black).len() as i32;
    score += (white_mobility - black_mobility) * weights.mobility;

    if is_in_check(pos, Color::White) {
        score -= weights.check_penalty;
    }
    if is_in_check(pos, Color::Black) {
        score += weights.check_penalty;
    }

    score
}

/// Evaluation from `color`'s perspective
pub fn evaluate_for_color(pos: &Position, color: Color, weights: &EvalWeights) -> i32 {
    let score = evaluate(pos, weights);
    match color {
        Color::White => score,
        Color::Black => -score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::starting_position;

    #[test]
    fn test_centrality_bonus() {
        let w = EvalWeights::default();
        assert_eq!(w.centrality_bonus(Hex::new(0, 0)), 20);
        assert_eq!(w.centrality_bonus(Hex::new(0, 4)), 0);
        assert_eq!(w.centrality_bonus(Hex::new(1, -1)), 15);
    }

    #[test]
    fn test_pawn_advance_bonus() {
        let w = EvalWeights::default();
        assert_eq!(w.pawn_advance_bonus(Hex::new(0, 4), Color::White), 0);
        // Halfway: 0.25 * 50
        assert_eq!(w.pawn_advance_bonus(Hex::new(0, 0), Color::White), 12);
        assert_eq!(w.pawn_advance_bonus(Hex::new(0, -4), Color::White), 50);
        assert_eq!(w.pawn_advance_bonus(Hex::new(0, 2), Color::Black), 28);
    }

    #[test]
    fn test_starting_position_balanced() {
        let w = EvalWeights::default();
        let pos = starting_position();
        assert_eq!(evaluate_material(&pos, &w), 0);
        assert_eq!(evaluate(&pos, &w), 0);
    }

    #[test]
    fn test_extra_queen_favors_owner() {
        let w = EvalWeights::default();
        let pos = Position::from_placements([
            (Hex::new(0, 4), Piece::new(PieceType::King, Color::White)),
            (Hex::new(0, -4), Piece::new(PieceType::King, Color::Black)),
            (Hex::new(-2, 1), Piece::new(PieceType::Queen, Color::White)),
        ])
        .unwrap();
        assert!(evaluate(&pos, &w) > 900);
        assert_eq!(
            evaluate_for_color(&pos, Color::Black, &w),
            -evaluate(&pos, &w)
        );
    }

    #[test]
    fn test_check_penalty() {
        let w = EvalWeights::default();
        let pos = Position::from_placements([
            (Hex::new(0, 0), Piece::new(PieceType::King, Color::White)),
            (Hex::new(0, -2), Piece::new(PieceType::Queen, Color::Black)),
        ])
        .unwrap();
        let mut no_check = w.clone();
        no_check.check_penalty = 0;
        assert_eq!(evaluate(&pos, &w), evaluate(&pos, &no_check) - 50);
    }
}
