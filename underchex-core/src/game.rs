//! Game state and move application

use crate::board::Hex;
use crate::movegen::{
    all_legal_moves, apply_move, has_legal_move, is_in_check, legal_moves, validate_move,
    IllegalReason, Move, MoveValidation,
};
use crate::pieces::{is_promotion_zone, Color, LanceVariant, Piece, PieceType};
use crate::position::Position;
use serde::{Deserialize, Serialize};

// ============================================================================
// STARTING POSITION
// ============================================================================

/// White's half of the standard setup; Black is its point reflection
const WHITE_SETUP: [(i8, i8, PieceType, Option<LanceVariant>); 14] = [
    (0, 4, PieceType::King, None),
    (1, 3, PieceType::Queen, None),
    (-2, 4, PieceType::Chariot, None),
    (-1, 3, PieceType::Chariot, None),
    (-1, 4, PieceType::Lance, Some(LanceVariant::A)),
    (0, 3, PieceType::Lance, Some(LanceVariant::B)),
    (-2, 3, PieceType::Knight, None),
    (-3, 4, PieceType::Knight, None),
    (-3, 3, PieceType::Pawn, None),
    (-2, 2, PieceType::Pawn, None),
    (-1, 2, PieceType::Pawn, None),
    (0, 2, PieceType::Pawn, None),
    (1, 2, PieceType::Pawn, None),
    (2, 2, PieceType::Pawn, None),
];

/// The standard 28-piece starting position
pub fn starting_position() -> Position {
    let mut white = Position::empty();
    for (q, r, piece_type, variant) in WHITE_SETUP {
        let piece = match variant {
            Some(v) => Piece::lance(Color::White, v),
            None => Piece::new(piece_type, Color::White),
        };
        if let Some(index) = Hex::new(q, r).index() {
            white.set_index(index, Some(piece));
        }
    }
    let mut pos = white.color_swapped();
    for (hex, piece) in white.pieces() {
        if let Some(index) = hex.index() {
            pos.set_index(index, Some(piece));
        }
    }
    pos
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// Game status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GameStatus {
    Ongoing,
    Checkmate { winner: Color },
    Stalemate,
    Resigned { winner: Color },
}

impl GameStatus {
    pub fn is_ongoing(&self) -> bool {
        matches!(self, GameStatus::Ongoing)
    }

    pub fn winner(&self) -> Option<Color> {
        match self {
            GameStatus::Checkmate { winner } | GameStatus::Resigned { winner } => Some(*winner),
            GameStatus::Ongoing | GameStatus::Stalemate => None,
        }
    }
}

/// Why [`GameState::make_move`] refused a move
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    #[error("the game is over")]
    GameOver,
    #[error("illegal move: {0}")]
    Illegal(IllegalReason),
    #[error("invalid promotion choice")]
    InvalidPromotion,
}

/// Full game state
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameState {
    pub position: Position,
    pub turn: Color,
    pub move_number: u32,
    pub half_move_clock: u32,
    pub history: Vec<Move>,
    pub status: GameStatus,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// New game from the standard setup, White to move
    pub fn new() -> Self {
        Self::from_position(starting_position(), Color::White)
    }

    /// Game from an arbitrary position; status is computed immediately
    pub fn from_position(position: Position, turn: Color) -> Self {
        let status = determine_status(&position, turn);
        Self {
            position,
            turn,
            move_number: 1,
            half_move_clock: 0,
            history: Vec::new(),
            status,
        }
    }

    /// Play `from -> to`. A pawn reaching its last row promotes to a queen
    /// unless `promotion` says otherwise.
    pub fn make_move(
        &self,
        from: Hex,
        to: Hex,
        promotion: Option<PieceType>,
    ) -> Result<GameState, MoveRejection> {
        if !self.status.is_ongoing() {
            return Err(MoveRejection::GameOver);
        }
        if let MoveValidation::Illegal(reason) = validate_move(&self.position, from, to, self.turn) {
            return Err(MoveRejection::Illegal(reason));
        }
        let piece = self
            .position
            .get(from)
            .ok_or(MoveRejection::Illegal(IllegalReason::NoPieceAtSource))?;

        let promotes = piece.piece_type == PieceType::Pawn && is_promotion_zone(to, piece.color);
        let promotion = match (promotes, promotion) {
            (true, choice) => Some(choice.unwrap_or(PieceType::Queen)),
            (false, None) => None,
            (false, Some(_)) => return Err(MoveRejection::InvalidPromotion),
        };

        let mv = legal_moves(&self.position, piece, from)
            .into_iter()
            .find(|m| m.to == to && m.promotion == promotion)
            .ok_or(MoveRejection::InvalidPromotion)?;
        Ok(self.advance(mv))
    }

    /// Play a move produced by the generator
    pub fn apply(&self, mv: &Move) -> Result<GameState, MoveRejection> {
        if !self.status.is_ongoing() {
            return Err(MoveRejection::GameOver);
        }
        match all_legal_moves(&self.position, self.turn)
            .into_iter()
            .find(|m| m.same_action(mv))
        {
            Some(legal) => Ok(self.advance(legal)),
            None => match validate_move(&self.position, mv.from, mv.to, self.turn) {
                MoveValidation::Illegal(reason) => Err(MoveRejection::Illegal(reason)),
                MoveValidation::Legal { .. } => Err(MoveRejection::InvalidPromotion),
            },
        }
    }

    fn advance(&self, mv: Move) -> GameState {
        let position = apply_move(&self.position, &mv);
        let next_turn = self.turn.opposite();
        let status = determine_status(&position, next_turn);

        let half_move_clock = if mv.piece.piece_type == PieceType::Pawn || mv.is_capture() {
            0
        } else {
            self.half_move_clock + 1
        };
        let move_number = match self.turn {
            Color::Black => self.move_number + 1,
            Color::White => self.move_number,
        };

        let mut history = self.history.clone();
        history.push(mv);

        GameState {
            position,
            turn: next_turn,
            move_number,
            half_move_clock,
            history,
            status,
        }
    }

    /// `color` gives up; the opponent wins
    pub fn resign(&self, color: Color) -> GameState {
        GameState {
            status: GameStatus::Resigned {
                winner: color.opposite(),
            },
            ..self.clone()
        }
    }

    /// Legal moves for the side to move; empty once the game is over
    pub fn legal_moves(&self) -> Vec<Move> {
        if !self.status.is_ongoing() {
            return Vec::new();
        }
        all_legal_moves(&self.position, self.turn)
    }

    pub fn is_in_check(&self) -> bool {
        is_in_check(&self.position, self.turn)
    }

    pub fn is_player_turn(&self, color: Color) -> bool {
        self.status.is_ongoing() && self.turn == color
    }

    pub fn is_over(&self) -> bool {
        !self.status.is_ongoing()
    }
}

fn determine_status(position: &Position, to_move: Color) -> GameStatus {
    if has_legal_move(position, to_move) {
        GameStatus::Ongoing
    } else if is_in_check(position, to_move) {
        GameStatus::Checkmate {
            winner: to_move.opposite(),
        }
    } else {
        GameStatus::Stalemate
    }
}

// ============================================================================
// TESTS
// ============================================================================
