//! Move generation, attack detection and move validation

use crate::board::{Direction, Hex, KNIGHT_OFFSETS};
use crate::pieces::{is_promotion_zone, Color, MoveType, Piece, PieceType, PROMOTION_TARGETS};
use crate::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// MOVES
// ============================================================================

/// A single move, with the captured piece recorded for convenience
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Hex,
    pub to: Hex,
    pub piece: Piece,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<Piece>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    pub fn is_tactical(&self) -> bool {
        self.is_capture() || self.is_promotion()
    }

    /// Same origin, destination and promotion choice
    pub fn same_action(&self, other: &Move) -> bool {
        self.from == other.from && self.to == other.to && self.promotion == other.promotion
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)?;
        if let Some(promo) = self.promotion {
            write!(f, "={}", promo.abbrev())?;
        }
        Ok(())
    }
}

// ============================================================================
// PSEUDO-LEGAL GENERATION
// ============================================================================

/// Moves for `piece` standing on `from`, ignoring whether the mover is left in check
pub fn pseudo_legal_moves(pos: &Position, piece: Piece, from: Hex) -> Vec<Move> {
    let mut moves = Vec::new();
    match piece.piece_type.move_type() {
        MoveType::Step => {
            for &dir in piece.directions() {
                if let Some(to) = from.neighbor(dir) {
                    push_if_enterable(pos, piece, from, to, &mut moves);
                }
            }
        }
        MoveType::Slide => {
            for &dir in piece.directions() {
                for to in from.ray(dir) {
                    match pos.get(to) {
                        None => moves.push(quiet(piece, from, to)),
                        Some(other) => {
                            if other.color != piece.color {
                                moves.push(capture(piece, from, to, other));
                            }
                            break;
                        }
                    }
                }
            }
        }
        MoveType::Leap => {
            for to in from.knight_targets() {
                push_if_enterable(pos, piece, from, to, &mut moves);
            }
        }
        MoveType::Pawn => pawn_moves(pos, piece, from, &mut moves),
    }
    moves
}

fn quiet(piece: Piece, from: Hex, to: Hex) -> Move {
    Move {
        from,
        to,
        piece,
        captured: None,
        promotion: None,
    }
}

fn capture(piece: Piece, from: Hex, to: Hex, victim: Piece) -> Move {
    Move {
        captured: Some(victim),
        ..quiet(piece, from, to)
    }
}

fn push_if_enterable(pos: &Position, piece: Piece, from: Hex, to: Hex, moves: &mut Vec<Move>) {
    match pos.get(to) {
        None => moves.push(quiet(piece, from, to)),
        Some(other) if other.color != piece.color => moves.push(capture(piece, from, to, other)),
        Some(_) => {}
    }
}

fn pawn_moves(pos: &Position, piece: Piece, from: Hex, moves: &mut Vec<Move>) {
    let mut push = |mv: Move| {
        if is_promotion_zone(mv.to, piece.color) {
            for promo in PROMOTION_TARGETS {
                moves.push(Move {
                    promotion: Some(promo),
                    ..mv
                });
            }
        } else {
            moves.push(mv);
        }
    };

    if let Some(to) = from.neighbor(piece.color.forward()) {
        if pos.is_empty_at(to) {
            push(quiet(piece, from, to));
        }
    }

    for &dir in Piece::pawn_capture_directions(piece.color) {
        if let Some(to) = from.neighbor(dir) {
            if let Some(victim) = pos.get(to) {
                if victim.color != piece.color {
                    push(capture(piece, from, to, victim));
                }
            }
        }
    }
}

// ============================================================================
// ATTACK DETECTION
// ============================================================================

/// Whether any piece of color `by` attacks `target`
pub fn is_attacked(pos: &Position, target: Hex, by: Color) -> bool {
    let is_by = |hex: Option<Hex>, piece_type: PieceType| {
        hex.and_then(|h| pos.get(h))
            .is_some_and(|p| p.color == by && p.piece_type == piece_type)
    };

    // A pawn attacks forward-arc cells, so look back along each capture direction
    let pawn_attack = Piece::pawn_capture_directions(by)
        .iter()
        .any(|dir| is_by(target.neighbor(dir.opposite()), PieceType::Pawn));
    if pawn_attack {
        return true;
    }

    if Direction::ALL
        .iter()
        .any(|&dir| is_by(target.neighbor(dir), PieceType::King))
    {
        return true;
    }

    // Knight offsets are symmetric under negation
    let knight_attack = KNIGHT_OFFSETS.iter().any(|&(dq, dr)| {
        let from = target.offset(dq, dr);
        from.is_valid() && is_by(Some(from), PieceType::Knight)
    });
    if knight_attack {
        return true;
    }

    Direction::ALL.iter().any(|&dir| {
        let blocker = target.ray(dir).find_map(|hex| pos.get(hex));
        blocker.is_some_and(|p| {
            p.color == by && p.is_slider() && p.directions().contains(&dir.opposite())
        })
    })
}

pub fn find_king(pos: &Position, color: Color) -> Option<Hex> {
    pos.find_king(color)
}

/// Whether `color`'s king is attacked; false when that king is absent
pub fn is_in_check(pos: &Position, color: Color) -> bool {
    find_king(pos, color).is_some_and(|king| is_attacked(pos, king, color.opposite()))
}

// ============================================================================
// LEGAL GENERATION
// ============================================================================

/// Resulting position after a move; promotions place a freshly built piece
pub fn apply_move(pos: &Position, mv: &Move) -> Position {
    let mut next = pos.clone();
    let placed = match mv.promotion {
        Some(promo) => Piece::new(promo, mv.piece.color),
        None => mv.piece,
    };
    if let (Some(from), Some(to)) = (mv.from.index(), mv.to.index()) {
        next.set_index(from, None);
        next.set_index(to, Some(placed));
    }
    next
}

/// Pseudo-legal moves that do not leave the mover in check
pub fn legal_moves(pos: &Position, piece: Piece, from: Hex) -> Vec<Move> {
    pseudo_legal_moves(pos, piece, from)
        .into_iter()
        .filter(|mv| !is_in_check(&apply_move(pos, mv), piece.color))
        .collect()
}

pub fn all_legal_moves(pos: &Position, color: Color) -> Vec<Move> {
    pos.pieces_of(color)
        .flat_map(|(hex, piece)| legal_moves(pos, piece, hex))
        .collect()
}

/// Stops at the first legal move found
pub fn has_legal_move(pos: &Position, color: Color) -> bool {
    pos.pieces_of(color).any(|(hex, piece)| {
        pseudo_legal_moves(pos, piece, hex)
            .iter()
            .any(|mv| !is_in_check(&apply_move(pos, mv), color))
    })
}

/// Legal captures and promotions
pub fn tactical_moves(pos: &Position, color: Color) -> Vec<Move> {
    pos.pieces_of(color)
        .flat_map(|(hex, piece)| pseudo_legal_moves(pos, piece, hex))
        .filter(|mv| mv.is_tactical() && !is_in_check(&apply_move(pos, mv), color))
        .collect()
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Why a requested move was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IllegalReason {
    NoPieceAtSource,
    NotYourPiece,
    InvalidDestination,
    MovesIntoCheck,
    IllegalMove,
}

impl IllegalReason {
    /// Wire code as used by the conformance suite
    pub fn code(self) -> &'static str {
        match self {
            IllegalReason::NoPieceAtSource => "noPieceAtSource",
            IllegalReason::NotYourPiece => "notYourPiece",
            IllegalReason::InvalidDestination => "invalidDestination",
            IllegalReason::MovesIntoCheck => "movesIntoCheck",
            IllegalReason::IllegalMove => "illegalMove",
        }
    }
}

impl fmt::Display for IllegalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of [`validate_move`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveValidation {
    Legal { capture: bool },
    Illegal(IllegalReason),
}

impl MoveValidation {
    pub fn is_legal(&self) -> bool {
        matches!(self, MoveValidation::Legal { .. })
    }

    pub fn reason(&self) -> Option<IllegalReason> {
        match self {
            MoveValidation::Legal { .. } => None,
            MoveValidation::Illegal(reason) => Some(*reason),
        }
    }

    pub fn is_capture(&self) -> bool {
        matches!(self, MoveValidation::Legal { capture: true })
    }
}

/// Check a requested move for `turn` without applying it
pub fn validate_move(pos: &Position, from: Hex, to: Hex, turn: Color) -> MoveValidation {
    let Some(piece) = pos.get(from) else {
        return MoveValidation::Illegal(IllegalReason::NoPieceAtSource);
    };
    if piece.color != turn {
        return MoveValidation::Illegal(IllegalReason::NotYourPiece);
    }
    if !to.is_valid() {
        return MoveValidation::Illegal(IllegalReason::InvalidDestination);
    }

    let candidates: Vec<Move> = pseudo_legal_moves(pos, piece, from)
        .into_iter()
        .filter(|mv| mv.to == to)
        .collect();
    if candidates.is_empty() {
        return MoveValidation::Illegal(IllegalReason::IllegalMove);
    }

    match candidates
        .iter()
        .find(|mv| !is_in_check(&apply_move(pos, mv), turn))
    {
        Some(mv) => MoveValidation::Legal {
            capture: mv.is_capture(),
        },
        None => MoveValidation::Illegal(IllegalReason::MovesIntoCheck),
    }
}
