//! Piece type definitions and movement rules

use crate::board::{Direction, Hex, BOARD_RADIUS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Player color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub fn opposite(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Direction pawns of this color advance in
    pub fn forward(self) -> Direction {
        match self {
            Color::White => Direction::N,
            Color::Black => Direction::S,
        }
    }

    /// Row a pawn of this color promotes on
    pub fn promotion_row(self) -> i8 {
        match self {
            Color::White => -BOARD_RADIUS,
            Color::Black => BOARD_RADIUS,
        }
    }

    /// Single-letter tag used in position keys
    pub fn tag(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Piece kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceType {
    Pawn,
    King,
    Queen,
    Knight,
    Lance,
    Chariot,
}

/// How a piece travels along its directions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveType {
    /// One cell in each allowed direction
    Step,
    /// Any distance, stopped by the first occupied cell
    Slide,
    /// Fixed leap offsets, never blocked
    Leap,
    /// Forward step, forward-arc captures, promotion
    Pawn,
}

/// Pieces a pawn may promote to
pub const PROMOTION_TARGETS: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Chariot,
    PieceType::Lance,
    PieceType::Knight,
];

const ALL_DIRS: &[Direction] = &Direction::ALL;
const DIAGONAL_DIRS: &[Direction] = &[Direction::NE, Direction::NW, Direction::SE, Direction::SW];
const LANCE_A_DIRS: &[Direction] = &[Direction::N, Direction::S, Direction::NW, Direction::SE];
const LANCE_B_DIRS: &[Direction] = &[Direction::N, Direction::S, Direction::NE, Direction::SW];
const WHITE_PAWN_CAPTURES: &[Direction] = &[Direction::N, Direction::NE, Direction::NW];
const BLACK_PAWN_CAPTURES: &[Direction] = &[Direction::S, Direction::SE, Direction::SW];

impl PieceType {
    pub const ALL: [PieceType; 6] = [
        PieceType::Pawn,
        PieceType::King,
        PieceType::Queen,
        PieceType::Knight,
        PieceType::Lance,
        PieceType::Chariot,
    ];

    pub fn move_type(self) -> MoveType {
        match self {
            PieceType::Pawn => MoveType::Pawn,
            PieceType::King => MoveType::Step,
            PieceType::Knight => MoveType::Leap,
            PieceType::Queen | PieceType::Lance | PieceType::Chariot => MoveType::Slide,
        }
    }

    /// Base material value in centipawns
    pub fn value(self) -> i32 {
        match self {
            PieceType::Pawn => 100,
            PieceType::Knight => 300,
            PieceType::Lance => 450,
            PieceType::Chariot => 450,
            PieceType::Queen => 900,
            PieceType::King => 0,
        }
    }

    /// Upper-case letter used in tablebase names
    pub fn abbrev(self) -> char {
        match self {
            PieceType::Pawn => 'P',
            PieceType::King => 'K',
            PieceType::Queen => 'Q',
            PieceType::Knight => 'N',
            PieceType::Lance => 'L',
            PieceType::Chariot => 'C',
        }
    }

    pub fn from_abbrev(c: char) -> Option<PieceType> {
        PieceType::ALL
            .iter()
            .copied()
            .find(|pt| pt.abbrev() == c.to_ascii_uppercase())
    }

    /// Lower-case tag used in position keys
    pub fn tag(self) -> char {
        self.abbrev().to_ascii_lowercase()
    }

    pub fn is_promotion_target(self) -> bool {
        PROMOTION_TARGETS.contains(&self)
    }
}

impl fmt::Display for PieceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PieceType::Pawn => "pawn",
            PieceType::King => "king",
            PieceType::Queen => "queen",
            PieceType::Knight => "knight",
            PieceType::Lance => "lance",
            PieceType::Chariot => "chariot",
        };
        f.write_str(name)
    }
}

/// Lance direction set selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LanceVariant {
    A,
    B,
}

/// A piece on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
    /// Only meaningful for lances
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<LanceVariant>,
}

/// Number of distinct (type, color, variant) combinations
pub const NUM_PIECE_KINDS: usize = 14;

impl Piece {
    /// New piece; lances default to variant A
    pub fn new(piece_type: PieceType, color: Color) -> Self {
        let variant = (piece_type == PieceType::Lance).then_some(LanceVariant::A);
        Self {
            piece_type,
            color,
            variant,
        }
    }

    pub fn lance(color: Color, variant: LanceVariant) -> Self {
        Self {
            piece_type: PieceType::Lance,
            color,
            variant: Some(variant),
        }
    }

    pub fn is_king(&self) -> bool {
        self.piece_type == PieceType::King
    }

    pub fn is_slider(&self) -> bool {
        self.piece_type.move_type() == MoveType::Slide
    }

    /// Step or slide directions; empty for knights and pawns
    pub fn directions(&self) -> &'static [Direction] {
        match self.piece_type {
            PieceType::King | PieceType::Queen => ALL_DIRS,
            PieceType::Chariot => DIAGONAL_DIRS,
            PieceType::Lance => match self.variant {
                Some(LanceVariant::B) => LANCE_B_DIRS,
                Some(LanceVariant::A) | None => LANCE_A_DIRS,
            },
            PieceType::Knight | PieceType::Pawn => &[],
        }
    }

    /// Directions a pawn of this piece's color captures in
    pub fn pawn_capture_directions(color: Color) -> &'static [Direction] {
        match color {
            Color::White => WHITE_PAWN_CAPTURES,
            Color::Black => BLACK_PAWN_CAPTURES,
        }
    }

    /// Dense index in `0..NUM_PIECE_KINDS` (lance variants are distinct)
    pub fn kind_index(&self) -> usize {
        let kind = match (self.piece_type, self.variant) {
            (PieceType::Pawn, _) => 0,
            (PieceType::King, _) => 1,
            (PieceType::Queen, _) => 2,
            (PieceType::Knight, _) => 3,
            (PieceType::Chariot, _) => 4,
            (PieceType::Lance, Some(LanceVariant::B)) => 6,
            (PieceType::Lance, _) => 5,
        };
        kind * 2 + self.color as usize
    }

    /// Key fragment such as `wq` or `blA`
    pub fn tag(&self) -> String {
        let variant = match (self.piece_type, self.variant) {
            (PieceType::Lance, Some(LanceVariant::B)) => "B",
            (PieceType::Lance, _) => "A",
            _ => "",
        };
        format!("{}{}{}", self.color.tag(), self.piece_type.tag(), variant)
    }

    /// Same piece with the other color
    pub fn recolored(&self) -> Piece {
        Piece {
            color: self.color.opposite(),
            ..*self
        }
    }
}

/// Whether `hex` is on the far row for a pawn of `color`
pub fn is_promotion_zone(hex: Hex, color: Color) -> bool {
    hex.r == color.promotion_row()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_values() {
        assert_eq!(PieceType::Pawn.value(), 100);
        assert_eq!(PieceType::Queen.value(), 900);
        assert_eq!(PieceType::King.value(), 0);
        assert_eq!(PieceType::Lance.value(), PieceType::Chariot.value());
    }

    #[test]
    fn test_abbrev_lookup() {
        for pt in PieceType::ALL {
            assert_eq!(PieceType::from_abbrev(pt.abbrev()), Some(pt));
        }
        assert_eq!(PieceType::from_abbrev('q'), Some(PieceType::Queen));
        assert_eq!(PieceType::from_abbrev('X'), None);
    }

    #[test]
    fn test_lance_defaults_to_variant_a() {
        let lance = Piece::new(PieceType::Lance, Color::White);
        assert_eq!(lance.variant, Some(LanceVariant::A));
        assert_eq!(Piece::new(PieceType::Queen, Color::White).variant, None);
    }

    #[test]
    fn test_lance_variants_mirror() {
        let a = Piece::lance(Color::White, LanceVariant::A);
        let b = Piece::lance(Color::White, LanceVariant::B);
        assert!(a.directions().contains(&Direction::NW));
        assert!(!a.directions().contains(&Direction::NE));
        assert!(b.directions().contains(&Direction::NE));
        assert!(!b.directions().contains(&Direction::NW));
    }

    #[test]
    fn test_kind_index_is_dense() {
        let mut seen = [false; NUM_PIECE_KINDS];
        for color in [Color::White, Color::Black] {
            for pt in PieceType::ALL {
                let pieces = if pt == PieceType::Lance {
                    vec![Piece::lance(color, LanceVariant::A), Piece::lance(color, LanceVariant::B)]
                } else {
                    vec![Piece::new(pt, color)]
                };
                for piece in pieces {
                    let idx = piece.kind_index();
                    assert!(!seen[idx], "duplicate kind index {}", idx);
                    seen[idx] = true;
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_piece_tags() {
        assert_eq!(Piece::new(PieceType::Queen, Color::White).tag(), "wq");
        assert_eq!(Piece::new(PieceType::Knight, Color::Black).tag(), "bn");
        assert_eq!(Piece::lance(Color::Black, LanceVariant::B).tag(), "blB");
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PieceType::Chariot).unwrap();
        assert_eq!(json, "\"chariot\"");
        let color: Color = serde_json::from_str("\"black\"").unwrap();
        assert_eq!(color, Color::Black);
    }
}
