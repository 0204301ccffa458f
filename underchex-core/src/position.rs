//! Board representation
//!
//! A [`Position`] is a flat array of 61 optional pieces indexed by
//! [`Hex::index`]. Positions are owned values; applying a move clones the
//! array rather than sharing it.

use crate::board::{all_cells, Hex, NUM_CELLS};
use crate::error::{Error, Result};
use crate::pieces::{Color, Piece, PieceType, NUM_PIECE_KINDS};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::sync::LazyLock;

/// Seed for the Zobrist key table; fixed so hashes are stable across runs
const ZOBRIST_SEED: u64 = 0x5eed_0f_bee5;

static ZOBRIST_KEYS: LazyLock<[[u64; NUM_CELLS]; NUM_PIECE_KINDS]> = LazyLock::new(|| {
    let mut rng = ChaCha8Rng::seed_from_u64(ZOBRIST_SEED);
    let mut keys = [[0u64; NUM_CELLS]; NUM_PIECE_KINDS];
    for kind in keys.iter_mut() {
        for key in kind.iter_mut() {
            *key = rng.gen();
        }
    }
    keys
});

/// Zobrist key for a piece standing on a cell index
pub fn zobrist_key(piece: &Piece, index: usize) -> u64 {
    ZOBRIST_KEYS[piece.kind_index()][index]
}

/// Piece placement on the 61-cell board
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Position {
    cells: [Option<Piece>; NUM_CELLS],
}

impl Default for Position {
    fn default() -> Self {
        Self::empty()
    }
}

impl Position {
    pub fn empty() -> Self {
        Self {
            cells: [None; NUM_CELLS],
        }
    }

    /// Build a position from (cell, piece) pairs
    pub fn from_placements<I>(placements: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Hex, Piece)>,
    {
        let mut pos = Self::empty();
        for (hex, piece) in placements {
            pos.insert(hex, piece)?;
        }
        Ok(pos)
    }

    /// Piece on `hex`; `None` for empty or off-board cells
    pub fn get(&self, hex: Hex) -> Option<Piece> {
        hex.index().and_then(|i| self.cells[i])
    }

    pub fn get_index(&self, index: usize) -> Option<Piece> {
        self.cells.get(index).copied().flatten()
    }

    pub fn is_empty_at(&self, hex: Hex) -> bool {
        self.get(hex).is_none()
    }

    /// Place a piece, returning whatever stood there before
    pub fn insert(&mut self, hex: Hex, piece: Piece) -> Result<Option<Piece>> {
        let index = hex.index().ok_or(Error::OffBoard(hex))?;
        Ok(self.cells[index].replace(piece))
    }

    pub fn remove(&mut self, hex: Hex) -> Option<Piece> {
        hex.index().and_then(|i| self.cells[i].take())
    }

    /// Place a piece by cell index; callers guarantee the index is in range
    pub(crate) fn set_index(&mut self, index: usize, piece: Option<Piece>) {
        self.cells[index] = piece;
    }

    /// All occupied cells in index order
    pub fn pieces(&self) -> impl Iterator<Item = (Hex, Piece)> + '_ {
        all_cells()
            .iter()
            .zip(self.cells.iter())
            .filter_map(|(&hex, piece)| piece.map(|p| (hex, p)))
    }

    /// Occupied cells of one color
    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Hex, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn find_king(&self, color: Color) -> Option<Hex> {
        self.pieces_of(color)
            .find(|(_, p)| p.piece_type == PieceType::King)
            .map(|(hex, _)| hex)
    }

    /// Order-independent string key, e.g. `"0,-4:bk,0,0:wk,2,0:wq"`
    pub fn canonical_key(&self) -> String {
        let mut parts: Vec<String> = self
            .pieces()
            .map(|(hex, piece)| format!("{}:{}", hex, piece.tag()))
            .collect();
        parts.sort();
        parts.join(",")
    }

    /// 64-bit Zobrist hash of the placement (side to move not included)
    pub fn zobrist(&self) -> u64 {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| cell.map(|p| zobrist_key(&p, i)))
            .fold(0, |acc, key| acc ^ key)
    }

    /// Mirror through the center with colors exchanged.
    ///
    /// Point reflection `(q, r) -> (-q, -r)` maps each color's forward
    /// direction onto the other's, so the swapped position plays the same
    /// game with White and Black exchanged. Lance variants are preserved
    /// because the reflection maps each lance direction set onto itself.
    pub fn color_swapped(&self) -> Position {
        let mut swapped = Position::empty();
        for (hex, piece) in self.pieces() {
            let mirrored = Hex::new(-hex.q, -hex.r);
            if let Some(index) = mirrored.index() {
                swapped.cells[index] = Some(piece.recolored());
            }
        }
        swapped
    }
}

impl std::fmt::Debug for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Position({})", self.canonical_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pieces::LanceVariant;

    fn kings_only() -> Position {
        Position::from_placements([
            (Hex::new(0, 0), Piece::new(PieceType::King, Color::White)),
            (Hex::new(0, -4), Piece::new(PieceType::King, Color::Black)),
        ])
        .unwrap()
    }

    #[test]
    fn test_insert_off_board() {
        let mut pos = Position::empty();
        let err = pos
            .insert(Hex::new(5, 0), Piece::new(PieceType::Pawn, Color::White))
            .unwrap_err();
        assert!(matches!(err, Error::OffBoard(h) if h == Hex::new(5, 0)));
    }

    #[test]
    fn test_get_remove() {
        let mut pos = kings_only();
        assert_eq!(pos.piece_count(), 2);
        assert_eq!(pos.find_king(Color::Black), Some(Hex::new(0, -4)));
        assert!(pos.remove(Hex::new(0, -4)).is_some());
        assert_eq!(pos.find_king(Color::Black), None);
        assert_eq!(pos.get(Hex::new(9, 9)), None);
    }

    #[test]
    fn test_canonical_key_sorted() {
        let mut pos = kings_only();
        pos.insert(Hex::new(2, 0), Piece::new(PieceType::Queen, Color::White))
            .unwrap();
        assert_eq!(pos.canonical_key(), "0,-4:bk,0,0:wk,2,0:wq");

        let lance = Position::from_placements([(
            Hex::new(1, 1),
            Piece::lance(Color::White, LanceVariant::B),
        )])
        .unwrap();
        assert_eq!(lance.canonical_key(), "1,1:wlB");
    }

    #[test]
    fn test_zobrist_order_independent() {
        let a = Position::from_placements([
            (Hex::new(0, 0), Piece::new(PieceType::King, Color::White)),
            (Hex::new(1, 1), Piece::new(PieceType::Queen, Color::Black)),
        ])
        .unwrap();
        let b = Position::from_placements([
            (Hex::new(1, 1), Piece::new(PieceType::Queen, Color::Black)),
            (Hex::new(0, 0), Piece::new(PieceType::King, Color::White)),
        ])
        .unwrap();
        assert_eq!(a.zobrist(), b.zobrist());
        assert_ne!(a.zobrist(), kings_only().zobrist());
        assert_eq!(Position::empty().zobrist(), 0);
    }

    #[test]
    fn test_zobrist_distinguishes_lance_variants() {
        let a = Position::from_placements([(Hex::new(0, 0), Piece::lance(Color::White, LanceVariant::A))]).unwrap();
        let b = Position::from_placements([(Hex::new(0, 0), Piece::lance(Color::White, LanceVariant::B))]).unwrap();
        assert_ne!(a.zobrist(), b.zobrist());
    }

    #[test]
    fn test_color_swap_involution() {
        let mut pos = kings_only();
        pos.insert(Hex::new(2, 0), Piece::new(PieceType::Queen, Color::White))
            .unwrap();
        let swapped = pos.color_swapped();
        assert_eq!(swapped.find_king(Color::Black), Some(Hex::new(0, 0)));
        assert_eq!(
            swapped.get(Hex::new(-2, 0)),
            Some(Piece::new(PieceType::Queen, Color::Black))
        );
        assert_eq!(swapped.color_swapped(), pos);
    }
}
