//! Transposition table
//!
//! Entries are keyed by the placement's Zobrist hash alone, so the same
//! slot is shared by both sides to move. Scores and bounds are therefore
//! stored from White's point of view and converted on the way in and out.
//! Mate scores are stored relative to the node that produced them.

use crate::eval::CHECKMATE_VALUE;
use crate::movegen::Move;
use crate::pieces::Color;
use rustc_hash::FxHashMap;
use tracing::debug;

/// Scores beyond this magnitude encode a forced mate
const MATE_THRESHOLD: i32 = CHECKMATE_VALUE - 1_000;

/// How a stored score relates to the true value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// True score is at least the stored one
    Lower,
    /// True score is at most the stored one
    Upper,
}

impl Bound {
    fn flipped(self) -> Bound {
        match self {
            Bound::Exact => Bound::Exact,
            Bound::Lower => Bound::Upper,
            Bound::Upper => Bound::Lower,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtEntry {
    pub score: i32,
    pub depth: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

pub struct TranspositionTable {
    table: FxHashMap<u64, TtEntry>,
    max_entries: usize,
    evict_fraction: f64,
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(100_000, 0.5)
    }
}

impl TranspositionTable {
    pub fn new(max_entries: usize, evict_fraction: f64) -> Self {
        Self {
            table: FxHashMap::default(),
            max_entries: max_entries.max(1),
            evict_fraction: evict_fraction.clamp(0.0, 1.0),
        }
    }

    /// Record a search result. `score` and `bound` are from `mover`'s
    /// perspective with mate scores relative to the root, `ply` plies up.
    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &mut self,
        hash: u64,
        mover: Color,
        ply: i32,
        depth: i32,
        score: i32,
        bound: Bound,
        best_move: Option<Move>,
    ) {
        if let Some(existing) = self.table.get(&hash) {
            if existing.depth > depth {
                return;
            }
        } else if self.table.len() >= self.max_entries {
            self.evict();
        }

        let node_score = score_to_node(score, ply);
        let (score, bound) = match mover {
            Color::White => (node_score, bound),
            Color::Black => (-node_score, bound.flipped()),
        };
        self.table.insert(
            hash,
            TtEntry {
                score,
                depth,
                bound,
                best_move,
            },
        );
    }

    /// Look up an entry, converted to `mover`'s perspective at `ply`
    pub fn probe(&self, hash: u64, mover: Color, ply: i32) -> Option<TtEntry> {
        let entry = self.table.get(&hash)?;
        let (score, bound) = match mover {
            Color::White => (entry.score, entry.bound),
            Color::Black => (-entry.score, entry.bound.flipped()),
        };
        Some(TtEntry {
            score: score_from_node(score, ply),
            bound,
            ..*entry
        })
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Drop the shallowest entries until the configured fraction is gone
    fn evict(&mut self) {
        let target = ((self.table.len() as f64 * self.evict_fraction).ceil() as usize).max(1);
        let mut by_depth: Vec<(i32, u64)> = self
            .table
            .iter()
            .map(|(&hash, entry)| (entry.depth, hash))
            .collect();
        by_depth.sort_unstable();
        for (_, hash) in by_depth.into_iter().take(target) {
            self.table.remove(&hash);
        }
        debug!("evicted {} transposition entries, {} remain", target, self.table.len());
    }
}

fn score_to_node(score: i32, ply: i32) -> i32 {
    if score > MATE_THRESHOLD {
        score + ply
    } else if score < -MATE_THRESHOLD {
        score - ply
    } else {
        score
    }
}

fn score_from_node(score: i32, ply: i32) -> i32 {
    if score > MATE_THRESHOLD {
        score - ply
    } else if score < -MATE_THRESHOLD {
        score + ply
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_probe_same_side() {
        let mut tt = TranspositionTable::default();
        tt.store(42, Color::White, 0, 3, 125, Bound::Lower, None);
        let entry = tt.probe(42, Color::White, 0).unwrap();
        assert_eq!(entry.score, 125);
        assert_eq!(entry.bound, Bound::Lower);
        assert_eq!(entry.depth, 3);
        assert!(tt.probe(7, Color::White, 0).is_none());
    }

    #[test]
    fn test_perspective_conversion() {
        let mut tt = TranspositionTable::default();
        // Black found the node is at least +80 for Black
        tt.store(1, Color::Black, 2, 4, 80, Bound::Lower, None);
        let white_view = tt.probe(1, Color::White, 2).unwrap();
        assert_eq!(white_view.score, -80);
        assert_eq!(white_view.bound, Bound::Upper);
        let black_view = tt.probe(1, Color::Black, 2).unwrap();
        assert_eq!(black_view.score, 80);
        assert_eq!(black_view.bound, Bound::Lower);
    }

    #[test]
    fn test_mate_scores_are_node_relative() {
        let mut tt = TranspositionTable::default();
        // Mate found 5 plies from the root, stored at ply 2
        let score = CHECKMATE_VALUE - 5;
        tt.store(9, Color::White, 2, 3, score, Bound::Exact, None);
        // Same node reached at ply 4: the mate is two plies further away
        let entry = tt.probe(9, Color::White, 4).unwrap();
        assert_eq!(entry.score, CHECKMATE_VALUE - 7);

        tt.store(10, Color::White, 1, 3, -(CHECKMATE_VALUE - 3), Bound::Exact, None);
        assert_eq!(
            tt.probe(10, Color::White, 0).unwrap().score,
            -(CHECKMATE_VALUE - 2)
        );
    }

    #[test]
    fn test_depth_preferred_replacement() {
        let mut tt = TranspositionTable::default();
        tt.store(5, Color::White, 0, 6, 10, Bound::Exact, None);
        tt.store(5, Color::White, 0, 2, 99, Bound::Exact, None);
        assert_eq!(tt.probe(5, Color::White, 0).unwrap().score, 10);
        tt.store(5, Color::White, 0, 6, 20, Bound::Exact, None);
        assert_eq!(tt.probe(5, Color::White, 0).unwrap().score, 20);
    }

    #[test]
    fn test_eviction_keeps_deep_entries() {
        let mut tt = TranspositionTable::new(4, 0.5);
        for hash in 0..4u64 {
            tt.store(hash, Color::White, 0, hash as i32, 0, Bound::Exact, None);
        }
        assert_eq!(tt.len(), 4);
        tt.store(100, Color::White, 0, 1, 0, Bound::Exact, None);
        assert_eq!(tt.len(), 3);
        assert!(tt.probe(3, Color::White, 0).is_some());
        assert!(tt.probe(0, Color::White, 0).is_none());
        tt.clear();
        assert!(tt.is_empty());
    }
}
