//! Alpha-beta search
//!
//! Negamax with a transposition table, MVV-LVA move ordering, quiescence
//! search and iterative deepening. Scores are from the side to move's
//! perspective; a mate found `n` plies from the root scores
//! `CHECKMATE_VALUE - n`, so shorter mates score higher.

use crate::config::DifficultyPreset;
use crate::eval::{evaluate_for_color, EvalWeights, CHECKMATE_VALUE, STALEMATE_VALUE};
use crate::movegen::{all_legal_moves, apply_move, is_in_check, tactical_moves, Move};
use crate::pieces::{Color, PieceType};
use crate::position::Position;
use crate::tablebase::{TablebaseRegistry, Wdl, MAX_TABLEBASE_PIECES};
use crate::tt::{Bound, TranspositionTable};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::debug;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Window bound wider than any reachable score
const INFINITY: i32 = CHECKMATE_VALUE + 1;

/// Ordering bonus for captures before MVV-LVA terms
const CAPTURE_ORDER_BASE: i32 = 10_000;

/// Ordering bonus for promotions
const PROMOTION_ORDER_BASE: i32 = 9_000;

// ============================================================================
// OPTIONS AND RESULTS
// ============================================================================

/// Named strength levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty '{}'", other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// Parameters for a single search call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOptions {
    /// Maximum depth in plies
    pub depth: u32,
    pub use_tt: bool,
    pub use_quiescence: bool,
    /// When set, deepen from 1 to `depth` until the budget runs out
    pub time_limit_ms: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            depth: 4,
            use_tt: true,
            use_quiescence: true,
            time_limit_ms: None,
        }
    }
}

impl SearchOptions {
    /// Fixed-depth search without quiescence
    pub fn depth(depth: u32) -> Self {
        Self {
            depth,
            use_quiescence: false,
            ..Default::default()
        }
    }

    pub fn from_preset(preset: &DifficultyPreset) -> Self {
        Self {
            depth: preset.depth,
            use_tt: true,
            use_quiescence: preset.use_quiescence,
            time_limit_ms: preset.time_limit_ms,
        }
    }

    pub fn with_quiescence(mut self, enabled: bool) -> Self {
        self.use_quiescence = enabled;
        self
    }

    pub fn with_tt(mut self, enabled: bool) -> Self {
        self.use_tt = enabled;
        self
    }

    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = Some(ms);
        self
    }
}

/// Counters collected during a search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub nodes_searched: u64,
    pub cutoffs: u64,
    pub tt_hits: u64,
    pub quiescence_nodes: u64,
    /// Deepest fully completed iteration
    pub depth_reached: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    /// Side-to-move perspective
    pub score: i32,
    pub stats: SearchStats,
}

// ============================================================================
// MOVE ORDERING
// ============================================================================

/// Heuristic ordering score (higher = search first)
pub fn move_order_score(mv: &Move, weights: &EvalWeights) -> i32 {
    let mut score = 0;
    if let Some(victim) = mv.captured {
        score += CAPTURE_ORDER_BASE + victim.piece_type.value() * 10 - mv.piece.piece_type.value();
    }
    if let Some(promo) = mv.promotion {
        score += PROMOTION_ORDER_BASE + promo.value() - PieceType::Pawn.value();
    }
    score + weights.centrality_bonus(mv.to)
}

/// Sort best-first, with `first` (usually the TT move) pulled to the front
pub fn order_moves(moves: &mut [Move], first: Option<&Move>, weights: &EvalWeights) {
    moves.sort_by_cached_key(|mv| Reverse(move_order_score(mv, weights)));
    if let Some(first) = first {
        if let Some(idx) = moves.iter().position(|mv| mv.same_action(first)) {
            moves[..=idx].rotate_right(1);
        }
    }
}

// ============================================================================
// SEARCHER
// ============================================================================

/// One search over borrowed engine state
pub struct Searcher<'a> {
    tt: &'a mut TranspositionTable,
    tablebases: Option<&'a TablebaseRegistry>,
    weights: &'a EvalWeights,
    quiescence_max_depth: u32,
    use_tt: bool,
    use_quiescence: bool,
    stats: SearchStats,
}

impl<'a> Searcher<'a> {
    pub fn new(tt: &'a mut TranspositionTable, weights: &'a EvalWeights) -> Self {
        Self {
            tt,
            tablebases: None,
            weights,
            quiescence_max_depth: 8,
            use_tt: true,
            use_quiescence: true,
            stats: SearchStats::default(),
        }
    }

    /// Let the search read exact scores from loaded endgame tables
    pub fn with_tablebases(mut self, registry: &'a TablebaseRegistry) -> Self {
        self.tablebases = Some(registry);
        self
    }

    pub fn with_quiescence_max_depth(mut self, plies: u32) -> Self {
        self.quiescence_max_depth = plies;
        self
    }

    /// Search `pos` for `color`
    pub fn search(&mut self, pos: &Position, color: Color, options: &SearchOptions) -> SearchResult {
        self.use_tt = options.use_tt;
        self.use_quiescence = options.use_quiescence;
        self.stats = SearchStats::default();

        let max_depth = options.depth.max(1);
        let (best_move, score) = match options.time_limit_ms {
            Some(limit) => self.iterative_deepening(pos, color, max_depth, limit),
            None => {
                let result = self.search_root(pos, color, max_depth);
                self.stats.depth_reached = max_depth;
                result
            }
        };

        SearchResult {
            best_move,
            score,
            stats: self.stats,
        }
    }

    fn iterative_deepening(
        &mut self,
        pos: &Position,
        color: Color,
        max_depth: u32,
        time_limit_ms: u64,
    ) -> (Option<Move>, i32) {
        let start = Instant::now();
        let mut best = (None, 0);

        for depth in 1..=max_depth {
            if depth > 1 && start.elapsed().as_millis() >= u128::from(time_limit_ms) {
                break;
            }
            best = self.search_root(pos, color, depth);
            self.stats.depth_reached = depth;
            debug!(
                "depth {} complete: score {} nodes {} ({} ms)",
                depth,
                best.1,
                self.stats.nodes_searched,
                start.elapsed().as_millis()
            );
        }

        best
    }

    fn search_root(&mut self, pos: &Position, color: Color, depth: u32) -> (Option<Move>, i32) {
        self.stats.nodes_searched += 1;
        let mut moves = all_legal_moves(pos, color);
        if moves.is_empty() {
            let score = if is_in_check(pos, color) {
                -CHECKMATE_VALUE
            } else {
                STALEMATE_VALUE
            };
            return (None, score);
        }

        let hash = pos.zobrist();
        let tt_move = self.tt_move(hash, color, 0);
        order_moves(&mut moves, tt_move.as_ref(), self.weights);

        let depth = depth as i32;
        let mut alpha = -INFINITY;
        let mut best_score = -INFINITY;
        let mut best_move = moves[0];

        for mv in &moves {
            let child = apply_move(pos, mv);
            let score = -self.negamax(&child, color.opposite(), depth - 1, -INFINITY, -alpha, 1);
            if score > best_score {
                best_score = score;
                best_move = *mv;
            }
            alpha = alpha.max(score);
        }

        if self.use_tt {
            self.tt
                .store(hash, color, 0, depth, best_score, Bound::Exact, Some(best_move));
        }
        (Some(best_move), best_score)
    }

    fn tt_move(&self, hash: u64, color: Color, ply: i32) -> Option<Move> {
        if !self.use_tt {
            return None;
        }
        self.tt.probe(hash, color, ply).and_then(|e| e.best_move)
    }

    /// Exact score from an endgame table, adjusted for distance from the root
    fn tablebase_score(&self, pos: &Position, color: Color, ply: i32) -> Option<i32> {
        let registry = self.tablebases?;
        if pos.piece_count() > MAX_TABLEBASE_PIECES {
            return None;
        }
        let hit = registry.probe(pos, color)?;
        let dtm = hit.entry.dtm.max(0);
        Some(match hit.entry.wdl {
            Wdl::Win => CHECKMATE_VALUE - (ply + dtm),
            Wdl::Loss => -(CHECKMATE_VALUE - (ply + dtm)),
            Wdl::Draw => STALEMATE_VALUE,
        })
    }

    fn negamax(
        &mut self,
        pos: &Position,
        color: Color,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        ply: i32,
    ) -> i32 {
        self.stats.nodes_searched += 1;
        let original_alpha = alpha;
        let hash = pos.zobrist();

        let mut tt_move = None;
        if self.use_tt {
            if let Some(entry) = self.tt.probe(hash, color, ply) {
                tt_move = entry.best_move;
                if entry.depth >= depth {
                    self.stats.tt_hits += 1;
                    match entry.bound {
                        Bound::Exact => return entry.score,
                        Bound::Lower => alpha = alpha.max(entry.score),
                        Bound::Upper => beta = beta.min(entry.score),
                    }
                    if alpha >= beta {
                        return entry.score;
                    }
                }
            }
        }

        if let Some(score) = self.tablebase_score(pos, color, ply) {
            return score;
        }

        let mut moves = all_legal_moves(pos, color);
        if moves.is_empty() {
            return if is_in_check(pos, color) {
                -(CHECKMATE_VALUE - ply)
            } else {
                STALEMATE_VALUE
            };
        }

        if depth <= 0 {
            return if self.use_quiescence {
                self.quiescence(pos, color, alpha, beta, 0, ply)
            } else {
                evaluate_for_color(pos, color, self.weights)
            };
        }

        order_moves(&mut moves, tt_move.as_ref(), self.weights);

        let mut best_score = -INFINITY;
        let mut best_move = None;
        for mv in &moves {
            let child = apply_move(pos, mv);
            let score = -self.negamax(&child, color.opposite(), depth - 1, -beta, -alpha, ply + 1);
            if score > best_score {
                best_score = score;
                best_move = Some(*mv);
            }
            alpha = alpha.max(score);
            if alpha >= beta {
                self.stats.cutoffs += 1;
                break;
            }
        }

        if self.use_tt {
            let bound = if best_score <= original_alpha {
                Bound::Upper
            } else if best_score >= beta {
                Bound::Lower
            } else {
                Bound::Exact
            };
            self.tt
                .store(hash, color, ply, depth, best_score, bound, best_move);
        }

        best_score
    }

    /// Fail-hard capture/promotion search from a stand-pat evaluation
    fn quiescence(
        &mut self,
        pos: &Position,
        color: Color,
        mut alpha: i32,
        beta: i32,
        q_depth: u32,
        ply: i32,
    ) -> i32 {
        self.stats.nodes_searched += 1;
        self.stats.quiescence_nodes += 1;

        let stand_pat = evaluate_for_color(pos, color, self.weights);
        if q_depth >= self.quiescence_max_depth {
            return stand_pat;
        }
        if stand_pat >= beta {
            return beta;
        }
        alpha = alpha.max(stand_pat);

        let mut moves = tactical_moves(pos, color);
        order_moves(&mut moves, None, self.weights);

        for mv in &moves {
            let child = apply_move(pos, mv);
            let score = -self.quiescence(&child, color.opposite(), -beta, -alpha, q_depth + 1, ply + 1);
            if score >= beta {
                self.stats.cutoffs += 1;
                return beta;
            }
            alpha = alpha.max(score);
        }

        alpha
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Hex;
    use crate::game::starting_position;
    use crate::pieces::Piece;

    fn place(pieces: &[(i8, i8, PieceType, Color)]) -> Position {
        Position::from_placements(
            pieces
                .iter()
                .map(|&(q, r, pt, c)| (Hex::new(q, r), Piece::new(pt, c))),
        )
        .unwrap()
    }

    fn search(pos: &Position, color: Color, options: SearchOptions) -> SearchResult {
        let mut tt = TranspositionTable::default();
        let weights = EvalWeights::default();
        let mut searcher = Searcher::new(&mut tt, &weights);
        searcher.search(pos, color, &options)
    }

    #[test]
    fn test_search_returns_move_from_start() {
        let result = search(&starting_position(), Color::White, SearchOptions::depth(2));
        let mv = result.best_move.expect("a move from the opening");
        assert_eq!(mv.piece.color, Color::White);
        assert!(result.stats.nodes_searched > 0);
        assert_eq!(result.stats.depth_reached, 2);
    }

    #[test]
    fn test_captures_hanging_queen() {
        let pos = place(&[
            (0, 4, PieceType::King, Color::White),
            (0, 0, PieceType::Chariot, Color::White),
            (2, -2, PieceType::Queen, Color::Black),
            (-4, 0, PieceType::King, Color::Black),
        ]);
        let result = search(&pos, Color::White, SearchOptions::depth(2));
        assert_eq!(result.best_move.map(|m| m.to), Some(Hex::new(2, -2)));
    }

    #[test]
    fn test_finds_mate_in_one() {
        // Queen to (0,-3) mates: the white king on (0,-2) guards it
        let pos = place(&[
            (0, -2, PieceType::King, Color::White),
            (2, -3, PieceType::Queen, Color::White),
            (0, -4, PieceType::King, Color::Black),
        ]);
        let result = search(&pos, Color::White, SearchOptions::depth(2));
        assert_eq!(result.best_move.map(|m| m.to), Some(Hex::new(0, -3)));
        assert_eq!(result.score, CHECKMATE_VALUE - 1);
    }

    #[test]
    fn test_no_moves_when_mated() {
        let pos = place(&[
            (0, -2, PieceType::King, Color::White),
            (0, -3, PieceType::Queen, Color::White),
            (0, -4, PieceType::King, Color::Black),
        ]);
        let result = search(&pos, Color::Black, SearchOptions::depth(3));
        assert!(result.best_move.is_none());
        assert_eq!(result.score, -CHECKMATE_VALUE);
    }

    #[test]
    fn test_quiescence_counts_nodes() {
        let pos = place(&[
            (0, 4, PieceType::King, Color::White),
            (0, 1, PieceType::Knight, Color::White),
            (0, -1, PieceType::Pawn, Color::Black),
            (1, -2, PieceType::Pawn, Color::Black),
            (-4, 0, PieceType::King, Color::Black),
        ]);
        let result = search(&pos, Color::White, SearchOptions::depth(1).with_quiescence(true));
        assert!(result.stats.quiescence_nodes > 0);
    }

    #[test]
    fn test_iterative_deepening_reports_depth() {
        let pos = place(&[
            (0, 4, PieceType::King, Color::White),
            (1, 1, PieceType::Queen, Color::White),
            (0, -4, PieceType::King, Color::Black),
        ]);
        let options = SearchOptions::depth(3).with_time_limit(60_000);
        let result = search(&pos, Color::White, options);
        assert_eq!(result.stats.depth_reached, 3);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_zero_budget_still_completes_depth_one() {
        let options = SearchOptions::depth(6).with_time_limit(0);
        let result = search(&starting_position(), Color::White, options);
        assert_eq!(result.stats.depth_reached, 1);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_move_ordering_prefers_captures() {
        let weights = EvalWeights::default();
        let pawn = Piece::new(PieceType::Pawn, Color::White);
        let quiet = Move {
            from: Hex::new(0, 1),
            to: Hex::new(0, 0),
            piece: pawn,
            captured: None,
            promotion: None,
        };
        let capture = Move {
            to: Hex::new(1, 0),
            captured: Some(Piece::new(PieceType::Queen, Color::Black)),
            ..quiet
        };
        assert_eq!(move_order_score(&capture, &weights), 10_000 + 9_000 - 100 + 15);
        let mut moves = vec![quiet, capture];
        order_moves(&mut moves, None, &weights);
        assert_eq!(moves[0], capture);
        order_moves(&mut moves, Some(&quiet), &weights);
        assert_eq!(moves[0], quiet);
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("brutal".parse::<Difficulty>().is_err());
    }
}
