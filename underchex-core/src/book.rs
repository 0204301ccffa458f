//! Opening book
//!
//! Move statistics gathered from finished games, keyed by canonical position
//! key. Lookups sample among well-played moves, weighted by popularity and
//! results.

use crate::error::Result;
use crate::movegen::{all_legal_moves, apply_move, Move};
use crate::pieces::{Color, PieceType};
use crate::position::Position;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookLookupOptions {
    /// Moves played fewer times are ignored
    pub min_play_count: u32,
    /// Higher flattens the distribution; 0 disables the exponent
    pub temperature: f64,
    pub use_win_rate_weight: bool,
    /// Fixed sampling seed; fresh entropy when absent
    pub seed: Option<u64>,
}

impl Default for BookLookupOptions {
    fn default() -> Self {
        Self {
            min_play_count: 3,
            temperature: 1.0,
            use_win_rate_weight: true,
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookGenerationOptions {
    /// Plies per game taken into the book
    pub max_depth: usize,
    /// Positions visited fewer times are pruned
    pub min_position_count: u32,
}

impl Default for BookGenerationOptions {
    fn default() -> Self {
        Self {
            max_depth: 20,
            min_position_count: 2,
        }
    }
}

// ============================================================================
// TYPES
// ============================================================================

/// Statistics for one move out of a book position
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookMove {
    pub from_q: i8,
    pub from_r: i8,
    pub to_q: i8,
    pub to_r: i8,
    pub play_count: u32,
    /// Games won by the side that played the move
    pub wins: u32,
    pub draws: u32,
    /// Running mean of the mover-perspective evaluation
    pub avg_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceType>,
}

impl BookMove {
    fn new(mv: &Move) -> Self {
        Self {
            from_q: mv.from.q,
            from_r: mv.from.r,
            to_q: mv.to.q,
            to_r: mv.to.r,
            play_count: 0,
            wins: 0,
            draws: 0,
            avg_score: 0.0,
            promotion: mv.promotion,
        }
    }

    pub fn matches(&self, mv: &Move) -> bool {
        mv.from.q == self.from_q
            && mv.from.r == self.from_r
            && mv.to.q == self.to_q
            && mv.to.r == self.to_r
            && mv.promotion == self.promotion
    }

    /// Draws count half; 0.5 when nothing is known
    pub fn win_rate(&self) -> f64 {
        if self.play_count == 0 {
            return 0.5;
        }
        (self.wins as f64 + self.draws as f64 * 0.5) / self.play_count as f64
    }

    pub fn weight(&self, options: &BookLookupOptions) -> f64 {
        let mut weight = (self.play_count as f64).sqrt();
        if options.use_win_rate_weight {
            weight *= 0.5 + self.win_rate();
        }
        if options.temperature > 0.0 {
            weight = weight.powf(1.0 / options.temperature);
        }
        weight
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookEntry {
    pub hash: String,
    pub moves: Vec<BookMove>,
    pub total_visits: u32,
}

impl fmt::Display for BookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Position {} (visited {} times)", self.hash, self.total_visits)?;
        let mut moves: Vec<&BookMove> = self.moves.iter().collect();
        moves.sort_by(|a, b| b.play_count.cmp(&a.play_count));
        for mv in moves {
            let promo = mv
                .promotion
                .map(|p| format!(" (={})", p.abbrev()))
                .unwrap_or_default();
            writeln!(
                f,
                "  {},{}-{},{}{}: played={}, wins={}, draws={}, winRate={:.1}%",
                mv.from_q,
                mv.from_r,
                mv.to_q,
                mv.to_r,
                promo,
                mv.play_count,
                mv.wins,
                mv.draws,
                mv.win_rate() * 100.0
            )?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookMetadata {
    pub created_at: String,
    pub games_count: u32,
    pub max_depth: usize,
}

/// Finished game fed into the book
#[derive(Clone, Debug, PartialEq)]
pub struct GameForBook {
    pub moves: Vec<Move>,
    /// 1 white win, 0 draw, -1 black win
    pub result: i8,
    /// Per-ply evaluations from White's perspective
    pub evaluations: Option<Vec<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BookLookupResult {
    pub mv: Option<Move>,
    pub entry: Option<BookEntry>,
    pub in_book: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookStatistics {
    pub position_count: usize,
    pub total_move_entries: usize,
    pub avg_moves_per_position: f64,
    pub max_depth: usize,
    pub games_count: u32,
    pub most_visited_position: Option<String>,
    pub highest_play_count: u32,
}

#[derive(Serialize, Deserialize)]
struct BookFile {
    entries: Vec<BookEntry>,
    #[serde(default)]
    metadata: BookMetadata,
}

// ============================================================================
// BOOK
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpeningBook {
    entries: FxHashMap<String, BookEntry>,
    pub metadata: BookMetadata,
}

impl OpeningBook {
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            metadata: BookMetadata {
                created_at: chrono::Utc::now().to_rfc3339(),
                ..BookMetadata::default()
            },
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, pos: &Position) -> Option<&BookEntry> {
        self.entries.get(&pos.canonical_key())
    }

    pub fn contains(&self, pos: &Position) -> bool {
        self.entry(pos).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = &BookEntry> {
        self.entries.values()
    }

    /// Sample a book move, seeding from `options.seed` when given
    pub fn lookup(&self, pos: &Position, color: Color, options: &BookLookupOptions) -> BookLookupResult {
        let mut rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.lookup_with_rng(pos, color, options, &mut rng)
    }

    pub fn lookup_with_rng<R: Rng + ?Sized>(
        &self,
        pos: &Position,
        color: Color,
        options: &BookLookupOptions,
        rng: &mut R,
    ) -> BookLookupResult {
        let Some(entry) = self.entry(pos).filter(|e| !e.moves.is_empty()) else {
            return BookLookupResult {
                mv: None,
                entry: None,
                in_book: false,
            };
        };

        let mv = select_book_move(&entry.moves, options, rng).and_then(|stats| {
            all_legal_moves(pos, color)
                .into_iter()
                .find(|mv| stats.matches(mv))
        });
        BookLookupResult {
            mv,
            entry: Some(entry.clone()),
            in_book: true,
        }
    }

    /// Record the first `max_depth` plies of a game played from `start`
    pub fn add_game(&mut self, game: &GameForBook, start: &Position, options: &BookGenerationOptions) {
        let mut pos = start.clone();
        let mut color = Color::White;

        for (ply, mv) in game.moves.iter().take(options.max_depth).enumerate() {
            let key = pos.canonical_key();
            let entry = self.entries.entry(key.clone()).or_insert_with(|| BookEntry {
                hash: key,
                moves: Vec::new(),
                total_visits: 0,
            });
            entry.total_visits += 1;

            let index = match entry.moves.iter().position(|m| m.matches(mv)) {
                Some(index) => index,
                None => {
                    entry.moves.push(BookMove::new(mv));
                    entry.moves.len() - 1
                }
            };
            let stats = &mut entry.moves[index];
            stats.play_count += 1;

            let mover_won = match color {
                Color::White => game.result == 1,
                Color::Black => game.result == -1,
            };
            if mover_won {
                stats.wins += 1;
            } else if game.result == 0 {
                stats.draws += 1;
            }

            if let Some(eval) = game.evaluations.as_ref().and_then(|e| e.get(ply)) {
                let side_eval = match color {
                    Color::White => *eval,
                    Color::Black => -eval,
                };
                let n = stats.play_count as f64;
                stats.avg_score = (stats.avg_score * (n - 1.0) + side_eval) / n;
            }

            pos = apply_move(&pos, mv);
            color = color.opposite();
            self.metadata.max_depth = self.metadata.max_depth.max(ply + 1);
        }

        self.metadata.games_count += 1;
    }

    /// Build a fresh book from `games`, then prune rare positions and moves
    pub fn generate(games: &[GameForBook], start: &Position, options: &BookGenerationOptions) -> Self {
        let mut book = OpeningBook::new();
        for game in games {
            book.add_game(game, start, options);
        }
        book.prune(options.min_position_count);
        book.metadata.created_at = chrono::Utc::now().to_rfc3339();
        info!(
            "generated opening book: {} positions from {} games",
            book.len(),
            book.metadata.games_count
        );
        book
    }

    /// Drop positions with fewer than `min_count` visits and moves with
    /// fewer than half that many plays
    pub fn prune(&mut self, min_count: u32) {
        let min_move_count = (min_count / 2).max(1);
        self.entries.retain(|_, entry| entry.total_visits >= min_count);
        for entry in self.entries.values_mut() {
            entry.moves.retain(|m| m.play_count >= min_move_count);
        }
    }

    pub fn statistics(&self) -> BookStatistics {
        let mut stats = BookStatistics {
            position_count: self.entries.len(),
            max_depth: self.metadata.max_depth,
            games_count: self.metadata.games_count,
            ..BookStatistics::default()
        };
        let mut most_visits = 0;
        for entry in self.entries.values() {
            stats.total_move_entries += entry.moves.len();
            // Ties go to the smaller key
            let better = match &stats.most_visited_position {
                None => true,
                Some(best) => {
                    entry.total_visits > most_visits
                        || (entry.total_visits == most_visits && entry.hash < *best)
                }
            };
            if better {
                most_visits = entry.total_visits;
                stats.most_visited_position = Some(entry.hash.clone());
            }
            for mv in &entry.moves {
                stats.highest_play_count = stats.highest_play_count.max(mv.play_count);
            }
        }
        if stats.position_count > 0 {
            stats.avg_moves_per_position =
                stats.total_move_entries as f64 / stats.position_count as f64;
        }
        stats
    }

    pub fn to_json(&self) -> Result<String> {
        let mut entries: Vec<BookEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.hash.cmp(&b.hash));
        let file = BookFile {
            entries,
            metadata: self.metadata.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: BookFile = serde_json::from_str(json)?;
        Ok(Self {
            entries: file
                .entries
                .into_iter()
                .map(|entry| (entry.hash.clone(), entry))
                .collect(),
            metadata: file.metadata,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        info!("saved opening book ({} positions) to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let book = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!("loaded opening book ({} positions) from {}", book.len(), path.display());
        Ok(book)
    }
}

/// Weighted draw among moves played at least `min_play_count` times
pub fn select_book_move<'a, R: Rng + ?Sized>(
    moves: &'a [BookMove],
    options: &BookLookupOptions,
    rng: &mut R,
) -> Option<&'a BookMove> {
    let eligible: Vec<&BookMove> = moves
        .iter()
        .filter(|m| m.play_count >= options.min_play_count)
        .collect();
    let weights: Vec<f64> = eligible.iter().map(|m| m.weight(options)).collect();
    let total: f64 = weights.iter().sum();
    if eligible.is_empty() || total <= 0.0 {
        return None;
    }

    let mut r = rng.gen::<f64>() * total;
    for (mv, weight) in eligible.iter().zip(&weights) {
        r -= weight;
        if r <= 0.0 {
            return Some(mv);
        }
    }
    eligible.last().copied()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Hex;
    use crate::game::{starting_position, GameState};

    fn stats(play_count: u32, wins: u32, draws: u32) -> BookMove {
        BookMove {
            from_q: 0,
            from_r: 2,
            to_q: 0,
            to_r: 1,
            play_count,
            wins,
            draws,
            avg_score: 0.0,
            promotion: None,
        }
    }

    /// Short game from the starting position: two pawn pushes each
    fn opening_game(result: i8) -> GameForBook {
        let mut game = GameState::new();
        for (from, to) in [((0, 2), (0, 1)), ((0, -2), (0, -1)), ((1, 2), (1, 1))] {
            game = game
                .make_move(Hex::new(from.0, from.1), Hex::new(to.0, to.1), None)
                .unwrap();
        }
        GameForBook {
            moves: game.history.clone(),
            result,
            evaluations: Some(vec![10.0, 20.0, 30.0]),
        }
    }

    #[test]
    fn test_win_rate() {
        assert_eq!(stats(0, 0, 0).win_rate(), 0.5);
        assert_eq!(stats(4, 2, 2).win_rate(), 0.75);
        assert_eq!(stats(4, 0, 0).win_rate(), 0.0);
    }

    #[test]
    fn test_weight() {
        let options = BookLookupOptions::default();
        // sqrt(4) * (0.5 + 0.5)
        assert!((stats(4, 1, 2).weight(&options) - 2.0).abs() < 1e-9);

        let flat = BookLookupOptions {
            use_win_rate_weight: false,
            temperature: 2.0,
            ..BookLookupOptions::default()
        };
        assert!((stats(16, 0, 0).weight(&flat) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_respects_min_play_count() {
        let moves = vec![stats(1, 1, 0), stats(2, 2, 0)];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(select_book_move(&moves, &BookLookupOptions::default(), &mut rng).is_none());

        let moves = vec![stats(1, 1, 0), stats(5, 2, 0)];
        let picked = select_book_move(&moves, &BookLookupOptions::default(), &mut rng).unwrap();
        assert_eq!(picked.play_count, 5);
    }

    #[test]
    fn test_add_game_updates_stats() {
        let start = starting_position();
        let mut book = OpeningBook::new();
        let options = BookGenerationOptions::default();
        book.add_game(&opening_game(1), &start, &options);
        book.add_game(&opening_game(0), &start, &options);

        let entry = book.entry(&start).unwrap();
        assert_eq!(entry.total_visits, 2);
        assert_eq!(entry.moves.len(), 1);
        let first = &entry.moves[0];
        assert_eq!(first.play_count, 2);
        assert_eq!(first.wins, 1);
        assert_eq!(first.draws, 1);
        assert!((first.avg_score - 10.0).abs() < 1e-9);
        assert_eq!(book.metadata.games_count, 2);
        assert_eq!(book.metadata.max_depth, 3);

        // Black's reply: white won, so no win for black
        let after = apply_move(&start, &opening_game(1).moves[0]);
        let reply = &book.entry(&after).unwrap().moves[0];
        assert_eq!(reply.wins, 0);
        assert!((reply.avg_score + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_depth_limits_plies() {
        let start = starting_position();
        let mut book = OpeningBook::new();
        let options = BookGenerationOptions {
            max_depth: 1,
            min_position_count: 1,
        };
        book.add_game(&opening_game(1), &start, &options);
        assert_eq!(book.len(), 1);
        assert_eq!(book.metadata.max_depth, 1);
    }

    #[test]
    fn test_generate_prunes_rare_positions() {
        let start = starting_position();
        let games = vec![opening_game(1), opening_game(-1), opening_game(0)];
        let book = OpeningBook::generate(&games, &start, &BookGenerationOptions::default());
        assert_eq!(book.len(), 3);
        assert!(!book.metadata.created_at.is_empty());

        let single = OpeningBook::generate(&games[..1], &start, &BookGenerationOptions::default());
        assert!(single.is_empty());
    }

    #[test]
    fn test_lookup_seeded() {
        let start = starting_position();
        let games = vec![opening_game(1), opening_game(1), opening_game(0)];
        let book = OpeningBook::generate(&games, &start, &BookGenerationOptions::default());
        let options = BookLookupOptions {
            seed: Some(42),
            ..BookLookupOptions::default()
        };
        let result = book.lookup(&start, Color::White, &options);
        assert!(result.in_book);
        let mv = result.mv.unwrap();
        assert_eq!(mv.from, Hex::new(0, 2));
        assert_eq!(mv.to, Hex::new(0, 1));
        assert_eq!(book.lookup(&start, Color::White, &options), result);
    }

    #[test]
    fn test_lookup_out_of_book() {
        let book = OpeningBook::new();
        let result = book.lookup(&starting_position(), Color::White, &BookLookupOptions::default());
        assert!(!result.in_book);
        assert!(result.mv.is_none());
        assert!(result.entry.is_none());
    }

    #[test]
    fn test_statistics_and_json_round_trip() {
        let start = starting_position();
        let games = vec![opening_game(1), opening_game(-1)];
        let book = OpeningBook::generate(&games, &start, &BookGenerationOptions::default());
        let stats = book.statistics();
        assert_eq!(stats.position_count, 3);
        assert_eq!(stats.total_move_entries, 3);
        assert_eq!(stats.highest_play_count, 2);
        assert_eq!(stats.games_count, 2);

        let json = book.to_json().unwrap();
        assert!(json.contains("\"totalVisits\""));
        assert!(json.contains("\"createdAt\""));
        let restored = OpeningBook::from_json(&json).unwrap();
        assert_eq!(restored, book);
    }

    #[test]
    fn test_entry_display() {
        let entry = BookEntry {
            hash: "k".to_string(),
            moves: vec![stats(4, 2, 2)],
            total_visits: 4,
        };
        let text = entry.to_string();
        assert!(text.contains("0,2-0,1: played=4"));
        assert!(text.contains("winRate=75.0%"));
    }
}
