//! Engine session
//!
//! `EngineContext` owns every cache the engine keeps between calls: the
//! transposition table, loaded endgame tables and the opening book. Two
//! contexts never share state.

use crate::ai::{Difficulty, SearchOptions, SearchResult, Searcher};
use crate::book::{BookLookupResult, OpeningBook};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::movegen::Move;
use crate::pieces::Color;
use crate::position::Position;
use crate::tablebase::{ProbeHit, Tablebase, TablebaseRegistry};
use crate::tt::TranspositionTable;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Where a chosen move came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveSource {
    Book,
    Tablebase,
    Search,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChosenMove {
    pub mv: Move,
    pub source: MoveSource,
    /// Mover's perspective; absent for book moves
    pub score: Option<i32>,
    pub search: Option<SearchResult>,
}

pub struct EngineContext {
    config: EngineConfig,
    tt: TranspositionTable,
    tablebases: TablebaseRegistry,
    book: Option<OpeningBook>,
    rng: ChaCha8Rng,
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        let tt = TranspositionTable::new(config.search.tt_max_entries, config.search.tt_evict_fraction);
        let tablebases = TablebaseRegistry::new(config.tablebase.max_iterations);
        let rng = match config.book.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            config,
            tt,
            tablebases,
            book: None,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tablebases(&self) -> &TablebaseRegistry {
        &self.tablebases
    }

    pub fn tablebases_mut(&mut self) -> &mut TablebaseRegistry {
        &mut self.tablebases
    }

    pub fn book(&self) -> Option<&OpeningBook> {
        self.book.as_ref()
    }

    pub fn tt_len(&self) -> usize {
        self.tt.len()
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub fn clear_transposition_table(&mut self) {
        self.tt.clear();
    }

    pub fn clear_tablebases(&mut self) {
        self.tablebases.clear();
    }

    pub fn set_book(&mut self, book: OpeningBook) {
        self.book = Some(book);
    }

    pub fn clear_book(&mut self) {
        self.book = None;
    }

    pub fn load_tablebase(&mut self, path: impl AsRef<Path>) -> Result<&Tablebase> {
        self.tablebases.load(path)
    }

    pub fn load_book(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.book = Some(OpeningBook::load(path)?);
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn search(&mut self, pos: &Position, color: Color, options: &SearchOptions) -> SearchResult {
        let mut searcher = Searcher::new(&mut self.tt, &self.config.eval)
            .with_quiescence_max_depth(self.config.search.quiescence_max_depth);
        if self.config.tablebase.probe_in_search && !self.tablebases.is_empty() {
            searcher = searcher.with_tablebases(&self.tablebases);
        }
        searcher.search(pos, color, options)
    }

    pub fn probe_tablebase(&self, pos: &Position, side_to_move: Color) -> Option<ProbeHit> {
        self.tablebases.probe(pos, side_to_move)
    }

    /// Sample the opening book with the context's generator
    pub fn book_lookup(&mut self, pos: &Position, color: Color) -> Option<BookLookupResult> {
        let book = self.book.as_ref()?;
        Some(book.lookup_with_rng(pos, color, &self.config.book, &mut self.rng))
    }

    /// Book move if there is one, then a winning tablebase move, then search
    pub fn choose_move(&mut self, pos: &Position, color: Color, difficulty: Difficulty) -> Option<ChosenMove> {
        if let Some(mv) = self.book_lookup(pos, color).and_then(|r| r.mv) {
            return Some(ChosenMove {
                mv,
                source: MoveSource::Book,
                score: None,
                search: None,
            });
        }

        if let Some(mv) = self.tablebases.best_move(pos, color) {
            let score = self.tablebases.score(pos, color);
            return Some(ChosenMove {
                mv,
                source: MoveSource::Tablebase,
                score,
                search: None,
            });
        }

        let options = SearchOptions::from_preset(&self.config.search.preset(difficulty));
        let result = self.search(pos, color, &options);
        let mv = result.best_move?;
        Some(ChosenMove {
            mv,
            source: MoveSource::Search,
            score: Some(result.score),
            search: Some(result),
        })
    }
}
