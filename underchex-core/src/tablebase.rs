//! Endgame tablebases
//!
//! Retrograde analysis over every position of a small material
//! configuration: a king and up to two pieces against a bare king. Tables
//! are keyed by `"<canonical key>-<w|b>"` and record win/draw/loss for the
//! side to move plus the distance to mate in plies.
//!
//! Tables are always generated with White as the stronger side. Positions
//! where Black is stronger are probed through their color-swapped mirror.

use crate::board::{all_cells, Hex};
use crate::error::{Error, Result};
use crate::eval::CHECKMATE_VALUE;
use crate::movegen::{all_legal_moves, apply_move, is_in_check, Move};
use crate::pieces::{is_promotion_zone, Color, LanceVariant, Piece, PieceType, PROMOTION_TARGETS};
use crate::position::{zobrist_key, Position};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Most pieces (kings included) a supported configuration may hold
pub const MAX_TABLEBASE_PIECES: usize = 5;

/// Most non-king pieces the stronger side may hold
pub const MAX_STRONGER_PIECES: usize = 2;

/// Default cap on retrograde passes
pub const DEFAULT_MAX_ITERATIONS: u32 = 500;

/// dtm recorded for draws
pub const DRAW_DTM: i32 = -1;

/// Non-king letters accepted in configuration names
const NAME_PIECES: [PieceType; 5] = [
    PieceType::Chariot,
    PieceType::Lance,
    PieceType::Knight,
    PieceType::Pawn,
    PieceType::Queen,
];

// ============================================================================
// TYPES
// ============================================================================

/// Outcome for the side to move
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Wdl {
    Win,
    Draw,
    Loss,
}

impl fmt::Display for Wdl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wdl::Win => write!(f, "win"),
            Wdl::Draw => write!(f, "draw"),
            Wdl::Loss => write!(f, "loss"),
        }
    }
}

/// Stored move: coordinates plus promotion choice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablebaseMove {
    pub from_q: i8,
    pub from_r: i8,
    pub to_q: i8,
    pub to_r: i8,
    #[serde(default)]
    pub promotion: Option<PieceType>,
}

impl TablebaseMove {
    pub fn from_move(mv: &Move) -> Self {
        Self {
            from_q: mv.from.q,
            from_r: mv.from.r,
            to_q: mv.to.q,
            to_r: mv.to.r,
            promotion: mv.promotion,
        }
    }

    pub fn from_hex(&self) -> Hex {
        Hex::new(self.from_q, self.from_r)
    }

    pub fn to_hex(&self) -> Hex {
        Hex::new(self.to_q, self.to_r)
    }

    /// Point-reflected move, matching [`Position::color_swapped`]
    pub fn mirrored(&self) -> Self {
        Self {
            from_q: -self.from_q,
            from_r: -self.from_r,
            to_q: -self.to_q,
            to_r: -self.to_r,
            promotion: self.promotion,
        }
    }

    pub fn matches(&self, mv: &Move) -> bool {
        mv.from == self.from_hex() && mv.to == self.to_hex() && mv.promotion == self.promotion
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TablebaseEntry {
    pub wdl: Wdl,
    /// Plies to mate; [`DRAW_DTM`] for draws
    pub dtm: i32,
    /// Fastest winning move, recorded for wins
    pub best_move: Option<TablebaseMove>,
}

impl TablebaseEntry {
    /// Centipawn-style score for the side to move
    pub fn score(&self) -> i32 {
        match self.wdl {
            Wdl::Win => CHECKMATE_VALUE - self.dtm,
            Wdl::Draw => 0,
            Wdl::Loss => -CHECKMATE_VALUE + self.dtm,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablebaseMetadata {
    pub generated_at: String,
    pub generation_time_ms: u64,
    pub win_count: usize,
    pub draw_count: usize,
    pub loss_count: usize,
}

/// Material configuration of a table
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TablebaseConfig {
    /// Stronger side's non-king pieces, sorted by abbreviation
    pub stronger: Vec<PieceType>,
    /// Weaker side's non-king pieces; only empty sides are supported
    pub weaker: Vec<PieceType>,
    /// e.g. `KQvK`
    pub name: String,
}

impl TablebaseConfig {
    /// King plus `stronger` against a bare king
    pub fn new(mut stronger: Vec<PieceType>) -> Self {
        stronger.sort_by_key(|pt| pt.abbrev());
        let name = config_name(&stronger, &[]);
        Self {
            stronger,
            weaker: Vec::new(),
            name,
        }
    }

    /// Parse a name such as `KQvK` or `KLNvK`
    pub fn from_name(name: &str) -> Result<Self> {
        let invalid = || Error::InvalidTablebaseName(name.to_string());
        let rest = name.strip_prefix('K').ok_or_else(invalid)?;
        let (stronger, weaker) = rest.split_once("vK").ok_or_else(invalid)?;

        let parse = |letters: &str| -> Result<Vec<PieceType>> {
            letters
                .chars()
                .map(|c| {
                    PieceType::from_abbrev(c)
                        .filter(|pt| c.is_ascii_uppercase() && NAME_PIECES.contains(pt))
                        .ok_or_else(invalid)
                })
                .collect()
        };
        let stronger = parse(stronger)?;
        let weaker = parse(weaker)?;

        if !weaker.is_empty() || stronger.len() > MAX_STRONGER_PIECES {
            return Err(Error::UnsupportedConfiguration(name.to_string()));
        }
        Ok(Self::new(stronger))
    }

    /// Kings included
    pub fn piece_count(&self) -> usize {
        2 + self.stronger.len() + self.weaker.len()
    }

    pub fn is_supported(&self) -> bool {
        self.weaker.is_empty()
            && self.stronger.len() <= MAX_STRONGER_PIECES
            && self.piece_count() <= MAX_TABLEBASE_PIECES
    }

    /// Configurations reachable by one capture or promotion
    pub fn sub_configurations(&self) -> Vec<TablebaseConfig> {
        let mut subs: Vec<TablebaseConfig> = Vec::new();
        let mut push = |config: TablebaseConfig| {
            if config.name != self.name && !subs.iter().any(|s| s.name == config.name) {
                subs.push(config);
            }
        };
        for i in 0..self.stronger.len() {
            let mut captured = self.stronger.clone();
            let removed = captured.remove(i);
            push(TablebaseConfig::new(captured.clone()));

            if removed == PieceType::Pawn {
                for promo in PROMOTION_TARGETS {
                    let mut promoted = captured.clone();
                    promoted.push(promo);
                    push(TablebaseConfig::new(promoted));
                }
            }
        }
        subs
    }
}

fn config_name(stronger: &[PieceType], weaker: &[PieceType]) -> String {
    let letters = |pieces: &[PieceType]| pieces.iter().map(|p| p.abbrev()).collect::<String>();
    format!("K{}vK{}", letters(stronger), letters(weaker))
}

/// Classify a position; also reports which color holds the extra material
fn classify(pos: &Position) -> Option<(TablebaseConfig, Color)> {
    let mut kings = [0usize; 2];
    let mut sides: [Vec<PieceType>; 2] = [Vec::new(), Vec::new()];
    for (_, piece) in pos.pieces() {
        if piece.is_king() {
            kings[piece.color as usize] += 1;
        } else {
            sides[piece.color as usize].push(piece.piece_type);
        }
    }
    if kings != [1, 1] {
        return None;
    }

    let [white, black] = sides;
    let (stronger_color, mut stronger, mut weaker) = if white.len() >= black.len() {
        (Color::White, white, black)
    } else {
        (Color::Black, black, white)
    };
    stronger.sort_by_key(|pt| pt.abbrev());
    weaker.sort_by_key(|pt| pt.abbrev());

    let name = config_name(&stronger, &weaker);
    let config = TablebaseConfig {
        stronger,
        weaker,
        name,
    };
    config.is_supported().then_some((config, stronger_color))
}

/// Supported configuration of a position, or `None`
pub fn detect_configuration(pos: &Position) -> Option<TablebaseConfig> {
    classify(pos).map(|(config, _)| config)
}

/// Entry key for a position and side to move
pub fn tablebase_key(pos: &Position, side_to_move: Color) -> String {
    format!("{}-{}", pos.canonical_key(), side_to_move.tag())
}

// ============================================================================
// TABLE
// ============================================================================

/// One generated table
#[derive(Clone, Debug, PartialEq)]
pub struct Tablebase {
    pub name: String,
    pub description: String,
    pub entries: FxHashMap<String, TablebaseEntry>,
    pub metadata: TablebaseMetadata,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    key: String,
    wdl: Wdl,
    dtm: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    best_move: Option<TablebaseMove>,
}

#[derive(Serialize, Deserialize)]
struct TablebaseFile {
    name: String,
    #[serde(default)]
    description: String,
    entries: Vec<EntryRecord>,
    #[serde(default)]
    metadata: TablebaseMetadata,
}

impl Tablebase {
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&TablebaseEntry> {
        self.entries.get(key)
    }

    /// (wins, draws, losses) counted from the entries
    pub fn counts(&self) -> (usize, usize, usize) {
        self.entries
            .values()
            .fold((0, 0, 0), |(w, d, l), entry| match entry.wdl {
                Wdl::Win => (w + 1, d, l),
                Wdl::Draw => (w, d + 1, l),
                Wdl::Loss => (w, d, l + 1),
            })
    }

    /// JSON export; entries are sorted by key
    pub fn to_json(&self) -> Result<String> {
        let mut entries: Vec<EntryRecord> = self
            .entries
            .iter()
            .map(|(key, entry)| EntryRecord {
                key: key.clone(),
                wdl: entry.wdl,
                dtm: entry.dtm,
                best_move: entry.best_move,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        let file = TablebaseFile {
            name: self.name.clone(),
            description: self.description.clone(),
            entries,
            metadata: self.metadata.clone(),
        };
        Ok(serde_json::to_string(&file)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let file: TablebaseFile = serde_json::from_str(json)?;
        let entries = file
            .entries
            .into_iter()
            .map(|record| {
                (
                    record.key,
                    TablebaseEntry {
                        wdl: record.wdl,
                        dtm: record.dtm,
                        best_move: record.best_move,
                    },
                )
            })
            .collect();
        Ok(Self {
            name: file.name,
            description: file.description,
            entries,
            metadata: file.metadata,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

// ============================================================================
// GENERATION
// ============================================================================

/// Up to two kings and two extra pieces
const MAX_PACKED: usize = 2 + MAX_STRONGER_PIECES;

/// Compact placement used while a table is being built
#[derive(Clone, Copy)]
struct Packed {
    len: u8,
    cells: [u8; MAX_PACKED],
    pieces: [Option<Piece>; MAX_PACKED],
}

impl Packed {
    fn from_position(pos: &Position) -> Self {
        let mut packed = Packed {
            len: 0,
            cells: [0; MAX_PACKED],
            pieces: [None; MAX_PACKED],
        };
        for (hex, piece) in pos.pieces() {
            let slot = packed.len as usize;
            if let (Some(index), true) = (hex.index(), slot < MAX_PACKED) {
                packed.cells[slot] = index as u8;
                packed.pieces[slot] = Some(piece);
                packed.len += 1;
            }
        }
        packed
    }

    fn to_position(self) -> Position {
        let mut pos = Position::empty();
        for slot in 0..self.len as usize {
            pos.set_index(self.cells[slot] as usize, self.pieces[slot]);
        }
        pos
    }
}

/// Successor code: internal index, external outcome, or unknown
const EXTERNAL_FLAG: u32 = 1 << 31;
const UNKNOWN_SUCCESSOR: u32 = u32::MAX;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Status {
    Unknown,
    Resolved(Wdl),
}

/// Retrograde generator for one configuration
pub struct Generator<'a> {
    config: TablebaseConfig,
    max_iterations: u32,
    subtables: Option<&'a TablebaseRegistry>,
}

/// Generate a standalone table; positions leaving the configuration stay unresolved
pub fn generate_tablebase(config: &TablebaseConfig) -> Tablebase {
    Generator::new(config).run()
}

impl<'a> Generator<'a> {
    pub fn new(config: &TablebaseConfig) -> Self {
        Self {
            config: config.clone(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            subtables: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Resolve captures and promotions through already generated tables
    pub fn with_subtables(mut self, registry: &'a TablebaseRegistry) -> Self {
        self.subtables = Some(registry);
        self
    }

    pub fn run(&self) -> Tablebase {
        let start = Instant::now();
        info!("generating tablebase {}", self.config.name);

        let (positions, sides, index) = self.enumerate();
        let count = positions.len();
        info!("{}: {} positions enumerated", self.config.name, count);

        // Successor lists, flattened
        let mut offsets: Vec<u32> = Vec::with_capacity(count + 1);
        let mut codes: Vec<u32> = Vec::new();
        let mut externals: Vec<TablebaseEntry> = Vec::new();
        let mut status = vec![Status::Unknown; count];
        let mut dtm = vec![DRAW_DTM; count];
        let mut best_slot: Vec<Option<u32>> = vec![None; count];

        offsets.push(0);
        for i in 0..count {
            let pos = positions[i].to_position();
            let side = sides[i];
            let moves = all_legal_moves(&pos, side);
            if moves.is_empty() {
                if is_in_check(&pos, side) {
                    status[i] = Status::Resolved(Wdl::Loss);
                    dtm[i] = 0;
                } else {
                    status[i] = Status::Resolved(Wdl::Draw);
                }
            }
            let hash = pos.zobrist();
            for mv in &moves {
                codes.push(self.successor_code(&pos, hash, mv, side, &index, &mut externals));
            }
            offsets.push(codes.len() as u32);
        }

        let outcome = |code: u32, status: &[Status], dtm: &[i32]| -> Option<(Wdl, i32)> {
            if code == UNKNOWN_SUCCESSOR {
                None
            } else if code & EXTERNAL_FLAG != 0 {
                let entry = externals[(code & !EXTERNAL_FLAG) as usize];
                Some((entry.wdl, entry.dtm))
            } else {
                match status[code as usize] {
                    Status::Resolved(wdl) => Some((wdl, dtm[code as usize])),
                    Status::Unknown => None,
                }
            }
        };

        // Layered induction: each pass only reads results of earlier passes
        let mut iterations = 0;
        while iterations < self.max_iterations {
            iterations += 1;
            let mut updates: Vec<(usize, Wdl, i32, Option<u32>)> = Vec::new();

            for i in 0..count {
                if status[i] != Status::Unknown {
                    continue;
                }
                let succ = &codes[offsets[i] as usize..offsets[i + 1] as usize];

                let mut fastest_win: Option<(i32, u32)> = None;
                let mut slowest_loss = 0;
                let mut all_won = true;
                for (slot, &code) in succ.iter().enumerate() {
                    match outcome(code, &status, &dtm) {
                        Some((Wdl::Loss, d)) => {
                            if fastest_win.map_or(true, |(best, _)| d < best) {
                                fastest_win = Some((d, slot as u32));
                            }
                            all_won = false;
                        }
                        Some((Wdl::Win, d)) => slowest_loss = slowest_loss.max(d),
                        _ => all_won = false,
                    }
                }

                if let Some((d, slot)) = fastest_win {
                    updates.push((i, Wdl::Win, d + 1, Some(slot)));
                } else if all_won && !succ.is_empty() {
                    updates.push((i, Wdl::Loss, slowest_loss + 1, None));
                }
            }

            debug!(
                "{}: iteration {} resolved {} positions",
                self.config.name,
                iterations,
                updates.len()
            );
            if updates.is_empty() {
                break;
            }
            for (i, wdl, d, slot) in updates {
                status[i] = Status::Resolved(wdl);
                dtm[i] = d;
                best_slot[i] = slot;
            }
        }

        let mut entries = FxHashMap::default();
        entries.reserve(count);
        let mut metadata = TablebaseMetadata::default();
        for i in 0..count {
            let pos = positions[i].to_position();
            let side = sides[i];
            let (wdl, d) = match status[i] {
                Status::Resolved(Wdl::Draw) | Status::Unknown => (Wdl::Draw, DRAW_DTM),
                Status::Resolved(wdl) => (wdl, dtm[i]),
            };
            let best_move = best_slot[i].and_then(|slot| {
                all_legal_moves(&pos, side)
                    .get(slot as usize)
                    .map(TablebaseMove::from_move)
            });
            match wdl {
                Wdl::Win => metadata.win_count += 1,
                Wdl::Draw => metadata.draw_count += 1,
                Wdl::Loss => metadata.loss_count += 1,
            }
            entries.insert(
                tablebase_key(&pos, side),
                TablebaseEntry {
                    wdl,
                    dtm: d,
                    best_move,
                },
            );
        }

        metadata.generated_at = chrono::Utc::now().to_rfc3339();
        metadata.generation_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "{}: {} entries ({} win, {} draw, {} loss) after {} iterations in {} ms",
            self.config.name,
            entries.len(),
            metadata.win_count,
            metadata.draw_count,
            metadata.loss_count,
            iterations,
            metadata.generation_time_ms
        );

        Tablebase {
            name: self.config.name.clone(),
            description: format!("Endgame tablebase for {}", self.config.name),
            entries,
            metadata,
        }
    }

    /// Enumerate legal positions, White stronger, both sides to move
    #[allow(clippy::type_complexity)]
    fn enumerate(&self) -> (Vec<Packed>, Vec<Color>, FxHashMap<(u64, Color), u32>) {
        let mut positions = Vec::new();
        let mut sides = Vec::new();
        let mut index: FxHashMap<(u64, Color), u32> = FxHashMap::default();

        let slots: Vec<Vec<Piece>> = self
            .config
            .stronger
            .iter()
            .map(|&pt| match pt {
                PieceType::Lance => vec![
                    Piece::lance(Color::White, LanceVariant::A),
                    Piece::lance(Color::White, LanceVariant::B),
                ],
                _ => vec![Piece::new(pt, Color::White)],
            })
            .collect();

        let white_king = Piece::new(PieceType::King, Color::White);
        let black_king = Piece::new(PieceType::King, Color::Black);

        for &wk in all_cells() {
            for &bk in all_cells() {
                if wk == bk || wk.distance_to(bk) <= 1 {
                    continue;
                }
                let mut pos = Position::empty();
                if let (Some(wi), Some(bi)) = (wk.index(), bk.index()) {
                    pos.set_index(wi, Some(white_king));
                    pos.set_index(bi, Some(black_king));
                }
                place_pieces(&mut pos, &slots, &mut |pos: &Position| {
                    let hash = pos.zobrist();
                    for side in [Color::White, Color::Black] {
                        if is_in_check(pos, side.opposite()) || index.contains_key(&(hash, side)) {
                            continue;
                        }
                        index.insert((hash, side), positions.len() as u32);
                        positions.push(Packed::from_position(pos));
                        sides.push(side);
                    }
                });
            }
        }

        (positions, sides, index)
    }

    fn successor_code(
        &self,
        pos: &Position,
        hash: u64,
        mv: &Move,
        side: Color,
        index: &FxHashMap<(u64, Color), u32>,
        externals: &mut Vec<TablebaseEntry>,
    ) -> u32 {
        let next_side = side.opposite();
        if !mv.is_tactical() {
            let (Some(from), Some(to)) = (mv.from.index(), mv.to.index()) else {
                return UNKNOWN_SUCCESSOR;
            };
            let child_hash = hash ^ zobrist_key(&mv.piece, from) ^ zobrist_key(&mv.piece, to);
            return index
                .get(&(child_hash, next_side))
                .copied()
                .unwrap_or(UNKNOWN_SUCCESSOR);
        }

        let Some(registry) = self.subtables else {
            return UNKNOWN_SUCCESSOR;
        };
        let child = apply_move(pos, mv);
        match registry.probe(&child, next_side) {
            Some(hit) => {
                externals.push(hit.entry);
                EXTERNAL_FLAG | (externals.len() as u32 - 1)
            }
            None => UNKNOWN_SUCCESSOR,
        }
    }
}

/// Place each slot's piece on a free cell, calling `visit` per full placement
fn place_pieces(pos: &mut Position, slots: &[Vec<Piece>], visit: &mut dyn FnMut(&Position)) {
    let Some((options, rest)) = slots.split_first() else {
        visit(pos);
        return;
    };
    for (index, &hex) in all_cells().iter().enumerate() {
        if pos.get_index(index).is_some() {
            continue;
        }
        for &piece in options {
            if piece.piece_type == PieceType::Pawn && is_promotion_zone(hex, piece.color) {
                continue;
            }
            pos.set_index(index, Some(piece));
            place_pieces(pos, rest, visit);
            pos.set_index(index, None);
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Successful probe
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeHit {
    /// Table the entry came from
    pub table: String,
    pub entry: TablebaseEntry,
    /// The entry belongs to the color-swapped mirror of the probed position
    pub color_swapped: bool,
}

impl ProbeHit {
    /// Best move in the probed position's own coordinates
    pub fn best_move(&self) -> Option<TablebaseMove> {
        let mv = self.entry.best_move?;
        Some(if self.color_swapped { mv.mirrored() } else { mv })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TablebaseStat {
    pub name: String,
    pub size: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub generation_time_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TablebaseStatistics {
    pub total_entries: usize,
    pub tables: Vec<TablebaseStat>,
}

impl fmt::Display for TablebaseStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total entries: {}", self.total_entries)?;
        writeln!(f, "Loaded tablebases: {}", self.tables.len())?;
        for table in &self.tables {
            writeln!(f)?;
            writeln!(f, "{}:", table.name)?;
            writeln!(f, "  Size: {} positions", table.size)?;
            if table.size > 0 {
                let pct = |n: usize| 100.0 * n as f64 / table.size as f64;
                writeln!(f, "  Wins: {} ({:.1}%)", table.wins, pct(table.wins))?;
                writeln!(f, "  Draws: {} ({:.1}%)", table.draws, pct(table.draws))?;
                writeln!(f, "  Losses: {} ({:.1}%)", table.losses, pct(table.losses))?;
            }
            writeln!(f, "  Generation time: {} ms", table.generation_time_ms)?;
        }
        Ok(())
    }
}

/// Loaded tables by configuration name
pub struct TablebaseRegistry {
    tables: BTreeMap<String, Tablebase>,
    max_iterations: u32,
}

impl Default for TablebaseRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl TablebaseRegistry {
    pub fn new(max_iterations: u32) -> Self {
        Self {
            tables: BTreeMap::new(),
            max_iterations,
        }
    }

    pub fn insert(&mut self, table: Tablebase) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Tablebase> {
        self.tables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    /// Load a JSON table from disk and register it
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<&Tablebase> {
        let path = path.as_ref();
        let table = Tablebase::load(path)?;
        info!("loaded tablebase {} ({} entries) from {}", table.name, table.size(), path.display());
        let name = table.name.clone();
        self.insert(table);
        self.tables
            .get(&name)
            .ok_or(Error::InvalidTablebaseName(name))
    }

    pub fn save(&self, name: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let table = self
            .get(name)
            .ok_or_else(|| Error::InvalidTablebaseName(name.to_string()))?;
        table.save(path)?;
        info!("saved tablebase {} to {}", name, path.display());
        Ok(())
    }

    /// Generate `config` (and, first, every table its captures and
    /// promotions lead into) unless already loaded
    pub fn generate(&mut self, config: &TablebaseConfig) -> Result<&Tablebase> {
        if !config.is_supported() {
            return Err(Error::UnsupportedConfiguration(config.name.clone()));
        }
        if !self.contains(&config.name) {
            for sub in config.sub_configurations() {
                if !self.contains(&sub.name) {
                    self.generate(&sub)?;
                }
            }
            let table = Generator::new(config)
                .with_max_iterations(self.max_iterations)
                .with_subtables(self)
                .run();
            self.insert(table);
        }
        self.tables
            .get(&config.name)
            .ok_or_else(|| Error::UnsupportedConfiguration(config.name.clone()))
    }

    pub fn generate_by_name(&mut self, name: &str) -> Result<&Tablebase> {
        let config = TablebaseConfig::from_name(name)?;
        self.generate(&config)
    }

    /// Entry for `pos` with `side_to_move`, if its table is loaded
    pub fn probe(&self, pos: &Position, side_to_move: Color) -> Option<ProbeHit> {
        let (config, stronger) = classify(pos)?;
        let table = self.tables.get(&config.name)?;
        let (key, color_swapped) = match stronger {
            Color::White => (tablebase_key(pos, side_to_move), false),
            Color::Black => (
                tablebase_key(&pos.color_swapped(), side_to_move.opposite()),
                true,
            ),
        };
        let entry = *table.get(&key)?;
        Some(ProbeHit {
            table: config.name,
            entry,
            color_swapped,
        })
    }

    /// Recorded winning move, matched against the legal moves
    pub fn best_move(&self, pos: &Position, side_to_move: Color) -> Option<Move> {
        let stored = self.probe(pos, side_to_move)?.best_move()?;
        all_legal_moves(pos, side_to_move)
            .into_iter()
            .find(|mv| stored.matches(mv))
    }

    pub fn score(&self, pos: &Position, side_to_move: Color) -> Option<i32> {
        self.probe(pos, side_to_move).map(|hit| hit.entry.score())
    }

    pub fn statistics(&self) -> TablebaseStatistics {
        let tables: Vec<TablebaseStat> = self
            .tables
            .values()
            .map(|table| {
                let (wins, draws, losses) = table.counts();
                TablebaseStat {
                    name: table.name.clone(),
                    size: table.size(),
                    wins,
                    draws,
                    losses,
                    generation_time_ms: table.metadata.generation_time_ms,
                }
            })
            .collect();
        TablebaseStatistics {
            total_entries: tables.iter().map(|t| t.size).sum(),
            tables,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
