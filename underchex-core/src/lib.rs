//! Underchex Core - Hexagonal chess engine
//!
//! This crate provides the game logic and AI for Underchex:
//! - Board geometry (61-cell hexagon, axial coordinates)
//! - Piece movement, attack detection and legal move generation
//! - Game state with checkmate/stalemate detection
//! - Static evaluation and alpha-beta search with a transposition table
//! - Endgame tablebases built by retrograde analysis
//! - Opening book built from finished games
//! - Cross-implementation conformance cases

pub mod board;
pub mod pieces;
pub mod error;
pub mod position;
pub mod movegen;
pub mod game;
pub mod eval;
pub mod tt;
pub mod ai;
pub mod tablebase;
pub mod book;
pub mod config;
pub mod engine;
pub mod conformance;

// Re-exports for convenient access
pub use board::{Direction, Hex, BOARD_RADIUS, NUM_CELLS};
pub use pieces::{Color, LanceVariant, Piece, PieceType};
pub use error::{Error, Result};
pub use position::Position;
pub use movegen::{
    all_legal_moves, apply_move, is_attacked, is_in_check, validate_move, IllegalReason, Move,
    MoveValidation,
};
pub use game::{starting_position, GameState, GameStatus, MoveRejection};
pub use eval::{evaluate, evaluate_for_color, EvalWeights, CHECKMATE_VALUE};
pub use ai::{Difficulty, SearchOptions, SearchResult, SearchStats};
pub use tablebase::{
    detect_configuration, generate_tablebase, ProbeHit, Tablebase, TablebaseConfig,
    TablebaseEntry, TablebaseRegistry, Wdl,
};
pub use book::{BookGenerationOptions, BookLookupOptions, GameForBook, OpeningBook};
pub use config::EngineConfig;
pub use engine::{ChosenMove, EngineContext, MoveSource};
