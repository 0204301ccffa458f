//! Book command - build an opening book from self-play
//!
//! - Level 1: run() - orchestration
//! - Level 2: play_games(), report_statistics()
//! - Level 3: play_single_game()

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use underchex_core::book::BookStatistics;
use underchex_core::eval::evaluate;
use underchex_core::{
    starting_position, BookGenerationOptions, Color, EngineConfig, EngineContext, GameForBook,
    GameState, OpeningBook, SearchOptions,
};

#[derive(Subcommand)]
pub enum BookCommand {
    /// Play self-play games and build a book from them
    Generate(GenerateArgs),
    /// Print statistics for a saved book
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Number of self-play games
    #[arg(long, default_value = "20")]
    pub games: usize,

    /// Output JSON file
    #[arg(long, value_name = "FILE")]
    pub output: PathBuf,

    /// Search depth for self-play moves
    #[arg(long, default_value = "2")]
    pub depth: u32,

    /// Random moves at the start of each game, for variety
    #[arg(long, default_value = "4")]
    pub random_plies: usize,

    /// Maximum plies per game
    #[arg(long, default_value = "80")]
    pub max_plies: usize,

    /// Plies per game recorded in the book
    #[arg(long, default_value = "20")]
    pub book_depth: usize,

    /// Minimum visits for a position to stay in the book
    #[arg(long, default_value = "2")]
    pub min_count: u32,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Opening book JSON file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(cmd: BookCommand, config: EngineConfig, seed: Option<u64>) -> Result<()> {
    match cmd {
        BookCommand::Generate(args) => generate(args, config, seed),
        BookCommand::Stats(args) => {
            let book = OpeningBook::load(&args.file)
                .with_context(|| format!("Failed to load opening book {}", args.file.display()))?;
            report_statistics(&book.statistics());
            Ok(())
        }
    }
}

fn generate(args: GenerateArgs, config: EngineConfig, seed: Option<u64>) -> Result<()> {
    tracing::info!(
        "Playing {} self-play games (depth={}, random plies={})",
        args.games,
        args.depth,
        args.random_plies
    );

    let games = play_games(&args, config, seed);
    let options = BookGenerationOptions {
        max_depth: args.book_depth,
        min_position_count: args.min_count,
    };
    let book = OpeningBook::generate(&games, &starting_position(), &options);
    book.save(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    report_statistics(&book.statistics());
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn play_games(args: &GenerateArgs, config: EngineConfig, seed: Option<u64>) -> Vec<GameForBook> {
    let mut rng = match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    };
    let mut engine = EngineContext::new(config);

    let progress = ProgressBar::new(args.games as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} games {msg}") {
        progress.set_style(style);
    }

    let mut games = Vec::with_capacity(args.games);
    for _ in 0..args.games {
        let game = play_single_game(&mut engine, args, &mut rng);
        progress.set_message(match game.result {
            1 => "white won",
            -1 => "black won",
            _ => "draw",
        });
        progress.inc(1);
        games.push(game);
    }
    progress.finish_and_clear();
    games
}

fn report_statistics(stats: &BookStatistics) {
    println!("=== Opening Book Statistics ===");
    println!("Positions: {}", stats.position_count);
    println!("Move entries: {}", stats.total_move_entries);
    println!("Avg moves per position: {:.2}", stats.avg_moves_per_position);
    println!("Max depth: {}", stats.max_depth);
    println!("Games: {}", stats.games_count);
    println!("Highest play count: {}", stats.highest_play_count);
    if let Some(key) = &stats.most_visited_position {
        println!("Most visited position: {}", key);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// One game: random opening plies, then fixed-depth search for both sides
fn play_single_game(engine: &mut EngineContext, args: &GenerateArgs, rng: &mut ChaCha8Rng) -> GameForBook {
    let mut state = GameState::new();
    let mut evaluations = Vec::new();
    let options = SearchOptions::depth(args.depth);

    while !state.is_over() && state.history.len() < args.max_plies {
        let (mv, white_eval) = if state.history.len() < args.random_plies {
            let Some(mv) = state.legal_moves().choose(rng).copied() else {
                break;
            };
            (mv, evaluate(&state.position, &engine.config().eval))
        } else {
            let result = engine.search(&state.position, state.turn, &options);
            let Some(mv) = result.best_move else {
                break;
            };
            let white_eval = match state.turn {
                Color::White => result.score,
                Color::Black => -result.score,
            };
            (mv, white_eval)
        };

        match state.apply(&mv) {
            Ok(next) => state = next,
            Err(_) => break,
        }
        evaluations.push(white_eval as f64);
    }
    engine.clear_transposition_table();

    let result = match state.status.winner() {
        Some(Color::White) => 1,
        Some(Color::Black) => -1,
        None => 0,
    };
    GameForBook {
        moves: state.history,
        result,
        evaluations: Some(evaluations),
    }
}
