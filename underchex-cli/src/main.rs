//! Underchex CLI - Command-line interface
//!
//! Commands:
//! - tablebase: generate endgame tablebases or summarize saved ones
//! - analyze: search a position reached from the starting setup
//! - book: build an opening book from self-play
//! - conformance: run a cross-implementation test suite

mod analyze;
mod book_cmd;
mod conformance_cmd;
mod tablebase_cmd;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use underchex_core::EngineConfig;

#[derive(Parser)]
#[command(name = "underchex")]
#[command(about = "Underchex hexagonal chess engine")]
struct Cli {
    /// Engine configuration JSON file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed for anything random (book sampling, self-play openings)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Endgame tablebase tools
    #[command(subcommand)]
    Tablebase(tablebase_cmd::TablebaseCommand),
    /// Analyze a position
    Analyze(analyze::AnalyzeArgs),
    /// Opening book tools
    #[command(subcommand)]
    Book(book_cmd::BookCommand),
    /// Run a conformance suite
    Conformance(conformance_cmd::ConformanceArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.seed)?;

    match cli.command {
        Commands::Tablebase(cmd) => tablebase_cmd::run(cmd, &config),
        Commands::Analyze(args) => analyze::run(args, config),
        Commands::Book(cmd) => book_cmd::run(cmd, config, cli.seed),
        Commands::Conformance(args) => conformance_cmd::run(args, &config),
    }
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    Ok(match seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    })
}
