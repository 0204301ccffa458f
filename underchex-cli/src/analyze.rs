//! Analyze command - search a position reached by a move list
//!
//! - Level 1: run() - orchestration
//! - Level 2: replay_moves(), analyze_position(), report()
//! - Level 3: parse_move()

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde_json::json;

use underchex_core::{
    ChosenMove, Difficulty, EngineConfig, EngineContext, GameState, Hex, MoveSource, PieceType,
    SearchOptions,
};

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Difficulty preset used to pick the move
    #[arg(long, conflicts_with = "depth")]
    pub difficulty: Option<Difficulty>,

    /// Fixed search depth with quiescence; skips book and tablebase
    #[arg(long)]
    pub depth: Option<u32>,

    /// Moves from the starting position, e.g. 0,2-0,1 0,-2-0,-1
    #[arg(long, num_args = 1.., value_name = "q,r-q,r")]
    pub moves: Vec<String>,

    /// Tablebase JSON files to load first
    #[arg(long, value_name = "FILE")]
    pub tablebase: Vec<PathBuf>,

    /// Opening book JSON file
    #[arg(long, value_name = "FILE")]
    pub book: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: AnalyzeArgs, config: EngineConfig) -> Result<()> {
    let game = replay_moves(&args.moves)?;
    if game.is_over() {
        bail!("game is already over: {:?}", game.status);
    }

    let mut engine = EngineContext::new(config);
    for file in &args.tablebase {
        engine
            .load_tablebase(file)
            .with_context(|| format!("Failed to load tablebase {}", file.display()))?;
    }
    if let Some(book) = &args.book {
        engine
            .load_book(book)
            .with_context(|| format!("Failed to load opening book {}", book.display()))?;
    }

    let chosen = analyze_position(&mut engine, &game, &args)
        .ok_or_else(|| anyhow!("no legal moves in this position"))?;
    report(&game, &chosen, args.json);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn replay_moves(moves: &[String]) -> Result<GameState> {
    let mut game = GameState::new();
    for (ply, text) in moves.iter().enumerate() {
        let (from, to, promotion) = parse_move(text)?;
        game = game
            .make_move(from, to, promotion)
            .with_context(|| format!("move {} ({}) rejected", ply + 1, text))?;
    }
    Ok(game)
}

fn analyze_position(engine: &mut EngineContext, game: &GameState, args: &AnalyzeArgs) -> Option<ChosenMove> {
    match args.depth {
        Some(depth) => {
            let options = SearchOptions::depth(depth).with_quiescence(true);
            let result = engine.search(&game.position, game.turn, &options);
            Some(ChosenMove {
                mv: result.best_move?,
                source: MoveSource::Search,
                score: Some(result.score),
                search: Some(result),
            })
        }
        None => {
            let difficulty = args.difficulty.unwrap_or(Difficulty::Medium);
            engine.choose_move(&game.position, game.turn, difficulty)
        }
    }
}

fn report(game: &GameState, chosen: &ChosenMove, as_json: bool) {
    if as_json {
        let output = json!({
            "position": game.position.canonical_key(),
            "turn": game.turn,
            "inCheck": game.is_in_check(),
            "bestMove": chosen.mv.to_string(),
            "source": format!("{:?}", chosen.source).to_lowercase(),
            "score": chosen.score,
            "stats": chosen.search.as_ref().map(|s| s.stats),
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
        return;
    }

    println!("Position: {}", game.position.canonical_key());
    println!("To move: {}{}", game.turn, if game.is_in_check() { " (in check)" } else { "" });
    println!("Best move: {} [{:?}]", chosen.mv, chosen.source);
    if let Some(score) = chosen.score {
        println!("Score: {}", score);
    }
    if let Some(result) = &chosen.search {
        let s = result.stats;
        println!(
            "Nodes: {} (quiescence {}), cutoffs: {}, TT hits: {}, depth: {}",
            s.nodes_searched, s.quiescence_nodes, s.cutoffs, s.tt_hits, s.depth_reached
        );
    }
}

// ============================================================================
// LEVEL 3 - PARSING
// ============================================================================

/// Parse `q,r-q,r` with an optional `=Q|C|L|N` promotion suffix
fn parse_move(text: &str) -> Result<(Hex, Hex, Option<PieceType>)> {
    let (body, promotion) = match text.split_once('=') {
        Some((body, promo)) => {
            let mut chars = promo.chars();
            let piece = match (chars.next(), chars.next()) {
                (Some(c), None) => PieceType::from_abbrev(c.to_ascii_uppercase())
                    .filter(|pt| pt.is_promotion_target()),
                _ => None,
            }
            .ok_or_else(|| anyhow!("invalid promotion in {}", text))?;
            (body, Some(piece))
        }
        None => (text, None),
    };

    let (from, to) = body
        .split_once(")-(")
        .or_else(|| split_coords(body))
        .ok_or_else(|| anyhow!("expected q,r-q,r, got {}", text))?;
    Ok((parse_hex(from)?, parse_hex(to)?, promotion))
}

/// Split at the dash separating the two coordinates, not a minus sign
fn split_coords(body: &str) -> Option<(&str, &str)> {
    let comma = body.find(',')?;
    let dash = body[comma..].find('-')? + comma;
    // A dash right after the comma is the sign of r
    let dash = if dash == comma + 1 {
        body[dash + 1..].find('-')? + dash + 1
    } else {
        dash
    };
    Some((&body[..dash], &body[dash + 1..]))
}

fn parse_hex(text: &str) -> Result<Hex> {
    let text = text.trim_matches(|c| c == '(' || c == ')');
    let (q, r) = text
        .split_once(',')
        .ok_or_else(|| anyhow!("expected q,r, got {}", text))?;
    let q: i8 = q.trim().parse().with_context(|| format!("bad q in {}", text))?;
    let r: i8 = r.trim().parse().with_context(|| format!("bad r in {}", text))?;
    let hex = Hex::new(q, r);
    if !hex.is_valid() {
        bail!("{} is off the board", hex);
    }
    Ok(hex)
}
