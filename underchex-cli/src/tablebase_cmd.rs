//! Tablebase command - generate tables and summarize saved ones

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use underchex_core::{EngineConfig, TablebaseRegistry};

#[derive(Subcommand)]
pub enum TablebaseCommand {
    /// Generate a table such as KQvK (plus the tables it depends on)
    Generate(GenerateArgs),
    /// Print statistics for saved tables
    Stats(StatsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Configuration name, e.g. KQvK or KLNvK
    pub name: String,

    /// Write the table as JSON
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Tablebase JSON files
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

pub fn run(cmd: TablebaseCommand, config: &EngineConfig) -> Result<()> {
    match cmd {
        TablebaseCommand::Generate(args) => generate(args, config),
        TablebaseCommand::Stats(args) => stats(args),
    }
}

fn generate(args: GenerateArgs, config: &EngineConfig) -> Result<()> {
    let mut registry = TablebaseRegistry::new(config.tablebase.max_iterations);
    let name = registry
        .generate_by_name(&args.name)
        .with_context(|| format!("Failed to generate tablebase {}", args.name))?
        .name
        .clone();

    if let Some(output) = &args.output {
        registry
            .save(&name, output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
    }

    println!("=== Endgame Tablebase Statistics ===");
    print!("{}", registry.statistics());
    Ok(())
}

fn stats(args: StatsArgs) -> Result<()> {
    let mut registry = TablebaseRegistry::default();
    for file in &args.files {
        registry
            .load(file)
            .with_context(|| format!("Failed to load tablebase {}", file.display()))?;
    }
    println!("=== Endgame Tablebase Statistics ===");
    print!("{}", registry.statistics());
    Ok(())
}
