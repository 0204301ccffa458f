//! Conformance command - run a shared JSON test suite

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use underchex_core::conformance::{run_case, ConformanceSuite};
use underchex_core::{EngineConfig, TablebaseRegistry};

#[derive(Args)]
pub struct ConformanceArgs {
    /// Suite JSON file with a testCases array
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Skip cases that need a generated tablebase
    #[arg(long)]
    pub skip_tablebase: bool,
}

pub fn run(args: ConformanceArgs, config: &EngineConfig) -> Result<()> {
    let suite = ConformanceSuite::load(&args.file)
        .with_context(|| format!("Failed to load suite {}", args.file.display()))?;
    let mut registry = TablebaseRegistry::new(config.tablebase.max_iterations);

    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for case in &suite.test_cases {
        if args.skip_tablebase && case.needs_tablebase() {
            skipped += 1;
            continue;
        }
        let outcome = run_case(case, &mut registry);
        if outcome.passed {
            passed += 1;
            println!("PASS {}", outcome.id);
        } else {
            failed += 1;
            println!("FAIL {}: {}", outcome.id, outcome.detail);
        }
    }

    println!("{} passed, {} failed, {} skipped", passed, failed, skipped);
    if failed > 0 {
        bail!("{} conformance case(s) failed", failed);
    }
    Ok(())
}
