//! Engine configuration
//!
//! Every tunable constant lives here. All fields have defaults, so a JSON
//! file only needs to mention what it changes.

use crate::ai::Difficulty;
use crate::book::BookLookupOptions;
use crate::eval::EvalWeights;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Search parameters for one difficulty level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyPreset {
    pub depth: u32,
    pub use_quiescence: bool,
    /// With a budget the search deepens iteratively up to `depth`
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Extra plies quiescence may add beyond the nominal depth
    pub quiescence_max_depth: u32,
    pub tt_max_entries: usize,
    /// Share of the table dropped when it fills up
    pub tt_evict_fraction: f64,
    pub easy: DifficultyPreset,
    pub medium: DifficultyPreset,
    pub hard: DifficultyPreset,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            quiescence_max_depth: 8,
            tt_max_entries: 100_000,
            tt_evict_fraction: 0.5,
            easy: DifficultyPreset {
                depth: 2,
                use_quiescence: false,
                time_limit_ms: None,
            },
            medium: DifficultyPreset {
                depth: 4,
                use_quiescence: true,
                time_limit_ms: None,
            },
            hard: DifficultyPreset {
                depth: 6,
                use_quiescence: true,
                time_limit_ms: Some(5_000),
            },
        }
    }
}

impl SearchConfig {
    pub fn preset(&self, difficulty: Difficulty) -> DifficultyPreset {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablebaseSettings {
    /// Cap on retrograde passes
    pub max_iterations: u32,
    /// Use loaded tables as exact scores inside the search tree
    pub probe_in_search: bool,
}

impl Default for TablebaseSettings {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            probe_in_search: true,
        }
    }
}

/// Top-level engine configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub eval: EvalWeights,
    pub tablebase: TablebaseSettings,
    pub book: BookLookupOptions,
}

impl EngineConfig {
    /// Load from a JSON file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .with_context(|| format!("failed to write config {}", path.display()))
    }

    /// Fix the book sampling seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.book.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.quiescence_max_depth, 8);
        assert_eq!(config.search.tt_max_entries, 100_000);
        assert_eq!(config.search.preset(Difficulty::Easy).depth, 2);
        assert!(!config.search.preset(Difficulty::Easy).use_quiescence);
        assert_eq!(config.search.preset(Difficulty::Hard).time_limit_ms, Some(5_000));
        assert_eq!(config.tablebase.max_iterations, 500);
        assert_eq!(config.eval.mobility, 2);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{"search": {"quiescence_max_depth": 4}, "eval": {"centrality": 7}}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.search.quiescence_max_depth, 4);
        assert_eq!(config.search.tt_max_entries, 100_000);
        assert_eq!(config.eval.centrality, 7);
        assert_eq!(config.eval.check_penalty, 50);
        assert!(config.tablebase.probe_in_search);
    }

    #[test]
    fn test_save_load_round_trip() {
        let path = std::env::temp_dir().join(format!("underchex-config-{}.json", std::process::id()));
        let config = EngineConfig::default().with_seed(7);
        config.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/underchex.json").unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
