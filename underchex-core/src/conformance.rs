//! Cross-implementation conformance cases
//!
//! Loads the shared JSON test suite and checks each case against this
//! engine. Tablebase cases generate whatever table they need through the
//! registry passed in.

use crate::board::Hex;
use crate::error::Result;
use crate::movegen::{apply_move, validate_move, IllegalReason, MoveValidation};
use crate::pieces::{Color, LanceVariant, Piece, PieceType};
use crate::position::Position;
use crate::tablebase::{detect_configuration, TablebaseRegistry, Wdl};
use serde::Deserialize;

// ============================================================================
// CASE MODEL
// ============================================================================

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConformanceSuite {
    pub test_cases: Vec<ConformanceCase>,
}

impl ConformanceSuite {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ConformanceCase {
    #[serde(rename = "boardValidation")]
    BoardValidation(BoardValidationCase),
    #[serde(rename = "moveValidation")]
    MoveValidation(MoveValidationCase),
    #[serde(rename = "tablebaseConfig")]
    TablebaseConfig(TablebaseConfigCase),
    #[serde(rename = "tablebaseWDL")]
    TablebaseWdl(TablebaseWdlCase),
    #[serde(rename = "tablebaseMove")]
    TablebaseMove(TablebaseMoveCase),
}

impl ConformanceCase {
    pub fn id(&self) -> &str {
        match self {
            ConformanceCase::BoardValidation(c) => &c.id,
            ConformanceCase::MoveValidation(c) => &c.id,
            ConformanceCase::TablebaseConfig(c) => &c.id,
            ConformanceCase::TablebaseWdl(c) => &c.id,
            ConformanceCase::TablebaseMove(c) => &c.id,
        }
    }

    /// Whether running the case may generate a tablebase
    pub fn needs_tablebase(&self) -> bool {
        matches!(
            self,
            ConformanceCase::TablebaseWdl(_) | ConformanceCase::TablebaseMove(_)
        )
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Coord {
    pub q: i32,
    pub r: i32,
}

impl Coord {
    fn hex(self) -> Option<Hex> {
        let q = i8::try_from(self.q).ok()?;
        let r = i8::try_from(self.r).ok()?;
        Some(Hex::new(q, r))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Placement {
    pub piece: PieceType,
    pub color: Color,
    pub q: i32,
    pub r: i32,
    #[serde(default)]
    pub variant: Option<LanceVariant>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Setup {
    pub pieces: Vec<Placement>,
    #[serde(default)]
    pub turn: Option<Color>,
}

impl Setup {
    pub fn position(&self) -> std::result::Result<Position, String> {
        let mut pos = Position::empty();
        for p in &self.pieces {
            let hex = Coord { q: p.q, r: p.r }
                .hex()
                .ok_or_else(|| format!("coordinate {},{} out of range", p.q, p.r))?;
            let piece = match (p.piece, p.variant) {
                (PieceType::Lance, Some(variant)) => Piece::lance(p.color, variant),
                (piece_type, _) => Piece::new(piece_type, p.color),
            };
            pos.insert(hex, piece).map_err(|e| e.to_string())?;
        }
        Ok(pos)
    }

    fn turn(&self) -> Color {
        self.turn.unwrap_or(Color::White)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BoardValidationCase {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub input: Coord,
    pub expected: BoardExpected,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BoardExpected {
    pub valid: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MoveValidationCase {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub setup: Setup,
    #[serde(rename = "move")]
    pub mv: MoveInput,
    pub expected: MoveExpected,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MoveInput {
    pub from: Coord,
    pub to: Coord,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MoveExpected {
    pub legal: bool,
    #[serde(default)]
    pub capture: Option<bool>,
    #[serde(default)]
    pub reason: Option<IllegalReason>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TablebaseConfigCase {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub setup: Setup,
    pub expected: ConfigExpected,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ConfigExpected {
    #[serde(default)]
    pub config: Option<String>,
    pub supported: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TablebaseWdlCase {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub setup: Setup,
    pub expected: WdlExpected,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WdlExpected {
    pub wdl: Wdl,
    #[serde(default)]
    pub dtm: Option<i32>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TablebaseMoveCase {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub setup: Setup,
    pub expected: TablebaseMoveExpected,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablebaseMoveExpected {
    pub has_move: bool,
    #[serde(default)]
    pub preserves_win: Option<bool>,
}

// ============================================================================
// RUNNER
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseOutcome {
    pub id: String,
    pub passed: bool,
    /// Mismatch description; empty on success
    pub detail: String,
}

impl CaseOutcome {
    fn from_check(id: &str, check: std::result::Result<(), String>) -> Self {
        let (passed, detail) = match check {
            Ok(()) => (true, String::new()),
            Err(detail) => (false, detail),
        };
        Self {
            id: id.to_string(),
            passed,
            detail,
        }
    }
}

pub fn run_case(case: &ConformanceCase, registry: &mut TablebaseRegistry) -> CaseOutcome {
    let check = match case {
        ConformanceCase::BoardValidation(c) => check_board(c),
        ConformanceCase::MoveValidation(c) => check_move(c),
        ConformanceCase::TablebaseConfig(c) => check_config(c),
        ConformanceCase::TablebaseWdl(c) => check_wdl(c, registry),
        ConformanceCase::TablebaseMove(c) => check_tablebase_move(c, registry),
    };
    CaseOutcome::from_check(case.id(), check)
}

pub fn run_suite(suite: &ConformanceSuite, registry: &mut TablebaseRegistry) -> Vec<CaseOutcome> {
    suite
        .test_cases
        .iter()
        .map(|case| run_case(case, registry))
        .collect()
}

fn check_board(case: &BoardValidationCase) -> std::result::Result<(), String> {
    let valid = case.input.hex().is_some_and(|hex| hex.is_valid());
    if valid != case.expected.valid {
        return Err(format!("expected valid={}, got {}", case.expected.valid, valid));
    }
    Ok(())
}

fn check_move(case: &MoveValidationCase) -> std::result::Result<(), String> {
    let pos = case.setup.position()?;
    let (Some(from), Some(to)) = (case.mv.from.hex(), case.mv.to.hex()) else {
        return Err("move coordinates out of range".to_string());
    };
    let result = validate_move(&pos, from, to, case.setup.turn());

    if result.is_legal() != case.expected.legal {
        return Err(format!(
            "expected legal={}, got {:?}",
            case.expected.legal, result
        ));
    }
    match result {
        MoveValidation::Legal { capture } => {
            if let Some(expected) = case.expected.capture.filter(|e| *e != capture) {
                return Err(format!("expected capture={}, got {}", expected, capture));
            }
        }
        MoveValidation::Illegal(reason) => {
            if let Some(expected) = case.expected.reason.filter(|e| *e != reason) {
                return Err(format!(
                    "expected reason={}, got {}",
                    expected.code(),
                    reason.code()
                ));
            }
        }
    }
    Ok(())
}

fn check_config(case: &TablebaseConfigCase) -> std::result::Result<(), String> {
    let pos = case.setup.position()?;
    let config = detect_configuration(&pos);
    match (&config, case.expected.supported) {
        (None, true) => Err("expected a supported configuration".to_string()),
        (Some(found), false) => Err(format!("expected unsupported, got {}", found.name)),
        (Some(found), true) => match &case.expected.config {
            Some(name) if *name != found.name => {
                Err(format!("expected config {}, got {}", name, found.name))
            }
            _ => Ok(()),
        },
        (None, false) => Ok(()),
    }
}

/// Make sure the table for `pos` is loaded
fn ensure_table(pos: &Position, registry: &mut TablebaseRegistry) -> std::result::Result<(), String> {
    let config = detect_configuration(pos).ok_or("position has no supported configuration")?;
    registry.generate(&config).map_err(|e| e.to_string())?;
    Ok(())
}

fn check_wdl(case: &TablebaseWdlCase, registry: &mut TablebaseRegistry) -> std::result::Result<(), String> {
    let pos = case.setup.position()?;
    let turn = case.setup.turn();
    ensure_table(&pos, registry)?;
    let hit = registry
        .probe(&pos, turn)
        .ok_or("position not found in tablebase")?;

    if hit.entry.wdl != case.expected.wdl {
        return Err(format!("expected {}, got {}", case.expected.wdl, hit.entry.wdl));
    }
    if let Some(dtm) = case.expected.dtm.filter(|d| *d != hit.entry.dtm) {
        return Err(format!("expected dtm {}, got {}", dtm, hit.entry.dtm));
    }
    Ok(())
}

fn check_tablebase_move(
    case: &TablebaseMoveCase,
    registry: &mut TablebaseRegistry,
) -> std::result::Result<(), String> {
    let pos = case.setup.position()?;
    let turn = case.setup.turn();
    ensure_table(&pos, registry)?;

    let best = registry.best_move(&pos, turn);
    match (best, case.expected.has_move) {
        (None, true) => return Err("expected a tablebase move".to_string()),
        (Some(mv), false) => return Err(format!("expected no move, got {}", mv)),
        _ => {}
    }

    if let (Some(mv), Some(true)) = (best, case.expected.preserves_win) {
        let child = apply_move(&pos, &mv);
        let reply = registry
            .probe(&child, turn.opposite())
            .ok_or("position after the move not found in tablebase")?;
        if reply.entry.wdl != Wdl::Loss {
            return Err(format!("{} leaves the opponent with {}", mv, reply.entry.wdl));
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"{
        "testCases": [
            {"type": "boardValidation", "id": "b1", "input": {"q": 4, "r": -4}, "expected": {"valid": true}},
            {"type": "boardValidation", "id": "b2", "input": {"q": 3, "r": 2}, "expected": {"valid": false}},
            {"type": "moveValidation", "id": "m1",
             "setup": {"pieces": [{"piece": "king", "color": "white", "q": 0, "r": 0},
                                  {"piece": "queen", "color": "black", "q": 1, "r": -4}], "turn": "white"},
             "move": {"from": {"q": 0, "r": 0}, "to": {"q": 1, "r": 0}},
             "expected": {"legal": false, "reason": "movesIntoCheck"}},
            {"type": "moveValidation", "id": "m2",
             "setup": {"pieces": [{"piece": "lance", "color": "white", "q": 0, "r": 0, "variant": "B"},
                                  {"piece": "pawn", "color": "black", "q": 1, "r": -1}], "turn": "white"},
             "move": {"from": {"q": 0, "r": 0}, "to": {"q": 1, "r": -1}},
             "expected": {"legal": true, "capture": true}},
            {"type": "tablebaseConfig", "id": "c1",
             "setup": {"pieces": [{"piece": "king", "color": "white", "q": 0, "r": 0},
                                  {"piece": "queen", "color": "black", "q": 2, "r": 0},
                                  {"piece": "king", "color": "black", "q": 0, "r": -3}]},
             "expected": {"config": "KQvK", "supported": true}},
            {"type": "tablebaseWDL", "id": "w1",
             "setup": {"pieces": [{"piece": "king", "color": "white", "q": 0, "r": 0},
                                  {"piece": "king", "color": "black", "q": 0, "r": -3}], "turn": "white"},
             "expected": {"wdl": "draw"}}
        ]
    }"#;

    #[test]
    fn test_parse_suite() {
        let suite = ConformanceSuite::from_json(SUITE).unwrap();
        assert_eq!(suite.test_cases.len(), 6);
        assert_eq!(suite.test_cases[2].id(), "m1");
        assert!(suite.test_cases[5].needs_tablebase());
        assert!(!suite.test_cases[4].needs_tablebase());
    }

    #[test]
    fn test_run_suite_passes() {
        let suite = ConformanceSuite::from_json(SUITE).unwrap();
        let mut registry = TablebaseRegistry::default();
        for outcome in run_suite(&suite, &mut registry) {
            assert!(outcome.passed, "{}: {}", outcome.id, outcome.detail);
        }
        assert!(registry.contains("KvK"));
    }

    #[test]
    fn test_mismatch_reports_detail() {
        let json = r#"{"testCases": [
            {"type": "boardValidation", "id": "bad", "input": {"q": 0, "r": 0}, "expected": {"valid": false}}
        ]}"#;
        let suite = ConformanceSuite::from_json(json).unwrap();
        let outcome = run_case(&suite.test_cases[0], &mut TablebaseRegistry::default());
        assert!(!outcome.passed);
        assert_eq!(outcome.id, "bad");
        assert!(outcome.detail.contains("valid=false"));
    }

    #[test]
    fn test_unknown_case_type_is_an_error() {
        let json = r#"{"testCases": [{"type": "perft", "id": "x"}]}"#;
        assert!(ConformanceSuite::from_json(json).is_err());
    }
}
