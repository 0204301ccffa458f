//! Integration tests for the underchex binary
//!
//! Runs the real executable against temporary files

use std::path::PathBuf;
use std::process::{Command, Output};

// ============================================================================
// TEST FIXTURES
// ============================================================================

fn underchex(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_underchex"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run underchex")
}

fn temp_file(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("underchex-cli-{}-{}", std::process::id(), name))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_tablebase_generate_and_stats() {
    let path = temp_file("kvk.json");
    let path_str = path.to_str().unwrap();

    let output = underchex(&["tablebase", "generate", "KvK", "--output", path_str]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout(&output).contains("KvK:"));

    let output = underchex(&["tablebase", "stats", path_str]);
    std::fs::remove_file(&path).ok();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Draws:"));
    assert!(text.contains("Wins: 0"));
}

#[test]
fn test_tablebase_rejects_bad_name() {
    let output = underchex(&["tablebase", "generate", "KQvKQ"]);
    assert!(!output.status.success());
}

#[test]
fn test_analyze_json_output() {
    let output = underchex(&["analyze", "--depth", "1", "--moves", "0,2-0,1", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["turn"], "black");
    assert_eq!(value["source"], "search");
    assert!(value["stats"]["nodes_searched"].as_u64().unwrap() > 0);
}

#[test]
fn test_analyze_rejects_illegal_move() {
    let output = underchex(&["analyze", "--depth", "1", "--moves", "0,2-0,-3"]);
    assert!(!output.status.success());
}

#[test]
fn test_conformance_suite() {
    let path = temp_file("suite.json");
    std::fs::write(
        &path,
        r#"{"testCases": [
            {"type": "boardValidation", "id": "b1", "input": {"q": 0, "r": 0}, "expected": {"valid": true}},
            {"type": "moveValidation", "id": "m1",
             "setup": {"pieces": [{"piece": "king", "color": "white", "q": 0, "r": 0}], "turn": "black"},
             "move": {"from": {"q": 0, "r": 0}, "to": {"q": 0, "r": -1}},
             "expected": {"legal": false, "reason": "notYourPiece"}}
        ]}"#,
    )
    .unwrap();

    let output = underchex(&["conformance", path.to_str().unwrap()]);
    std::fs::remove_file(&path).ok();
    assert!(output.status.success(), "{}", stdout(&output));
    assert!(stdout(&output).contains("2 passed, 0 failed"));
}

#[test]
fn test_book_generate_seeded() {
    let path = temp_file("book.json");
    let output = underchex(&[
        "--seed",
        "7",
        "book",
        "generate",
        "--games",
        "3",
        "--depth",
        "1",
        "--max-plies",
        "6",
        "--min-count",
        "1",
        "--output",
        path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["metadata"]["gamesCount"], 3);
    assert!(!value["entries"].as_array().unwrap().is_empty());
}
