//! tests/cli.rs — binaire `pine2js` de bout en bout
//!
//! Chaque test travaille dans un dossier temporaire (aucun `pine2js.toml`
//! du dépôt n'est ramassé) avec un environnement `PINE*` neutralisé.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use indoc::indoc;

// -----------------------------------------------------------------------------
// Helpers de test
// -----------------------------------------------------------------------------

const SCRIPT: &str = indoc! {r#"
    //@version=5
    indicator("Moyennes")
    fast = ta.sma(close, 9)
    plot(fast, title = "Rapide")
"#};

fn pine2js(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pine2js"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("PINE_REVIEWER_CMD")
        .env_remove("PINE_INDENT")
        .env_remove("PINE_COMMENTS")
        .env_remove("PINE_RUNTIME")
        .env("PINE2JS_NODE_BIN", "pine2js-node-introuvable")
        .output()
        .expect("lancement de pine2js")
}

fn workspace(script: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("demo.pine"), script).expect("écriture du script");
    dir
}

fn stdout(o: &Output) -> String {
    String::from_utf8_lossy(&o.stdout).into_owned()
}

fn stderr(o: &Output) -> String {
    String::from_utf8_lossy(&o.stderr).into_owned()
}

// -----------------------------------------------------------------------------
// Cas
// -----------------------------------------------------------------------------

#[test]
fn writes_the_output_file() {
    let dir = workspace(SCRIPT);
    let out = pine2js(dir.path(), &["demo.pine", "build/demo.js"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let js = fs::read_to_string(dir.path().join("build/demo.js")).expect("sortie écrite");
    assert!(js.contains("function main(bars, state) {"));
    assert!(js.contains(r#"pinescript.plot(fast, { title: "Rapide" });"#));
    assert!(stdout(&out).is_empty());
}

#[test]
fn prints_to_stdout_without_output() {
    let dir = workspace(SCRIPT);
    let out = pine2js(dir.path(), &["demo.pine"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("export { main };"));
}

#[test]
fn failure_exits_with_stage_and_message() {
    let dir = workspace("x = \"jamais fermée\n");
    let out = pine2js(dir.path(), &["demo.pine", "demo.js"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Échec (lexer)"));
    assert!(!dir.path().join("demo.js").exists());
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = pine2js(dir.path(), &["absent.pine"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("lecture absent.pine"));
}

#[test]
fn ast_dump_is_json() {
    let dir = workspace(SCRIPT);
    let out = pine2js(dir.path(), &["demo.pine", "demo.js", "--ast"]);
    assert!(out.status.success());
    let ast: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("AST JSON");
    assert_eq!(ast["version"], 5);
    assert!(ast["body"].is_array());
}

#[test]
fn json_mode_reports_failures() {
    let dir = workspace("a = 1\nb = (2 + 3]\n");
    let out = pine2js(dir.path(), &["demo.pine", "--json"]);
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).expect("JSON");
    assert_eq!(v["success"], false);
    assert_eq!(v["stage"], "parser");
    assert_eq!(v["line"], 2);
}

#[test]
fn no_comments_strips_comment_lines() {
    let dir = workspace(SCRIPT);
    let out = pine2js(dir.path(), &["demo.pine", "--no-comments"]);
    assert!(out.status.success());
    let js = stdout(&out);
    assert!(!js.lines().any(|l| l.trim_start().starts_with("//")));
}

#[test]
fn config_output_dir_is_used() {
    let dir = workspace(SCRIPT);
    fs::write(dir.path().join("pine2js.toml"), "[output]\ndir = \"dist\"\n").expect("config");
    let out = pine2js(dir.path(), &["demo.pine"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(dir.path().join("dist/demo.js").is_file());
}

#[test]
fn review_without_node_passes_with_a_note() {
    let dir = workspace(SCRIPT);
    let out = pine2js(dir.path(), &["demo.pine", "demo.js", "--review"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("Review: PASS"));
    assert!(err.contains("Notes:"));
    assert!(err.contains("pine2js-node-introuvable"));
}
