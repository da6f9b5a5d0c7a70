//! tests/integration.rs — propriétés de bout en bout du transpileur
//!
//! Chaque test passe par l'API publique (`transpile*`) : lexer, parser et
//! générateur sont exercés ensemble, comme depuis la CLI.

use indoc::indoc;
use pretty_assertions::assert_eq;

use pine_transpiler::{transpile, transpile_with, CompilerConfig, Stage, TranspileOutcome};

// -----------------------------------------------------------------------------
// Helpers de test
// -----------------------------------------------------------------------------

fn code(src: &str) -> String {
    let cfg = CompilerConfig { runtime_prelude: false, ..CompilerConfig::default() };
    match transpile_with(src, &cfg) {
        TranspileOutcome::Success(t) => t.code,
        TranspileOutcome::Failure(e) => panic!("échec inattendu ({}): {e}", e.stage()),
    }
}

fn failure_stage(src: &str) -> Stage {
    transpile(src).error().map(|e| e.stage()).expect("échec attendu")
}

fn sample_script() -> &'static str {
    indoc! {r#"
        //@version=5
        indicator("Croisement RSI", overlay = false)

        length = input.int(14, "Period", minval = 1)
        src = input.source(close, "Source")

        r = ta.rsi(src, length)
        var float peak = na
        peak := na(peak) ? r : math.max(peak, r)

        zone = switch
            r > 70 => "haut"
            r < 30 => "bas"
            => "neutre"

        if ta.crossover(r, 50)
            alert("RSI > 50", alert.freq_once_per_bar)

        plot(r, title = "RSI", color = color.new(color.purple, 0))
        hline(70, "Surachat")
    "#}
}

// -----------------------------------------------------------------------------
// Propriétés
// -----------------------------------------------------------------------------

#[test]
fn output_is_deterministic() {
    let a = transpile(sample_script());
    let b = transpile(sample_script());
    assert!(a.is_success());
    assert_eq!(a.code(), b.code());
}

#[test]
fn history_reads_never_index_directly() {
    let out = code("plot(close[1])\nx = high[2] - low[2]\n");
    assert!(out.contains("pinescript.plot(pinescript.offset(close, 1));"));
    assert!(out.contains("pinescript.offset(high, 2) - pinescript.offset(low, 2)"));
    assert!(!out.contains("close[1]"));
}

#[test]
fn persistent_init_is_guarded() {
    let out = code("var int bars = 0\nbars := bars + 1\n");
    assert_eq!(out.matches("if (state.bars === undefined) state.bars = 0;").count(), 1);
    assert!(out.contains("state.bars = state.bars + 1;"));
}

#[test]
fn first_switch_arm_wins() {
    let out = code(sample_script());
    let high = out.find(r#"(r > 70) ? "haut""#).expect("bras 1");
    let low = out.find(r#"(r < 30) ? "bas""#).expect("bras 2");
    assert!(high < low);
    assert!(out.contains(r#": "neutre")"#));
}

#[test]
fn named_arguments_follow_positionals() {
    let out = code(sample_script());
    assert!(out.contains(
        r#"pinescript.plot(r, { title: "RSI", color: pinescript.color.new(pinescript.color.purple, 0) });"#
    ));
    assert!(out.contains(r#"length = pinescript.input.int(14, "Period", { minval: 1 });"#));
}

#[test]
fn multiline_calls_survive_indentation() {
    let src = indoc! {r#"
        plot(close,
             title = "Close",
               color = color.blue)
        x = ta.sma(close,
           20)
    "#};
    let out = code(src);
    assert!(out.contains(r#"pinescript.plot(close, { title: "Close", color: pinescript.color.blue });"#));
    assert!(out.contains("let x = pinescript.sma(close, 20);"));
}

#[test]
fn strategy_keyword_depends_on_context() {
    let src = indoc! {r#"
        strategy("T", overlay = true)
        if ta.crossover(close, open)
            strategy.entry("L", strategy.long)
    "#};
    let out = code(src);
    assert!(out.contains(r#"pinescript.strategy("T", { overlay: true });"#));
    assert!(out.contains(r#"pinescript.strategyEntry("L", pinescript.strategy.long);"#));
}

#[test]
fn input_assignment_declares_the_name() {
    let out = code("length = input.int(14, \"Period\")\n");
    assert!(out.contains("let length;"));
    assert!(out.contains("export { main, length };"));
}

#[test]
fn both_branches_assign_the_same_local() {
    let src = indoc! {"
        x = 0
        if close > open
            x := 1
        else
            x := 2
        plot(x)
    "};
    let out = code(src);
    assert!(out.contains("let x = 0;"));
    assert!(out.contains("x = 1;"));
    assert!(out.contains("x = 2;"));
    assert!(out.contains("} else {"));
}

#[test]
fn lexical_failures_report_the_lexer_stage() {
    assert_eq!(failure_stage("s = \"jamais fermée\n"), Stage::Lexer);
    assert_eq!(failure_stage("x = 1 @ 2\n"), Stage::Lexer);
}

#[test]
fn syntax_failures_report_the_parser_stage() {
    let out = transpile("a = 1\nb = (2 + 3]\n");
    let err = out.error().expect("échec attendu");
    assert_eq!(err.stage(), Stage::Parser);
    assert_eq!(err.line(), 2);
}

#[test]
fn full_script_uses_the_runtime_prelude() {
    let out = transpile(sample_script());
    let js = out.code().expect("transpile ok");
    assert!(js.contains("const pinescript = {};"));
    assert!(js.contains(r#"pinescript.indicator("Croisement RSI", { overlay: false });"#));
    assert!(js.contains("function main(bars, state) {"));
    assert!(js.contains("export { main, length, src };"));
}

#[test]
fn warnings_do_not_block_generation() {
    let t = transpile("x = ta.sma(close)\n").into_result().expect("transpile ok");
    assert_eq!(t.warnings.len(), 1);
    assert!(t.code.contains("pinescript.sma(close)"));
}
