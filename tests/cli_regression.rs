// Regression test: Ensure CLI errors are rendered with miette diagnostics
// Requires: assert_cmd, predicates crates in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

#[test]
fn cli_reports_miette_diagnostics_on_error() {
    // Create a temporary invalid grammar file
    let bad_file = "tests/bad_rules.grammar";
    fs::write(bad_file, "greeting -> GREETING" /* missing terminator */).unwrap();

    let mut cmd = Command::cargo_bin("ouro").unwrap();
    cmd.arg("compile").arg(bad_file);
    cmd.assert()
        .failure()
        .stderr(contains("ouro::parse").or(contains("help:")));

    // Clean up
    let _ = fs::remove_file(bad_file);
}

#[test]
fn cli_compiles_a_grammar_to_stdout() {
    let good_file = "tests/greeting.grammar";
    fs::write(good_file, "GREETING: /hi/;\ngreeting -> GREETING \"!\"?;\n").unwrap();

    let mut cmd = Command::cargo_bin("ouro").unwrap();
    cmd.arg("compile").arg(good_file);
    cmd.assert()
        .success()
        .stdout(contains("pub fn GREETING() -> Parser").and(contains("pub fn greeting() -> Parser")));

    let _ = fs::remove_file(good_file);
}

#[test]
fn cli_lists_rules_as_json() {
    let file = "tests/inventory.grammar";
    fs::write(file, "NAME: /[A-Za-z]+/;\n").unwrap();

    let mut cmd = Command::cargo_bin("ouro").unwrap();
    cmd.arg("rules").arg(file).arg("--json");
    cmd.assert()
        .success()
        .stdout(contains("\"kind\": \"lexical\"").and(contains("\"name\": \"NAME\"")));

    let _ = fs::remove_file(file);
}

#[test]
fn cli_reports_missing_files() {
    let mut cmd = Command::cargo_bin("ouro").unwrap();
    cmd.arg("compile").arg("tests/does_not_exist.grammar");
    cmd.assert().failure().stderr(contains("ouro::shell::io"));
}
