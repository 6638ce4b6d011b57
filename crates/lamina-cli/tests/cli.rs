use predicates::prelude::*;
use std::fs;

fn lamina() -> assert_cmd::Command {
    assert_cmd::Command::cargo_bin("lamina").unwrap()
}

fn write_source(dir: &tempfile::TempDir, name: &str, source: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path.to_str().unwrap().to_owned()
}

// ── check command ───────────────────────────────────────────

#[test]
fn check_valid_file_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "ok.lam", "addOne = \\x:I32. x + 1; r = addOne(41);");

    lamina()
        .args(["check", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("addOne : I32 -> I32"))
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn check_type_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "bad.lam", "bad = y;");

    lamina()
        .args(["check", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("type error"));
}

#[test]
fn check_parse_error_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "bad.lam", "broken 1;");

    lamina()
        .args(["check", &file])
        .assert()
        .failure()
        .stderr(predicate::str::contains("parse error"));
}

// ── emit command ────────────────────────────────────────────

#[test]
fn emit_prints_a_module() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "main.lam", "main = 2 + 3;");

    lamina()
        .args(["emit", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("(module"))
        .stdout(predicate::str::contains("(export \"main\" (func $main))"));
}

#[test]
fn emit_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "main.lam", "main = 2 + 3;");
    let out = dir.path().join("main.wat");

    lamina()
        .args(["emit", &file, "--output", out.to_str().unwrap()])
        .assert()
        .success();

    let module = fs::read_to_string(&out).unwrap();
    assert!(module.contains("(i32.add (i32.const 2) (i32.const 3))"));
}

#[test]
fn emit_rejects_ill_typed_program_before_codegen() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "bad.lam", "bad = y;");

    lamina()
        .args(["emit", &file])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("type error"));
}

// ── parse command ───────────────────────────────────────────

#[test]
fn parse_dumps_bindings() {
    let dir = tempfile::tempdir().unwrap();
    let file = write_source(&dir, "main.lam", "f = \\x:I32. x + 1;");

    lamina()
        .args(["parse", &file])
        .assert()
        .success()
        .stdout(predicate::str::contains("f = \\x:I32. (x + 1:I32)"));
}
