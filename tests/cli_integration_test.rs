//! CLI behavior against the built binary, using ubiquitous commands as the
//! stand-in tool.
#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn write_notebook(path: &Path, sources: &[&str]) {
    let json = serde_json::json!({
        "cells": [{
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": sources.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        }],
        "metadata": {},
        "nbformat": 4,
        "nbformat_minor": 5,
    });
    fs::write(path, serde_json::to_string(&json).unwrap()).unwrap();
}

fn nblint() -> Command {
    Command::cargo_bin("nblint").unwrap()
}

#[test]
fn test_requires_paths() {
    nblint().arg("flake8").assert().failure();
}

#[test]
fn test_cat_passes_through_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let nb = dir.path().join("demo.ipynb");
    write_notebook(&nb, &["x = 1\n"]);

    nblint()
        .arg("cat")
        .arg(&nb)
        .assert()
        .success()
        .stdout(predicate::str::contains("x = 1"));
}

#[test]
fn test_tool_exit_code_passed_through() {
    let dir = tempfile::tempdir().unwrap();
    let nb = dir.path().join("demo.ipynb");
    write_notebook(&nb, &["x = 1\n"]);

    nblint().arg("false").arg(&nb).assert().code(1);
    nblint().arg("true").arg(&nb).assert().success();
}

#[test]
fn test_missing_tool_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let nb = dir.path().join("demo.ipynb");
    write_notebook(&nb, &["x = 1\n"]);

    nblint()
        .arg("definitely-not-a-real-tool-5309")
        .arg(&nb)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("command not found"));
}

#[test]
fn test_invalid_notebook_is_internal_error() {
    let dir = tempfile::tempdir().unwrap();
    let nb = dir.path().join("broken.ipynb");
    fs::write(&nb, "not json at all").unwrap();

    nblint()
        .arg("true")
        .arg(&nb)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("broken.ipynb"));
}

#[test]
fn test_no_notebooks_found() {
    let dir = tempfile::tempdir().unwrap();
    nblint()
        .arg("true")
        .arg(dir.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no notebooks found"));
}

#[test]
fn test_directory_discovery_and_sibling_isolation() {
    let dir = tempfile::tempdir().unwrap();
    write_notebook(&dir.path().join("a.ipynb"), &["a = 1\n"]);
    fs::write(dir.path().join("b.ipynb"), "not json").unwrap();

    // The broken notebook fails with 2; the good one still runs.
    nblint()
        .arg("cat")
        .arg(dir.path())
        .assert()
        .code(2)
        .stdout(predicate::str::contains("a = 1"))
        .stderr(predicate::str::contains("b.ipynb"));
}

#[test]
fn test_magics_never_reach_the_tool() {
    let dir = tempfile::tempdir().unwrap();
    let nb = dir.path().join("demo.ipynb");
    write_notebook(&nb, &["%time f()\n", "x = 1\n"]);

    nblint()
        .arg("cat")
        .arg(&nb)
        .assert()
        .success()
        .stdout(predicate::str::contains("%time").not())
        .stdout(predicate::str::contains("type(0x"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let nb = dir.path().join("demo.ipynb");
    write_notebook(&nb, &["x = 1\n"]);

    nblint()
        .arg("true")
        .arg(&nb)
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .assert()
        .code(2);
}
