//! End-to-end tests for the `bocode` binary.
//!
//! Every test points HOME at its own temporary directory so the real
//! configuration and history are never touched.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

fn bocode(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bocode").expect("binary builds");
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .current_dir(home.path());
    cmd
}

#[test]
fn test_help_lists_commands() {
    let home = tempdir().unwrap();
    bocode(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sessions"))
        .stdout(predicate::str::contains("template"))
        .stdout(predicate::str::contains("git"));
}

#[test]
fn test_new_conversation_appears_everywhere() {
    let home = tempdir().unwrap();

    bocode(&home)
        .args(["new", "Explain lifetimes", "--tag", "rust"])
        .assert()
        .success();

    bocode(&home)
        .args(["sessions", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Explain lifetimes"));

    bocode(&home)
        .args(["show", "last"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Explain lifetimes"));

    bocode(&home)
        .args(["search", "LIFETIMES"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lifetimes"));

    assert!(home.path().join(".bocode-cli/history").is_dir());
}

#[test]
fn test_append_from_stdin() {
    let home = tempdir().unwrap();
    bocode(&home).args(["new", "first"]).assert().success();

    bocode(&home)
        .args(["append", "last", "--role", "assistant", "--stdin"])
        .write_stdin("streamed reply")
        .assert()
        .success();

    bocode(&home)
        .args(["show", "last", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("streamed reply"));
}

#[test]
fn test_show_unknown_conversation_fails() {
    let home = tempdir().unwrap();
    bocode(&home)
        .args(["show", "deadbeef"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deadbeef"));
}

#[test]
fn test_template_save_and_render() {
    let home = tempdir().unwrap();

    bocode(&home)
        .args([
            "template",
            "save",
            "review",
            "--content",
            "Review {{ file }} for {{ focus }}",
            "--default",
            "focus=bugs",
        ])
        .assert()
        .success();

    bocode(&home)
        .args(["template", "render", "review", "--var", "file=main.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Review main.rs for bugs"));

    bocode(&home)
        .args(["template", "render", "review"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file"));

    bocode(&home)
        .args(["template", "render", "review", "--lenient"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{{ file }}"));
}

#[test]
fn test_config_set_then_get() {
    let home = tempdir().unwrap();

    bocode(&home)
        .args(["config", "set", "log_count", "5"])
        .assert()
        .success();

    bocode(&home)
        .args(["config", "get", "log_count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));

    assert!(home.path().join(".bocode-cli/config.yaml").is_file());
}

#[test]
fn test_config_rejects_unknown_key_and_bad_value() {
    let home = tempdir().unwrap();

    bocode(&home)
        .args(["config", "get", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key"));

    bocode(&home)
        .args(["config", "set", "conflict.similarity_floor", "2"])
        .assert()
        .failure();
}

#[test]
fn test_git_outside_repository_fails() {
    let home = tempdir().unwrap();
    bocode(&home)
        .args(["git", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a git repository"));
}

#[test]
fn test_git_graph_in_fresh_repository() {
    let home = tempdir().unwrap();
    git2::Repository::init(home.path()).unwrap();
    bocode(&home)
        .args(["git", "graph"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No commits yet."));
}

#[test]
fn test_completions_generate_script() {
    let home = tempdir().unwrap();
    bocode(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("bocode"));
}
