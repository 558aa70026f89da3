//! Integration tests for the `ingest` CLI.
//!
//! These exercise full command dispatch without touching the network: they
//! rely on `run`/`delete`/`status` validating inputs or reading local state
//! before any HTTP call would be made. Network-backed commands (`search`,
//! and `run` past validation) aren't covered here — there's no mock LLM or
//! embeddings endpoint in this harness.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ingest() -> Command {
    Command::cargo_bin("ingest").expect("failed to find ingest binary")
}

/// A command pre-wired with the minimal config this crate's `validate()`
/// requires (non-empty summarizer/embeddings model), rooted at a fresh
/// workspace directory.
fn ingest_in(workspace: &TempDir) -> Command {
    let mut cmd = ingest();
    cmd.env("ANALYSIS_DB_DIR", workspace.path())
        .env("SUMMARIES_MODEL", "test-summarizer")
        .env("EMBEDDINGS_MODEL", "test-embeddings")
        .args(["--workspace", &workspace.path().display().to_string()]);
    cmd
}

#[test]
fn status_reports_unknown_job() {
    let workspace = TempDir::new().unwrap();
    ingest_in(&workspace)
        .args(["status", "no-such-job"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown job"));
}

#[test]
fn delete_on_untouched_repo_is_a_no_op() {
    let workspace = TempDir::new().unwrap();
    ingest_in(&workspace).args(["delete", "never-ingested"]).assert().success();
}

#[test]
fn delete_removes_existing_store_and_clone() {
    let workspace = TempDir::new().unwrap();
    std::fs::write(workspace.path().join("acme-widgets.db"), b"").unwrap();
    std::fs::create_dir_all(workspace.path().join("clones/acme-widgets")).unwrap();

    ingest_in(&workspace).args(["delete", "acme-widgets"]).assert().success();

    assert!(!workspace.path().join("acme-widgets.db").exists());
    assert!(!workspace.path().join("clones/acme-widgets").exists());
}

#[test]
fn delete_refuses_to_escape_the_workspace() {
    let workspace = TempDir::new().unwrap();
    ingest_in(&workspace)
        .args(["delete", "../escape"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside the workspace"));
}

#[test]
fn run_rejects_malformed_repo_slug() {
    let workspace = TempDir::new().unwrap();
    ingest_in(&workspace)
        .args(["run", "not a slug", "https://github.com/acme/widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid repo_slug"));
}

#[test]
fn missing_config_model_fails_fast_with_a_clear_error() {
    let workspace = TempDir::new().unwrap();
    let mut cmd = ingest();
    cmd.env("ANALYSIS_DB_DIR", workspace.path())
        .args(["--workspace", &workspace.path().display().to_string(), "status", "any-job"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid configuration"));
}
