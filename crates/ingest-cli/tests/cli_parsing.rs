//! CLI argument parsing tests for the `ingest` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn ingest() -> Command {
    Command::cargo_bin("ingest").expect("failed to find ingest binary")
}

#[test]
fn help_lists_all_commands() {
    ingest()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn version_flag_reports_ingest() {
    ingest().arg("--version").assert().success().stdout(predicate::str::contains("ingest"));
}

#[test]
fn run_requires_repo_slug_and_url() {
    ingest().arg("run").assert().failure().stderr(predicate::str::contains("required"));
}

#[test]
fn search_requires_repo_slug_and_query() {
    ingest().arg("search").assert().failure().stderr(predicate::str::contains("required"));
}

#[test]
fn search_rejects_unknown_mode() {
    ingest()
        .args(["search", "acme-widgets", "auth logic", "--mode", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn status_requires_job_id() {
    ingest().arg("status").assert().failure().stderr(predicate::str::contains("required"));
}

#[test]
fn delete_requires_repo_slug() {
    ingest().arg("delete").assert().failure().stderr(predicate::str::contains("required"));
}

#[test]
fn unknown_subcommand_is_rejected() {
    ingest().arg("frobnicate").assert().failure();
}
