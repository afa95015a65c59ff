//! CLI argument parsing tests
//!
//! Exercise argument validation and the commands that work without
//! backends. Everything runs with MNEMO_HOME pointed at a temp dir and
//! `--offline` where a store is needed.

use assert_cmd::Command;
use predicates::prelude::*;

fn mnemo(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("mnemo").expect("binary builds");
    cmd.env("MNEMO_HOME", home);
    cmd
}

#[test]
fn help_lists_command_groups() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("memory"))
        .stdout(predicate::str::contains("agent"))
        .stdout(predicate::str::contains("code-index"))
        .stdout(predicate::str::contains("schedule"));
}

#[test]
fn memory_add_and_query_offline() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "memory", "add", "hello from the test", "-m", "type=fact"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 1 document"));

    // Offline backends do not persist between invocations
    mnemo(home.path())
        .args(["--offline", "memory", "count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0"));
}

#[test]
fn memory_add_rejects_malformed_metadata() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "memory", "add", "content", "-m", "notakeyvalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}

#[test]
fn delete_all_requires_confirm() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "memory", "delete-all"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--confirm"));
}

#[test]
fn code_index_rejects_invalid_category() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "code-index", "acme/widget", "-c", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid category"));
}

#[test]
fn code_index_rejects_invalid_repo() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "code-index", "not a repo url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid GitHub URL"));
}

#[test]
fn schedule_lifecycle_on_disk() {
    let home = tempfile::tempdir().unwrap();

    mnemo(home.path())
        .args(["schedule", "add", "consolidator", "-c", "0 3 * * *"])
        .assert()
        .success()
        .stdout(predicate::str::contains("daily at 03:00"));

    mnemo(home.path())
        .args(["schedule", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("consolidator"));

    // The schedule persisted to tasks.json
    let tasks = std::fs::read_to_string(home.path().join("schedules/tasks.json")).unwrap();
    assert!(tasks.contains("\"agent\": \"consolidator\""));
}

#[test]
fn schedule_add_rejects_bad_cron() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["schedule", "add", "consolidator", "-c", "not cron"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cron"));
}

#[test]
fn agent_create_and_list() {
    let home = tempfile::tempdir().unwrap();

    mnemo(home.path())
        .args(["agent", "create", "curator", "-d", "Weekly digest curator"])
        .assert()
        .success();

    mnemo(home.path())
        .args(["agent", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("curator"));

    mnemo(home.path())
        .args(["agent", "add-skill", "curator", "summarize"])
        .assert()
        .success();

    mnemo(home.path())
        .args(["agent", "skills", "curator"])
        .assert()
        .success()
        .stdout(predicate::str::contains("summarize"));
}

#[test]
fn agent_run_unknown_agent_fails() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "agent", "run", "nonexistent"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown agent"));
}

#[test]
fn researcher_requires_provider() {
    let home = tempfile::tempdir().unwrap();
    mnemo(home.path())
        .args(["--offline", "agent", "run", "researcher", "rust", "async"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no web search provider"));
}
