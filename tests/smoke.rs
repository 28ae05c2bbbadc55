use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_help() {
    let mut cmd = Command::cargo_bin("eventdesk").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn bad_argument_fails() {
    let mut cmd = Command::cargo_bin("eventdesk").unwrap();
    cmd.arg("--does-not-exist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn unknown_dataset_is_rejected() {
    let mut cmd = Command::cargo_bin("eventdesk").unwrap();
    cmd.args(["--dataset", "payroll", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown dataset"));
}

#[test]
fn invalid_base_url_is_rejected() {
    let mut cmd = Command::cargo_bin("eventdesk").unwrap();
    cmd.args(["--base-url", "ftp://example.com", "health"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid base URL"));
}
