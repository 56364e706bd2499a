// ABOUTME: Integration tests for the stratus CLI commands.
// ABOUTME: Validates --help output and argument errors that occur before any AWS call.

use assert_cmd::Command;
use predicates::prelude::*;

fn stratus_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("stratus"))
}

#[test]
fn help_shows_commands() {
    stratus_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("package"));
}

#[test]
fn deploy_help_lists_change_set_flags() {
    stratus_cmd()
        .args(["deploy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--no-execute-changeset"))
        .stdout(predicate::str::contains("--fail-on-empty-changeset"))
        .stdout(predicate::str::contains("--force-deploy"));
}

#[test]
fn package_requires_a_bucket() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("template.yaml"), "Resources: {}\n").unwrap();

    stratus_cmd()
        .current_dir(temp_dir.path())
        .args(["package", "--template-file", "template.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--s3-bucket is required"));
}

#[test]
fn invalid_stack_name_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("template.yaml"), "Resources: {}\n").unwrap();

    stratus_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "--template-file", "template.yaml", "--name", "1-bad_name"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid stack name"));
}

#[test]
fn unknown_capability_is_rejected_by_the_parser() {
    stratus_cmd()
        .args([
            "deploy",
            "--template-file",
            "template.yaml",
            "--name",
            "orders",
            "--capabilities",
            "CAPABILITY_EVERYTHING",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CAPABILITY_EVERYTHING"));
}

#[test]
fn unknown_environment_is_reported() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::write(temp_dir.path().join("stratus.yml"), "region: eu-west-1\n").unwrap();

    stratus_cmd()
        .current_dir(temp_dir.path())
        .args([
            "package",
            "--template-file",
            "template.yaml",
            "--s3-bucket",
            "artifacts",
            "-e",
            "staging",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown environment: staging"));
}
