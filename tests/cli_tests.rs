//! CLI integration tests using the real packwright binary

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn packwright_cmd() -> Command {
    Command::cargo_bin("packwright").expect("binary")
}

#[test]
fn test_help_output() {
    packwright_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("manifest"))
        .stdout(predicate::str::contains("resolve"));
}

#[test]
fn test_version_output() {
    packwright_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("packwright"));
}

#[test]
fn test_build_requires_platform() {
    packwright_cmd()
        .args(["build", "-o", "out", "-c", "default"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--platform"));
}

#[test]
fn test_completions_bash() {
    packwright_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("packwright"));
}

#[test]
fn test_completions_unknown_shell() {
    packwright_cmd()
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown shell"));
}

#[test]
fn test_build_and_resolve() {
    let project = common::TestProject::new().with_two_packages();
    project
        .command()
        .args(["build", "-o", "build", "--platform", "linux", "-c", "default", "--no-progress"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Built 2 packages"))
        .stdout(predicate::str::contains("archive format 1"))
        .stdout(predicate::str::contains("depends on core"));

    project
        .command()
        .args(["resolve", "hud"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Package: ui"))
        .stdout(predicate::str::contains("content/core/base.png (core)"))
        .stdout(predicate::str::contains("core -> ui"));
}

#[test]
fn test_resolve_with_load() {
    let project = common::TestProject::new().with_two_packages();
    project.build();

    project
        .command()
        .args(["resolve", "base", "--load"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 10 bytes"));
}

#[test]
fn test_resolve_unknown_name() {
    let project = common::TestProject::new().with_two_packages();
    project.build();

    project
        .command()
        .args(["resolve", "nothing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nothing"));
}

#[test]
fn test_project_flag() {
    let project = common::TestProject::new().with_two_packages();
    packwright_cmd()
        .arg("--project")
        .arg(project.root())
        .args(["build", "-o", "build", "--platform", "linux", "-c", "dev", "--no-progress"])
        .assert()
        .success();
    assert!(project.file_exists("build/dev/manifest.txt"));
}

#[test]
fn test_manifest_command_and_verify() {
    let project = common::TestProject::new().with_two_packages();
    project.build();

    project
        .command()
        .args(["manifest", "build/default/manifest.txt", "--verify"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Platform: linux"))
        .stdout(predicate::str::contains("Verified 2 archives match"));

    project.write_file("build/default/core", "tampered");
    project
        .command()
        .args(["manifest", "build/default/manifest.txt", "--verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("core"));
}

#[test]
fn test_missing_descriptors_reports_error() {
    let project = common::TestProject::new();
    project.write_file("content/a.png", "a");
    project
        .command()
        .args(["build", "-o", "build", "--platform", "linux", "-c", "default", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_resolve_before_build_reports_missing_asset_map() {
    let project = common::TestProject::new().with_two_packages();
    project
        .command()
        .args(["resolve", "hud"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"))
        .stderr(predicate::str::contains("assetmap.json"));
}
