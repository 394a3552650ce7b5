//! Build pipeline tests through the binary

mod common;

use predicates::prelude::*;

fn build_args(channel: &str) -> Vec<String> {
    ["build", "-o", "build", "--platform", "linux", "-c", channel, "--no-progress"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}

#[test]
fn test_build_writes_archives_manifest_and_asset_map() {
    let project = common::TestProject::new().with_two_packages();
    project.build();

    assert!(project.file_exists("build/default/core"));
    assert!(project.file_exists("build/default/ui"));
    assert!(project.file_exists("build/default/assetmap.json"));

    let manifest = project.read_file("build/default/manifest.txt");
    assert!(manifest.contains("Versions : 1.0"));
    assert!(manifest.contains("Platform : linux"));
    assert!(manifest.contains("Channel : default"));
    assert!(manifest.contains("AssetBundles core "));
    assert!(manifest.contains("AssetBundles ui "));

    let map = project.read_file("build/default/assetmap.json");
    assert!(map.contains("\"assetNameValue\": \"hud\""));
    assert!(map.contains("\"bundleName\": \"ui\""));
}

#[test]
fn test_versions_flow_into_manifest() {
    let project = common::TestProject::new().with_two_packages();
    project
        .command()
        .args(build_args("default"))
        .args(["--code-version", "3", "--asset-version", "7"])
        .assert()
        .success();
    assert!(project.read_file("build/default/manifest.txt").contains("Versions : 3.7"));
}

#[test]
fn test_editor_only_skips_archives() {
    let project = common::TestProject::new().with_two_packages();
    project
        .command()
        .args(build_args("default"))
        .arg("--editor-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Validated 2 packages"));

    assert!(project.file_exists("build/default/assetmap.json"));
    assert!(!project.file_exists("build/default/manifest.txt"));
    assert!(!project.file_exists("build/default/core"));
}

#[test]
fn test_failed_build_keeps_previous_output() {
    let project = common::TestProject::new().with_two_packages();
    project.build();
    let before = project.read_file("build/default/manifest.txt");

    project.write_file("content/ui/hud.prefab.deps", "content/core/missing.png\n");
    project
        .command()
        .args(build_args("default"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.png"));

    assert_eq!(project.read_file("build/default/manifest.txt"), before);
}

#[test]
fn test_package_cycle_fails_build() {
    let project = common::TestProject::new();
    project.write_file("content/p1/x.mat", "x");
    project.write_file("content/p1/x.mat.deps", "content/p2/w.png\n");
    project.write_file("content/p2/w.png", "w");
    project.write_file("content/p2/y.prefab", "y");
    project.write_file("content/p2/y.prefab.deps", "content/p1/x.mat\n");
    project.write_descriptor("p1.yaml", "source: content/p1\n");
    project.write_descriptor("p2.yaml", "source: content/p2\n");

    project
        .command()
        .args(build_args("default"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("p1 -> p2 -> p1"));
    assert!(!project.file_exists("build/default/manifest.txt"));
}

#[test]
fn test_rebuild_is_byte_identical() {
    let project = common::TestProject::new().with_two_packages();
    project.build();
    let manifest = project.read_file("build/default/manifest.txt");
    let map = project.read_file("build/default/assetmap.json");

    project.build();
    assert_eq!(project.read_file("build/default/manifest.txt"), manifest);
    assert_eq!(project.read_file("build/default/assetmap.json"), map);
}

#[test]
fn test_channels_are_independent() {
    let project = common::TestProject::new().with_two_packages();
    project.build();
    project.command().args(build_args("beta")).assert().success();

    assert!(project.file_exists("build/default/manifest.txt"));
    assert!(project.file_exists("build/beta/manifest.txt"));
}
