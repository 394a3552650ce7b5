//! Common test utilities for Packwright integration tests

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A throwaway project with a content root and descriptor directory
pub struct TestProject {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestProject {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().to_path_buf();
        Self { temp, path }
    }

    /// Write a file in the project
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Write a package descriptor under `packaging/`
    pub fn write_descriptor(&self, file: &str, yaml: &str) {
        self.write_file(&format!("packaging/{}", file), yaml);
    }

    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.path.join(relative)
    }

    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Two packages: `ui` depends on `core` through `hud.prefab`
    pub fn with_two_packages(self) -> Self {
        self.write_file("content/core/base.png", "base-bytes");
        self.write_file("content/ui/hud.prefab", "hud-bytes");
        self.write_file("content/ui/hud.prefab.deps", "content/core/base.png\n");
        self.write_descriptor("core.yaml", "source: content/core\n");
        self.write_descriptor("ui.yaml", "source: content/ui\n");
        self
    }

    /// The binary, run from the project root with colours off
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("packwright").expect("binary");
        cmd.current_dir(&self.path)
            .env_remove("PACKWRIGHT_PROJECT")
            .env("NO_COLOR", "1")
            .env("CLICOLOR", "0");
        cmd
    }

    /// Run a full build into `build/default`
    pub fn build(&self) {
        self.command()
            .args(["build", "-o", "build", "--platform", "linux", "-c", "default", "--no-progress"])
            .assert()
            .success();
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}
