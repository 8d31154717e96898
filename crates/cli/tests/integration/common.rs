//! Shared test helpers for CLI integration tests.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

pub const MINIMAL_APP: &str = r#"{"routes": {"/": {"GET": {"view_name": "index"}}}}"#;
pub const MINIMAL_CONFIG: &str = r#"{"app_name": "demo"}"#;

/// Isolated test environment.
///
/// Each test gets its own project directory, cloud state file and data
/// directory under one temporary directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// A project named `demo` with a single route.
  pub fn new() -> Self {
    let env = Self::empty();
    env.write_file("project/app.json", MINIMAL_APP);
    env.write_file("project/.stagecraft/config.json", MINIMAL_CONFIG);
    env.write_file("project/src/app.py", "def index(event, context):\n    return {}\n");
    env
  }

  /// Create an empty test environment.
  ///
  /// Use this when you need to manually set up the directory structure.
  pub fn empty() -> Self {
    let temp = TempDir::new().unwrap();
    Self { temp }
  }

  /// Write a file relative to the temp directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn project_path(&self) -> PathBuf {
    let p = self.temp.path().join("project");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// State file of the emulated cloud.
  pub fn cloud_state_path(&self) -> PathBuf {
    self.temp.path().join("cloud.json")
  }

  pub fn cloud_state(&self) -> Value {
    let content = std::fs::read_to_string(self.cloud_state_path()).unwrap();
    serde_json::from_str(&content).unwrap()
  }

  /// Contents of `.stagecraft/deployed.json`, if any.
  pub fn deployed(&self) -> Option<Value> {
    let path = self.project_path().join(".stagecraft").join("deployed.json");
    let content = std::fs::read_to_string(path).ok()?;
    Some(serde_json::from_str(&content).unwrap())
  }

  /// Get a pre-configured Command for the stagecraft binary.
  ///
  /// Points `--project-dir` at the test project and isolates the cloud state
  /// and data directories. `STAGECRAFT_REGION` is cleared so the config
  /// default applies.
  pub fn cmd(&self) -> Command {
    self.cmd_in(&self.project_path())
  }

  /// Like [`TestEnv::cmd`] but for a project somewhere else.
  pub fn cmd_in(&self, project_dir: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("stagecraft");
    cmd.arg("--project-dir").arg(project_dir);
    cmd.arg("--no-prompt");
    cmd.env("STAGECRAFT_CLOUD_STATE", self.cloud_state_path());
    cmd.env("XDG_DATA_HOME", self.temp.path().join("data"));
    cmd.env("APPDATA", self.temp.path().join("data"));
    cmd.env_remove("STAGECRAFT_REGION");
    cmd.env_remove("RUST_LOG");
    cmd
  }
}
