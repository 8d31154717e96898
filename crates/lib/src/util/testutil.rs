//! Test fixtures: throwaway projects and scripted prompters.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::app::definition_path;
use crate::config::{ConfigOverrides, DeployConfig, config_path};
use crate::prompt::{Decision, DecisionPoint, Prompter};
use crate::record::RecordStore;

const DEFAULT_APP: &str = r#"{"routes": {"/": {"GET": {"view_name": "index"}}}}"#;
const DEFAULT_CONFIG: &str = r#"{"app_name": "demo"}"#;

/// A project directory named `demo` with one route and one source file.
pub struct TestProject {
  dir: TempDir,
}

impl TestProject {
  pub fn new() -> Self {
    let project = Self {
      dir: TempDir::new().unwrap(),
    };
    project.write_source("app.py", "print('v1')");
    project.with_app(DEFAULT_APP).with_config(DEFAULT_CONFIG)
  }

  pub fn path(&self) -> &Path {
    self.dir.path()
  }

  /// Replace `app.json`.
  pub fn with_app(self, json: &str) -> Self {
    fs::write(definition_path(self.path()), json).unwrap();
    self
  }

  /// Replace `.stagecraft/config.json`.
  pub fn with_config(self, json: &str) -> Self {
    let path = config_path(self.path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, json).unwrap();
    self
  }

  pub fn write_source(&self, name: &str, content: &str) {
    let path = self.path().join("src").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
  }

  pub fn config(&self, stage: &str) -> DeployConfig {
    DeployConfig::load(self.path(), stage, ConfigOverrides::default()).unwrap()
  }

  pub fn records(&self) -> RecordStore {
    RecordStore::for_project(self.path())
  }
}

/// Answers every gate with a fixed answer, remembering what it was asked.
pub struct RecordingPrompter {
  answer: bool,
  overrides: Vec<(DecisionPoint, bool)>,
  asked: RefCell<Vec<Decision>>,
}

impl RecordingPrompter {
  pub fn answering(answer: bool) -> Self {
    Self {
      answer,
      overrides: Vec::new(),
      asked: RefCell::new(Vec::new()),
    }
  }

  /// Answer `point` differently from the rest.
  pub fn with_answer(mut self, point: DecisionPoint, answer: bool) -> Self {
    self.overrides.push((point, answer));
    self
  }

  pub fn asked(&self) -> Vec<Decision> {
    self.asked.borrow().clone()
  }
}

impl Prompter for RecordingPrompter {
  fn confirm(&self, decision: &Decision) -> bool {
    self.asked.borrow_mut().push(decision.clone());
    self
      .overrides
      .iter()
      .find(|(point, _)| *point == decision.point)
      .map(|(_, answer)| *answer)
      .unwrap_or(self.answer)
  }
}
