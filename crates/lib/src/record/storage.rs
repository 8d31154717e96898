//! Per-stage resource records on disk.
//!
//! # Storage Layout
//!
//! ```text
//! <project>/.stagecraft/
//! └── deployed.json   # { "<stage>": DeployedResources, ... }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::DEPLOYED_FILENAME;
use crate::platform::paths::project_state_dir;

use super::types::DeployedResources;

#[derive(Debug, Error)]
pub enum RecordError {
  #[error("failed to read deployed resources: {0}")]
  Read(#[source] io::Error),

  #[error("failed to write deployed resources: {0}")]
  Write(#[source] io::Error),

  #[error("failed to create state directory: {0}")]
  CreateDir(#[source] io::Error),

  #[error("failed to parse deployed resources: {0}")]
  Parse(#[source] serde_json::Error),

  #[error("failed to serialize deployed resources: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Reads and writes `deployed.json`.
///
/// Uses atomic write operations to prevent corruption.
#[derive(Debug, Clone)]
pub struct RecordStore {
  path: PathBuf,
}

impl RecordStore {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// The record file of a project.
  pub fn for_project(project_dir: &Path) -> Self {
    Self::new(project_state_dir(project_dir).join(DEPLOYED_FILENAME))
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Load every stage's record. Returns an empty map if the file doesn't exist.
  pub fn load_all(&self) -> Result<BTreeMap<String, DeployedResources>, RecordError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
      Err(e) => return Err(RecordError::Read(e)),
    };

    serde_json::from_str(&content).map_err(RecordError::Parse)
  }

  /// Load the record for one stage.
  ///
  /// Returns `Ok(None)` if the stage has never been deployed.
  pub fn load(&self, stage: &str) -> Result<Option<DeployedResources>, RecordError> {
    let mut all = self.load_all()?;
    Ok(all.remove(stage))
  }

  /// Replace the record for `stage`, leaving other stages untouched.
  pub fn save(&self, stage: &str, resources: &DeployedResources) -> Result<(), RecordError> {
    let mut all = self.load_all()?;
    all.insert(stage.to_string(), resources.clone());
    self.write_all(&all)?;
    info!(stage, path = %self.path.display(), "saved deployed resources");
    Ok(())
  }

  /// Discard the record for `stage`. Returns whether one existed.
  pub fn remove(&self, stage: &str) -> Result<bool, RecordError> {
    let mut all = self.load_all()?;
    if all.remove(stage).is_none() {
      return Ok(false);
    }
    self.write_all(&all)?;
    debug!(stage, "removed deployed resources");
    Ok(true)
  }

  fn write_all(&self, all: &BTreeMap<String, DeployedResources>) -> Result<(), RecordError> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(RecordError::CreateDir)?;
    }

    let temp_path = self.path.with_extension("json.tmp");
    let mut content = serde_json::to_string_pretty(all).map_err(RecordError::Serialize)?;
    content.push('\n');
    fs::write(&temp_path, &content).map_err(RecordError::Write)?;
    fs::rename(&temp_path, &self.path).map_err(RecordError::Write)?;
    Ok(())
  }
}
