//! Persistence of the permission document believed to be applied to the
//! execution role.
//!
//! # File resolution
//!
//! ```text
//! .stagecraft/<iam_policy_file>   # when configured
//! .stagecraft/policy-<stage>.json # otherwise
//! .stagecraft/policy.json         # default stage only, when the above is absent
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::DeployConfig;
use crate::consts::LEGACY_POLICY_FILENAME;

use super::generate::{AppPolicyGenerator, PolicyGenerator};
use super::types::PermissionDocument;

#[derive(Debug, Error)]
pub enum PolicyError {
  #[error("policy file {} is not a valid permission document: {source}", path.display())]
  MalformedPolicyFile { path: PathBuf, source: serde_json::Error },

  #[error("failed to read policy file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write policy file {}: {source}", path.display())]
  Write { path: PathBuf, source: io::Error },

  #[error("failed to serialize policy: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// Produces, loads and records the execution role's permission document.
pub struct PolicyStore {
  generator: Box<dyn PolicyGenerator>,
}

impl Default for PolicyStore {
  fn default() -> Self {
    Self::new(Box::new(AppPolicyGenerator::new()))
  }
}

impl PolicyStore {
  pub fn new(generator: Box<dyn PolicyGenerator>) -> Self {
    Self { generator }
  }

  /// The document that should be attached to the role for this config.
  ///
  /// Generated from the application when `autogen_policy` is on; otherwise
  /// the policy file is the source of truth.
  pub fn generate(&self, config: &DeployConfig) -> Result<PermissionDocument, PolicyError> {
    if config.autogen_policy() {
      Ok(self.generator.generate_policy(&config.app))
    } else {
      self.load_last_applied(config)
    }
  }

  /// Load the recorded document, or an empty one if no file exists.
  pub fn load_last_applied(&self, config: &DeployConfig) -> Result<PermissionDocument, PolicyError> {
    let path = policy_file_path(config);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %path.display(), "no recorded policy, using empty document");
        return Ok(PermissionDocument::empty());
      }
      Err(source) => return Err(PolicyError::Read { path, source }),
    };

    serde_json::from_str(&content).map_err(|source| PolicyError::MalformedPolicyFile { path, source })
  }

  /// Record `document` as the last applied policy.
  ///
  /// Written with two-space indentation and fixed key order so the file
  /// diffs cleanly under version control.
  pub fn persist(&self, config: &DeployConfig, document: &PermissionDocument) -> Result<(), PolicyError> {
    let path = policy_file_path(config);

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).map_err(|source| PolicyError::Write {
        path: parent.to_path_buf(),
        source,
      })?;
    }

    let mut content = serde_json::to_string_pretty(document).map_err(PolicyError::Serialize)?;
    content.push('\n');

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content).map_err(|source| PolicyError::Write {
      path: temp_path.clone(),
      source,
    })?;
    fs::rename(&temp_path, &path).map_err(|source| PolicyError::Write {
      path: path.clone(),
      source,
    })?;

    info!(path = %path.display(), statements = document.statements.len(), "recorded applied policy");
    Ok(())
  }
}

/// Resolve the policy file for a stage.
pub fn policy_file_path(config: &DeployConfig) -> PathBuf {
  let state_dir = config.state_dir();

  if let Some(filename) = config.iam_policy_file() {
    return state_dir.join(filename);
  }

  let stage_file = state_dir.join(format!("policy-{}.json", config.stage));
  if !stage_file.exists() && config.is_default_stage() {
    let legacy = state_dir.join(LEGACY_POLICY_FILENAME);
    if legacy.exists() {
      return legacy;
    }
  }
  stage_file
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::app::ApplicationDefinition;
  use crate::config::{ConfigOverrides, ProjectConfig};
  use crate::policy::types::Statement;
  use tempfile::TempDir;

  fn config(temp: &TempDir, stage: &str, project_json: &str) -> DeployConfig {
    let project: ProjectConfig = serde_json::from_str(project_json).unwrap();
    let app = ApplicationDefinition {
      actions: vec!["s3:GetObject".to_string()],
      ..ApplicationDefinition::default()
    };
    DeployConfig::new(temp.path(), stage, project, app, ConfigOverrides::default())
  }

  fn write_state_file(temp: &TempDir, name: &str, content: &str) {
    let dir = temp.path().join(".stagecraft");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), content).unwrap();
  }

  fn sample_document() -> PermissionDocument {
    PermissionDocument::new(vec![Statement::allow(
      vec!["sqs:SendMessage".to_string()],
      vec!["*".to_string()],
    )])
  }

  #[test]
  fn path_uses_stage_name() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, "prod", r#"{"app_name": "demo"}"#);
    assert_eq!(
      policy_file_path(&config),
      temp.path().join(".stagecraft").join("policy-prod.json")
    );
  }

  #[test]
  fn path_uses_configured_override() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, "prod", r#"{"app_name": "demo", "iam_policy_file": "custom.json"}"#);
    assert_eq!(
      policy_file_path(&config),
      temp.path().join(".stagecraft").join("custom.json")
    );
  }

  #[test]
  fn legacy_file_only_for_default_stage() {
    let temp = TempDir::new().unwrap();
    write_state_file(&temp, LEGACY_POLICY_FILENAME, "{}");

    let dev = config(&temp, "dev", r#"{"app_name": "demo"}"#);
    assert_eq!(
      policy_file_path(&dev),
      temp.path().join(".stagecraft").join(LEGACY_POLICY_FILENAME)
    );

    let prod = config(&temp, "prod", r#"{"app_name": "demo"}"#);
    assert_eq!(
      policy_file_path(&prod),
      temp.path().join(".stagecraft").join("policy-prod.json")
    );
  }

  #[test]
  fn stage_file_preferred_over_legacy() {
    let temp = TempDir::new().unwrap();
    write_state_file(&temp, LEGACY_POLICY_FILENAME, "{}");
    write_state_file(&temp, "policy-dev.json", "{}");

    let dev = config(&temp, "dev", r#"{"app_name": "demo"}"#);
    assert_eq!(
      policy_file_path(&dev),
      temp.path().join(".stagecraft").join("policy-dev.json")
    );
  }

  #[test]
  fn load_missing_file_is_empty_document() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, "dev", r#"{"app_name": "demo"}"#);
    let doc = PolicyStore::default().load_last_applied(&config).unwrap();
    assert_eq!(doc, PermissionDocument::empty());
  }

  #[test]
  fn load_malformed_file_fails() {
    let temp = TempDir::new().unwrap();
    write_state_file(&temp, "policy-dev.json", "{\"Version\": 12");
    let config = config(&temp, "dev", r#"{"app_name": "demo"}"#);

    let result = PolicyStore::default().load_last_applied(&config);
    assert!(matches!(result, Err(PolicyError::MalformedPolicyFile { .. })));
  }

  #[test]
  fn persist_then_load() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, "dev", r#"{"app_name": "demo"}"#);
    let store = PolicyStore::default();

    store.persist(&config, &sample_document()).unwrap();
    assert_eq!(store.load_last_applied(&config).unwrap(), sample_document());

    let written = fs::read_to_string(policy_file_path(&config)).unwrap();
    assert!(written.starts_with("{\n  \"Version\": \"2012-10-17\",\n  \"Statement\": ["));
    assert!(written.ends_with("}\n"));
  }

  #[test]
  fn generate_uses_file_when_autogen_disabled() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, "dev", r#"{"app_name": "demo", "autogen_policy": false}"#);
    let store = PolicyStore::default();
    store.persist(&config, &sample_document()).unwrap();

    assert_eq!(store.generate(&config).unwrap(), sample_document());
  }

  #[test]
  fn generate_from_app_when_autogen_enabled() {
    let temp = TempDir::new().unwrap();
    let config = config(&temp, "dev", r#"{"app_name": "demo"}"#);
    let doc = PolicyStore::default().generate(&config).unwrap();
    assert!(doc.allowed_actions().contains("s3:GetObject"));
  }
}
