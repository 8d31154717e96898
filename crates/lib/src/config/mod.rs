//! Deployment configuration.
//!
//! [`ProjectConfig`] is what the user writes to `.stagecraft/config.json`;
//! [`DeployConfig`] is the immutable, stage-resolved view the deployer works
//! from. Lookups chain function -> stage -> global -> platform default, and
//! map-valued settings (environment variables, tags) are merged along the
//! same chain with the more specific level winning.

mod types;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::app::{self, AppError, ApplicationDefinition};
use crate::consts::{
  CONFIG_FILENAME, DEFAULT_API_GATEWAY_STAGE, DEFAULT_LAMBDA_MEMORY_SIZE, DEFAULT_LAMBDA_TIMEOUT, DEFAULT_REGION,
  DEFAULT_RUNTIME, DEFAULT_STAGE_NAME, DEFAULT_TAG_KEY, TOOL_VERSION,
};
use crate::platform::paths::project_state_dir;

pub use types::{FunctionOverrides, FunctionSettings, IamRoleMode, ProjectConfig, StageSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config file not found: {} (run `stagecraft new-project` first)", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read config file {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("invalid config file {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("config file {} does not set `app_name`", path.display())]
  MissingAppName { path: PathBuf },

  #[error(transparent)]
  App(#[from] AppError),
}

/// Path of `.stagecraft/config.json` for a project.
pub fn config_path(project_dir: &Path) -> PathBuf {
  project_state_dir(project_dir).join(CONFIG_FILENAME)
}

impl ProjectConfig {
  /// Load the project config from `.stagecraft/config.json`.
  pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
    let path = config_path(project_dir);

    let content = match fs::read_to_string(&path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ConfigError::NotFound { path }),
      Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let config: ProjectConfig = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.clone(),
      source,
    })?;

    if config.app_name.trim().is_empty() {
      return Err(ConfigError::MissingAppName { path });
    }

    Ok(config)
  }
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub region: Option<String>,
}

/// Stage-resolved deployment configuration.
#[derive(Debug, Clone)]
pub struct DeployConfig {
  pub project_dir: PathBuf,
  pub app_name: String,
  pub stage: String,
  pub app: ApplicationDefinition,
  project: ProjectConfig,
  overrides: ConfigOverrides,
  function_name: Option<String>,
}

impl DeployConfig {
  pub fn new(
    project_dir: impl Into<PathBuf>,
    stage: impl Into<String>,
    project: ProjectConfig,
    app: ApplicationDefinition,
    overrides: ConfigOverrides,
  ) -> Self {
    Self {
      project_dir: project_dir.into(),
      app_name: project.app_name.clone(),
      stage: stage.into(),
      app,
      project,
      overrides,
      function_name: None,
    }
  }

  /// Load `config.json` and `app.json` from a project and resolve them for `stage`.
  pub fn load(project_dir: &Path, stage: &str, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
    let project = ProjectConfig::load(project_dir)?;
    let app = app::load_definition(project_dir)?;
    debug!(app = %project.app_name, stage, "resolved deploy config");
    Ok(Self::new(project_dir, stage, project, app, overrides))
  }

  /// A copy of this config whose function-level lookups use `function_name`.
  pub fn scope(&self, function_name: &str) -> Self {
    let mut scoped = self.clone();
    scoped.function_name = Some(function_name.to_string());
    scoped
  }

  pub fn function_name(&self) -> Option<&str> {
    self.function_name.as_deref()
  }

  pub fn is_default_stage(&self) -> bool {
    self.stage == DEFAULT_STAGE_NAME
  }

  pub fn state_dir(&self) -> PathBuf {
    project_state_dir(&self.project_dir)
  }

  fn stage_settings(&self) -> Option<&StageSettings> {
    self.project.stages.get(&self.stage)
  }

  fn function_overrides(&self) -> Option<&FunctionOverrides> {
    let name = self.function_name.as_ref()?;
    self.stage_settings()?.lambda_functions.get(name)
  }

  /// Stage value if set, else the global value.
  fn lookup<T: Clone>(&self, get: impl Fn(&StageSettings) -> Option<&T>) -> Option<T> {
    self
      .stage_settings()
      .and_then(&get)
      .or_else(|| get(&self.project.settings))
      .cloned()
  }

  /// Function value if set, else the stage value, else the global value.
  fn lookup_function<T: Clone>(&self, get: impl Fn(&FunctionOverrides) -> Option<&T>) -> Option<T> {
    self
      .function_overrides()
      .and_then(&get)
      .cloned()
      .or_else(|| self.lookup(|s| get(&s.function)))
  }

  /// Merge a map-valued setting global -> stage -> function.
  fn merge_function_map(
    &self,
    get: impl Fn(&FunctionOverrides) -> Option<&BTreeMap<String, String>>,
  ) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    let levels = [
      Some(&self.project.settings.function),
      self.stage_settings().map(|s| &s.function),
      self.function_overrides(),
    ];
    for level in levels.into_iter().flatten() {
      if let Some(map) = get(level) {
        merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
      }
    }
    merged
  }

  pub fn region(&self) -> String {
    self
      .overrides
      .region
      .clone()
      .or_else(|| self.lookup(|s| s.region.as_ref()))
      .unwrap_or_else(|| DEFAULT_REGION.to_string())
  }

  /// Gateway stage the API is published to.
  pub fn api_gateway_stage(&self) -> String {
    self
      .lookup(|s| s.api_gateway_stage.as_ref())
      .unwrap_or_else(|| DEFAULT_API_GATEWAY_STAGE.to_string())
  }

  pub fn iam_role_mode(&self) -> IamRoleMode {
    let manage = self.lookup(|s| s.manage_iam_role.as_ref()).unwrap_or(true);
    if manage {
      IamRoleMode::Managed
    } else {
      IamRoleMode::Provided {
        arn: self.lookup(|s| s.iam_role_arn.as_ref()),
      }
    }
  }

  pub fn autogen_policy(&self) -> bool {
    self.lookup(|s| s.autogen_policy.as_ref()).unwrap_or(true)
  }

  pub fn iam_policy_file(&self) -> Option<String> {
    self.lookup(|s| s.iam_policy_file.as_ref())
  }

  /// Runtime identifier, shared by every function of the stage.
  pub fn runtime(&self) -> String {
    self
      .lookup_function(|f| f.runtime.as_ref())
      .unwrap_or_else(|| DEFAULT_RUNTIME.to_string())
  }

  /// Resolve every per-function setting once, applying platform defaults.
  pub fn function_settings(&self) -> FunctionSettings {
    let mut tags = BTreeMap::new();
    tags.insert(
      DEFAULT_TAG_KEY.to_string(),
      format!("version={}:stage={}:app={}", TOOL_VERSION, self.stage, self.app_name),
    );
    tags.extend(self.merge_function_map(|f| f.tags.as_ref()));

    FunctionSettings {
      runtime: self.runtime(),
      environment_variables: self.merge_function_map(|f| f.environment_variables.as_ref()),
      tags,
      timeout: self
        .lookup_function(|f| f.lambda_timeout.as_ref())
        .unwrap_or(DEFAULT_LAMBDA_TIMEOUT),
      memory_size: self
        .lookup_function(|f| f.lambda_memory_size.as_ref())
        .unwrap_or(DEFAULT_LAMBDA_MEMORY_SIZE),
    }
  }
}
