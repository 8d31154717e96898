mod delete;
mod deploy;
mod gen_policy;
mod new_project;
mod status;
mod url;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracing::debug;

use stagecraft_lib::cloud::LocalCloud;
use stagecraft_lib::config::{ConfigOverrides, DeployConfig};
use stagecraft_lib::platform::paths::cloud_state_path;

use crate::output::OutputFormat;

pub use delete::cmd_delete;
pub use deploy::cmd_deploy;
pub use gen_policy::cmd_gen_policy;
pub use new_project::cmd_new_project;
pub use status::cmd_status;
pub use url::cmd_url;

/// Global flags shared by every command.
pub struct Context {
  pub project_dir: PathBuf,
  pub stage: String,
  pub region: Option<String>,
  pub cloud_state: Option<PathBuf>,
  pub no_prompt: bool,
  pub output: OutputFormat,
}

impl Context {
  fn project_dir(&self) -> PathBuf {
    dunce::canonicalize(&self.project_dir).unwrap_or_else(|_| self.project_dir.clone())
  }

  fn load_config(&self) -> Result<DeployConfig> {
    let project_dir = self.project_dir();
    let overrides = ConfigOverrides {
      region: self.region.clone(),
    };
    DeployConfig::load(&project_dir, &self.stage, overrides)
      .with_context(|| format!("Failed to load project in {}", project_dir.display()))
  }

  fn open_cloud(&self, config: &DeployConfig) -> Result<LocalCloud> {
    let region = config.region();
    let path = self
      .cloud_state
      .clone()
      .unwrap_or_else(|| cloud_state_path(&region));
    debug!(path = %path.display(), region = %region, "opening cloud state");
    LocalCloud::open(&path, region).context("Failed to open cloud state")
  }
}
