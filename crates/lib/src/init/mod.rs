//! Scaffold a new project.
//!
//! Creates `<parent>/<name>/` with:
//! - `app.json` declaring one route
//! - `src/app.py` starter handler
//! - `.stagecraft/config.json` naming the app
//! - `.gitignore` excluding built packages

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::app::definition_path;
use crate::config::config_path;

pub use templates::{APP_JSON_TEMPLATE, APP_SOURCE_TEMPLATE, CONFIG_JSON_TEMPLATE, GITIGNORE_TEMPLATE};

#[derive(Debug, Error)]
pub enum InitError {
  #[error("directory already exists: {}", path.display())]
  PathExists { path: PathBuf },

  #[error("invalid project name \"{name}\": use letters, digits, '-' and '_' only")]
  InvalidName { name: String },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },
}

/// Result of a successful scaffold.
#[derive(Debug)]
pub struct NewProject {
  pub project_dir: PathBuf,
  pub app_json: PathBuf,
  pub config_json: PathBuf,
}

/// Function names are derived from the app name, so keep it to safe characters.
fn validate_name(name: &str) -> Result<(), InitError> {
  let valid = !name.is_empty()
    && name
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if valid {
    Ok(())
  } else {
    Err(InitError::InvalidName { name: name.to_string() })
  }
}

fn write(path: &Path, content: &str) -> Result<(), InitError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|e| InitError::CreateDir {
      path: parent.to_path_buf(),
      source: e,
    })?;
  }
  fs::write(path, content).map_err(|e| InitError::WriteFile {
    path: path.to_path_buf(),
    source: e,
  })
}

/// Create a new project directory named `name` under `parent`.
///
/// # Errors
///
/// Fails if the name is not usable in function names or the directory already exists.
pub fn new_project(parent: &Path, name: &str) -> Result<NewProject, InitError> {
  validate_name(name)?;

  let project_dir = parent.join(name);
  if project_dir.exists() {
    return Err(InitError::PathExists { path: project_dir });
  }

  let app_json = definition_path(&project_dir);
  let config_json = config_path(&project_dir);

  write(&app_json, APP_JSON_TEMPLATE)?;
  write(&config_json, &CONFIG_JSON_TEMPLATE.replace("{app_name}", name))?;
  write(
    &project_dir.join("src").join("app.py"),
    &APP_SOURCE_TEMPLATE.replace("{app_name}", name),
  )?;
  write(&project_dir.join(".gitignore"), GITIGNORE_TEMPLATE)?;

  info!(project = %project_dir.display(), "created new project");
  Ok(NewProject {
    project_dir,
    app_json,
    config_json,
  })
}
