//! Application definition: the route table and authorizers being deployed.
//!
//! The definition lives in `app.json` at the project root:
//!
//! ```json
//! {
//!   "routes": {
//!     "/items": { "GET": { "view_name": "list_items", "cors": true } }
//!   },
//!   "authorizers": [{ "name": "auth1", "handler": "app.auth1" }],
//!   "actions": ["s3:GetObject"]
//! }
//! ```

mod types;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::consts::APP_DEFINITION_FILENAME;

pub use types::{
  ApplicationDefinition, AuthorizerDefinition, CorsConfig, DEFAULT_BINARY_TYPES, RouteEntry, RouteTable,
};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("application definition not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("failed to read application definition {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("invalid application definition {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },
}

/// Path of the application definition inside a project.
pub fn definition_path(project_dir: &Path) -> PathBuf {
  project_dir.join(APP_DEFINITION_FILENAME)
}

/// Load `app.json` from the project root.
pub fn load_definition(project_dir: &Path) -> Result<ApplicationDefinition, AppError> {
  let path = definition_path(project_dir);

  let content = match fs::read_to_string(&path) {
    Ok(content) => content,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(AppError::NotFound { path }),
    Err(source) => return Err(AppError::Read { path, source }),
  };

  let app: ApplicationDefinition = serde_json::from_str(&content).map_err(|source| AppError::Parse {
    path: path.clone(),
    source,
  })?;

  debug!(
    routes = app.routes.len(),
    authorizers = app.authorizers.len(),
    path = %path.display(),
    "loaded application definition"
  );
  Ok(app)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn load_missing_definition() {
    let temp = TempDir::new().unwrap();
    let result = load_definition(temp.path());
    assert!(matches!(result, Err(AppError::NotFound { .. })));
  }

  #[test]
  fn load_rejects_invalid_json() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(APP_DEFINITION_FILENAME), "{ not json").unwrap();
    let result = load_definition(temp.path());
    assert!(matches!(result, Err(AppError::Parse { .. })));
  }

  #[test]
  fn load_valid_definition() {
    let temp = TempDir::new().unwrap();
    fs::write(
      temp.path().join(APP_DEFINITION_FILENAME),
      r#"{"routes": {"/": {"GET": {"view_name": "index"}}}, "authorizers": [{"name": "auth1", "handler": "app.auth1"}]}"#,
    )
    .unwrap();

    let app = load_definition(temp.path()).unwrap();
    assert_eq!(app.routes.len(), 1);
    assert_eq!(app.authorizers[0].name, "auth1");
  }
}
