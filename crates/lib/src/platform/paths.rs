use std::path::{Path, PathBuf};

use crate::consts::{APP_NAME, PROJECT_DIR_NAME};

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var_os("USERPROFILE")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var_os("HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var_os("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Default state file of the local cloud emulator for a region.
pub fn cloud_state_path(region: &str) -> PathBuf {
  data_dir().join("cloud").join(format!("{}.json", region))
}

/// Project-relative configuration directory (`<project>/.stagecraft`).
pub fn project_state_dir(project_dir: &Path) -> PathBuf {
  project_dir.join(PROJECT_DIR_NAME)
}

/// Directory holding built deployment packages.
pub fn deployments_dir(project_dir: &Path) -> PathBuf {
  project_state_dir(project_dir).join("deployments")
}
