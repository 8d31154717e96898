//! Deployment package building.
//!
//! # Archive layout
//!
//! ```text
//! deployment.zip
//! ├── app.json
//! ├── src/...      # application code, refreshed on every update
//! └── vendor/...   # third-party code, kept across in-place refreshes
//! ```
//!
//! Entries are written in sorted order with a fixed timestamp and mode, so
//! building the same tree twice produces byte-identical archives.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::consts::APP_DEFINITION_FILENAME;
use crate::platform::paths::deployments_dir;

pub const ARTIFACT_FILENAME: &str = "deployment.zip";
const SOURCE_DIR: &str = "src";
const VENDOR_DIR: &str = "vendor";

#[derive(Debug, Error)]
pub enum ArtifactError {
  #[error("deployment package not found: {}", path.display())]
  Missing { path: PathBuf },

  #[error("I/O error on {}: {source}", path.display())]
  Io { path: PathBuf, source: io::Error },

  #[error("failed to walk project files: {0}")]
  Walk(#[from] walkdir::Error),

  #[error("invalid deployment package {}: {source}", path.display())]
  Zip { path: PathBuf, source: ZipError },
}

/// Builds the code package uploaded to the compute service.
pub trait ArtifactBuilder {
  /// Build a fresh package and return its path.
  fn build(&self, project_dir: &Path) -> Result<PathBuf, ArtifactError>;

  /// Where the package for a project lives. Never builds.
  fn artifact_path(&self, project_dir: &Path) -> PathBuf;

  /// Patch an existing package with the project's current application code.
  fn inject_latest_code(&self, artifact: &Path, project_dir: &Path) -> Result<(), ArtifactError>;
}

/// Zip packager for `app.json`, `src/` and `vendor/`.
#[derive(Debug, Clone, Default)]
pub struct ZipPackager;

impl ZipPackager {
  pub fn new() -> Self {
    Self
  }
}

impl ArtifactBuilder for ZipPackager {
  fn build(&self, project_dir: &Path) -> Result<PathBuf, ArtifactError> {
    let path = self.artifact_path(project_dir);
    let mut entries = application_entries(project_dir)?;
    entries.extend(collect_dir(project_dir, VENDOR_DIR)?);

    write_archive(&path, &entries)?;
    info!(path = %path.display(), files = entries.len(), "built deployment package");
    Ok(path)
  }

  fn artifact_path(&self, project_dir: &Path) -> PathBuf {
    deployments_dir(project_dir).join(ARTIFACT_FILENAME)
  }

  fn inject_latest_code(&self, artifact: &Path, project_dir: &Path) -> Result<(), ArtifactError> {
    let mut entries: BTreeMap<String, Vec<u8>> = read_archive(artifact)?
      .into_iter()
      .filter(|(name, _)| !is_application_entry(name))
      .collect();
    let kept = entries.len();
    entries.extend(application_entries(project_dir)?);

    write_archive(artifact, &entries)?;
    debug!(path = %artifact.display(), kept, files = entries.len(), "injected latest code");
    Ok(())
  }
}

/// Read a package into memory for upload.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
  fs::read(path).map_err(|source| {
    if source.kind() == io::ErrorKind::NotFound {
      ArtifactError::Missing { path: path.to_path_buf() }
    } else {
      ArtifactError::Io {
        path: path.to_path_buf(),
        source,
      }
    }
  })
}

fn is_application_entry(name: &str) -> bool {
  name == APP_DEFINITION_FILENAME || name.starts_with("src/")
}

/// `app.json` plus everything under `src/`.
fn application_entries(project_dir: &Path) -> Result<BTreeMap<String, Vec<u8>>, ArtifactError> {
  let mut entries = collect_dir(project_dir, SOURCE_DIR)?;

  let definition = project_dir.join(APP_DEFINITION_FILENAME);
  if definition.is_file() {
    entries.insert(APP_DEFINITION_FILENAME.to_string(), read_file(&definition)?);
  }
  Ok(entries)
}

/// Every regular file under `project_dir/dir`, keyed by `/`-separated archive name.
fn collect_dir(project_dir: &Path, dir: &str) -> Result<BTreeMap<String, Vec<u8>>, ArtifactError> {
  let mut entries = BTreeMap::new();
  let root = project_dir.join(dir);
  if !root.is_dir() {
    return Ok(entries);
  }

  for entry in WalkDir::new(&root).sort_by_file_name() {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }

    let rel_path = entry.path().strip_prefix(project_dir).unwrap_or(entry.path());
    let name = rel_path
      .components()
      .map(|c| c.as_os_str().to_string_lossy())
      .collect::<Vec<_>>()
      .join("/");
    entries.insert(name, read_file(entry.path())?);
  }

  Ok(entries)
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
  fs::read(path).map_err(|source| ArtifactError::Io {
    path: path.to_path_buf(),
    source,
  })
}

fn read_archive(path: &Path) -> Result<BTreeMap<String, Vec<u8>>, ArtifactError> {
  let zip_err = |source| ArtifactError::Zip {
    path: path.to_path_buf(),
    source,
  };
  let io_err = |source| ArtifactError::Io {
    path: path.to_path_buf(),
    source,
  };

  let file = fs::File::open(path).map_err(|source| {
    if source.kind() == io::ErrorKind::NotFound {
      ArtifactError::Missing { path: path.to_path_buf() }
    } else {
      io_err(source)
    }
  })?;
  let mut archive = ZipArchive::new(io::BufReader::new(file)).map_err(zip_err)?;

  let mut entries = BTreeMap::new();
  for i in 0..archive.len() {
    let mut file = archive.by_index(i).map_err(zip_err)?;
    if file.is_dir() {
      continue;
    }
    let name = file.name().to_string();
    let mut content = Vec::new();
    file.read_to_end(&mut content).map_err(io_err)?;
    entries.insert(name, content);
  }

  Ok(entries)
}

/// Write entries to `path` via a temp file and rename.
fn write_archive(path: &Path, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), ArtifactError> {
  let zip_err = |source| ArtifactError::Zip {
    path: path.to_path_buf(),
    source,
  };

  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
      path: parent.to_path_buf(),
      source,
    })?;
  }

  let temp_path = path.with_extension("zip.tmp");
  let file = fs::File::create(&temp_path).map_err(|source| ArtifactError::Io {
    path: temp_path.clone(),
    source,
  })?;

  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .last_modified_time(DateTime::default())
    .unix_permissions(0o644);

  let mut writer = ZipWriter::new(file);
  for (name, content) in entries {
    writer.start_file(name.as_str(), options).map_err(zip_err)?;
    writer.write_all(content).map_err(|source| ArtifactError::Io {
      path: temp_path.clone(),
      source,
    })?;
  }
  writer.finish().map_err(zip_err)?;

  fs::rename(&temp_path, path).map_err(|source| ArtifactError::Io {
    path: path.to_path_buf(),
    source,
  })
}
