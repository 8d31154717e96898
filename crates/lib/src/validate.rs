//! Pre-flight validation of the application and its deploy configuration.
//!
//! Everything here is local: no remote call is made, and any error aborts the
//! deploy before a single resource is touched.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use crate::app::{RouteEntry, RouteTable};
use crate::config::{DeployConfig, IamRoleMode};
use crate::consts::KNOWN_RUNTIMES;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("route cannot end with a trailing slash: {route}")]
  TrailingSlash { route: String },

  #[error(
    "in view function \"{view_name}\", the content types {binary:?} support binary and {non_binary:?} do not; \
     all content types must be consistent in their binary support"
  )]
  MixedContentTypes {
    view_name: String,
    binary: Vec<String>,
    non_binary: Vec<String>,
  },

  #[error(
    "route entry cannot have both CORS enabled and an OPTIONS method configured; an OPTIONS method is \
     added automatically when CORS is enabled, remove OPTIONS from the methods of: {route}"
  )]
  CorsWithOptions { route: String },

  #[error("route may not have multiple differing CORS configurations; make every CORS-enabled view of \"{route}\" use the same configuration")]
  ConflictingCors { route: String },

  #[error("when `manage_iam_role` is false, an `iam_role_arn` must be provided in config.json")]
  MissingIamRoleArn,
}

/// Validate everything known to fail deployment.
pub fn validate_configuration(config: &DeployConfig) -> Result<(), ValidationError> {
  validate_routes(&config.app.routes)?;
  validate_route_content_types(&config.app.routes, &config.app.binary_types)?;
  validate_iam_role(config)?;
  check_runtime(&config.runtime());
  Ok(())
}

pub fn validate_routes(routes: &RouteTable) -> Result<(), ValidationError> {
  for (route, methods) in routes {
    if route != "/" && route.ends_with('/') {
      return Err(ValidationError::TrailingSlash { route: route.clone() });
    }
    validate_cors_for_route(route, methods)?;
  }
  Ok(())
}

pub fn validate_route_content_types(routes: &RouteTable, binary_types: &[String]) -> Result<(), ValidationError> {
  for entry in routes.values().flat_map(|methods| methods.values()) {
    validate_entry_content_types(entry, binary_types)?;
  }
  Ok(())
}

fn validate_entry_content_types(entry: &RouteEntry, binary_types: &[String]) -> Result<(), ValidationError> {
  let (binary, non_binary): (Vec<String>, Vec<String>) = entry
    .content_types
    .iter()
    .cloned()
    .partition(|content_type| binary_types.contains(content_type));

  if !binary.is_empty() && !non_binary.is_empty() {
    return Err(ValidationError::MixedContentTypes {
      view_name: entry.view_name.clone(),
      binary,
      non_binary,
    });
  }
  Ok(())
}

fn validate_cors_for_route(route: &str, methods: &IndexMap<String, RouteEntry>) -> Result<(), ValidationError> {
  let mut with_cors = methods.values().filter_map(|entry| entry.cors.as_ref());

  let Some(first) = with_cors.next() else {
    return Ok(());
  };

  if methods.keys().any(|method| method.eq_ignore_ascii_case("OPTIONS")) {
    return Err(ValidationError::CorsWithOptions {
      route: route.to_string(),
    });
  }

  if with_cors.any(|cors| cors != first) {
    return Err(ValidationError::ConflictingCors {
      route: route.to_string(),
    });
  }
  Ok(())
}

fn validate_iam_role(config: &DeployConfig) -> Result<(), ValidationError> {
  match config.iam_role_mode() {
    IamRoleMode::Provided { arn: None } => Err(ValidationError::MissingIamRoleArn),
    IamRoleMode::Provided { arn: Some(arn) } if arn.trim().is_empty() => Err(ValidationError::MissingIamRoleArn),
    _ => Ok(()),
  }
}

/// Warn when the runtime is not one the compute service is known to accept.
///
/// Not fatal: new runtimes appear before this list is updated.
pub fn check_runtime(runtime: &str) -> bool {
  let known = KNOWN_RUNTIMES.contains(&runtime);
  if !known {
    warn!(runtime, known = ?KNOWN_RUNTIMES, "configured runtime is not a known runtime, deployment may fail");
  }
  known
}
