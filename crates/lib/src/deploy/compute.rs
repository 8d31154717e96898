//! Compute function reconciliation: the API handler, its authorizers, and
//! cleanup of functions the application no longer declares.
//!
//! Whether a function is created or updated is decided by asking the
//! compute service on every run. The resource record only supplies names to
//! look up, so a function deleted out-of-band is recreated rather than updated.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::artifact::{ArtifactBuilder, read_artifact};
use crate::cloud::{CloudClient, CreateFunction, FunctionConfiguration, UpdateFunction};
use crate::config::DeployConfig;
use crate::consts::API_HANDLER_ENTRY_POINT;
use crate::prompt::{Decision, DecisionPoint, Prompter};
use crate::record::DeployedResources;

use super::error::DeployError;
use super::identity::{IdentityReconciler, gate};

/// An authorizer function as deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedAuthorizer {
  /// Authorizer name from the application definition.
  pub name: String,
  pub function_name: String,
  pub function_arn: String,
}

/// What the compute phase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeOutcome {
  pub api_handler_name: String,
  pub api_handler_arn: String,
  pub role_arn: String,
  pub authorizers: Vec<DeployedAuthorizer>,
  /// ARNs of unreferenced functions removed after reconciliation.
  pub removed: Vec<String>,
}

impl ComputeOutcome {
  /// Function name -> ARN of every auxiliary function.
  pub fn lambda_functions(&self) -> BTreeMap<String, String> {
    self
      .authorizers
      .iter()
      .map(|auth| (auth.function_name.clone(), auth.function_arn.clone()))
      .collect()
  }

  /// Authorizer name -> ARN, as the routing document refers to them.
  pub fn authorizer_arns(&self) -> BTreeMap<String, String> {
    self
      .authorizers
      .iter()
      .map(|auth| (auth.name.clone(), auth.function_arn.clone()))
      .collect()
  }
}

/// What the delete path removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionDeletion {
  pub deleted: Vec<String>,
  /// Functions that were already gone.
  pub missing: Vec<String>,
  /// Name of the deleted role, when one was deleted.
  pub role: Option<String>,
}

pub struct ComputeReconciler<'a> {
  cloud: &'a dyn CloudClient,
  artifacts: &'a dyn ArtifactBuilder,
  identity: IdentityReconciler<'a>,
  prompter: &'a dyn Prompter,
}

impl<'a> ComputeReconciler<'a> {
  pub fn new(
    cloud: &'a dyn CloudClient,
    artifacts: &'a dyn ArtifactBuilder,
    identity: IdentityReconciler<'a>,
    prompter: &'a dyn Prompter,
  ) -> Self {
    Self {
      cloud,
      artifacts,
      identity,
      prompter,
    }
  }

  /// Bring the handler and every authorizer in line with `config`, then
  /// delete functions `previous` recorded that are no longer declared.
  pub fn deploy(
    &self,
    config: &DeployConfig,
    previous: Option<&DeployedResources>,
  ) -> Result<ComputeOutcome, DeployError> {
    let (api_handler_name, api_handler_arn, role_arn) = self.deploy_api_handler(config, previous)?;
    let authorizers = self.deploy_authorizers(config, &api_handler_name, &role_arn)?;

    let mut outcome = ComputeOutcome {
      api_handler_name,
      api_handler_arn,
      role_arn,
      authorizers,
      removed: Vec::new(),
    };
    if let Some(previous) = previous {
      outcome.removed = self.cleanup_unreferenced(previous, &outcome)?;
    }
    Ok(outcome)
  }

  fn deploy_api_handler(
    &self,
    config: &DeployConfig,
    previous: Option<&DeployedResources>,
  ) -> Result<(String, String, String), DeployError> {
    if let Some(previous) = previous {
      let name = previous.api_handler_name.as_str();
      if self.cloud.function_exists(name)? {
        self.confirm_runtime_change(config, name)?;
        let role_arn = self.identity.resolve_or_create(config, name)?;
        let updated = self.update_function(config, name, &role_arn)?;
        return Ok((name.to_string(), updated.function_arn, role_arn));
      }
      info!(function = name, "recorded handler not found, creating it again");
    }

    let name = format!("{}-{}", config.app_name, config.stage);
    info!(function = %name, "initial creation of handler function");
    let role_arn = self.identity.resolve_or_create(config, &name)?;
    let artifact = self.artifacts.build(&config.project_dir)?;
    let code = read_artifact(&artifact)?;
    let settings = config.function_settings();

    let function_arn = self.cloud.create_function(&CreateFunction {
      function_name: &name,
      role_arn: &role_arn,
      handler: API_HANDLER_ENTRY_POINT,
      code: &code,
      settings: &settings,
    })?;
    Ok((name, function_arn, role_arn))
  }

  fn deploy_authorizers(
    &self,
    config: &DeployConfig,
    api_handler_name: &str,
    role_arn: &str,
  ) -> Result<Vec<DeployedAuthorizer>, DeployError> {
    let mut deployed = Vec::with_capacity(config.app.authorizers.len());

    for authorizer in &config.app.authorizers {
      let scoped = config.scope(&authorizer.name);
      let function_name = format!("{}-{}", api_handler_name, authorizer.name);

      let function_arn = if self.cloud.function_exists(&function_name)? {
        self.update_function(&scoped, &function_name, role_arn)?.function_arn
      } else {
        info!(function = %function_name, "creating authorizer function");
        let code = read_artifact(&self.artifacts.artifact_path(&config.project_dir))?;
        let settings = scoped.function_settings();
        self.cloud.create_function(&CreateFunction {
          function_name: &function_name,
          role_arn,
          handler: &authorizer.handler,
          code: &code,
          settings: &settings,
        })?
      };

      deployed.push(DeployedAuthorizer {
        name: authorizer.name.clone(),
        function_name,
        function_arn,
      });
    }

    Ok(deployed)
  }

  fn confirm_runtime_change(&self, config: &DeployConfig, function_name: &str) -> Result<(), DeployError> {
    let live = self.cloud.get_function_configuration(function_name)?;
    let desired = config.runtime();
    if live.runtime != desired {
      let message = format!(
        "The runtime will change from {} to {}, would you like to continue?",
        live.runtime, desired
      );
      gate(self.prompter, Decision::new(DecisionPoint::RuntimeChange, message))?;
    }
    Ok(())
  }

  /// Replace code and configuration of an existing function in one call.
  fn update_function(
    &self,
    config: &DeployConfig,
    function_name: &str,
    role_arn: &str,
  ) -> Result<FunctionConfiguration, DeployError> {
    let artifact = self.artifacts.artifact_path(&config.project_dir);
    if artifact.exists() {
      self.artifacts.inject_latest_code(&artifact, &config.project_dir)?;
    } else {
      self.artifacts.build(&config.project_dir)?;
    }
    let code = read_artifact(&artifact)?;
    let settings = config.function_settings();

    info!(function = function_name, "updating function");
    Ok(self.cloud.update_function(&UpdateFunction {
      function_name,
      role_arn,
      code: &code,
      settings: &settings,
    })?)
  }

  fn cleanup_unreferenced(
    &self,
    previous: &DeployedResources,
    outcome: &ComputeOutcome,
  ) -> Result<Vec<String>, DeployError> {
    let current: BTreeSet<&str> = outcome.authorizers.iter().map(|a| a.function_arn.as_str()).collect();
    let mut removed = Vec::new();

    for function_arn in previous.lambda_function_arns().difference(&current) {
      info!(function_arn, "deleting unreferenced function");
      if self.delete_function(function_arn)? {
        removed.push(function_arn.to_string());
      }
    }
    Ok(removed)
  }

  /// Returns false when the function was already gone.
  fn delete_function(&self, name_or_arn: &str) -> Result<bool, DeployError> {
    match self.cloud.delete_function(name_or_arn) {
      Ok(()) => Ok(true),
      Err(e) if e.is_not_found() => {
        info!(function = name_or_arn, "no function found, already deleted");
        Ok(false)
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Delete the handler, every recorded authorizer, and (if confirmed) the managed role.
  pub fn delete(&self, config: &DeployConfig, previous: &DeployedResources) -> Result<FunctionDeletion, DeployError> {
    let mut deletion = FunctionDeletion::default();

    let targets = std::iter::once(previous.api_handler_name.as_str()).chain(previous.lambda_function_arns());
    for target in targets {
      debug!(function = target, "deleting function");
      if self.delete_function(target)? {
        deletion.deleted.push(target.to_string());
      } else {
        deletion.missing.push(target.to_string());
      }
    }

    deletion.role = self.identity.delete(config, &previous.api_handler_name)?;
    Ok(deletion)
  }
}
