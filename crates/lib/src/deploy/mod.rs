//! Deploy and delete orchestration.
//!
//! A deploy runs strictly in order, each step consuming identifiers the
//! previous one produced:
//!
//! ```text
//! validate -> read record -> compute (role, handler, authorizers, cleanup)
//!          -> gateway (document, publish, grants) -> write record
//! ```
//!
//! Nothing is rolled back on failure. Every step starts with an existence
//! check, so running the same deploy again finishes whatever was left undone.

mod compute;
mod error;
mod gateway;
mod identity;

use tracing::{info, warn};

use crate::artifact::{ArtifactBuilder, ZipPackager};
use crate::cloud::CloudClient;
use crate::config::DeployConfig;
use crate::consts::{BACKEND_NAME, TOOL_VERSION};
use crate::policy::PolicyStore;
use crate::prompt::Prompter;
use crate::record::{DeployedResources, RecordStore};
use crate::routing::{OpenApiGenerator, RoutingGenerator};
use crate::validate::validate_configuration;

pub use compute::{ComputeOutcome, ComputeReconciler, DeployedAuthorizer, FunctionDeletion};
pub use error::{DeployError, render_cloud_error};
pub use gateway::{GatewayOutcome, GatewayReconciler};
pub use identity::IdentityReconciler;

/// Result of a successful deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
  pub stage: String,
  pub resources: DeployedResources,
  /// Auxiliary functions removed because the application no longer declares them.
  pub removed_functions: Vec<String>,
}

/// What a delete did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
  /// False when no record existed and nothing was attempted.
  pub found: bool,
  pub rest_api_deleted: bool,
  pub functions: FunctionDeletion,
}

/// Deploys and deletes stages against a cloud client.
pub struct Deployer<'a> {
  cloud: &'a dyn CloudClient,
  prompter: &'a dyn Prompter,
  artifacts: Box<dyn ArtifactBuilder>,
  routing: Box<dyn RoutingGenerator>,
  policies: PolicyStore,
}

impl<'a> Deployer<'a> {
  pub fn new(cloud: &'a dyn CloudClient, prompter: &'a dyn Prompter) -> Self {
    Self {
      cloud,
      prompter,
      artifacts: Box::new(ZipPackager::new()),
      routing: Box::new(OpenApiGenerator::new()),
      policies: PolicyStore::default(),
    }
  }

  pub fn with_artifact_builder(mut self, artifacts: Box<dyn ArtifactBuilder>) -> Self {
    self.artifacts = artifacts;
    self
  }

  pub fn with_routing_generator(mut self, routing: Box<dyn RoutingGenerator>) -> Self {
    self.routing = routing;
    self
  }

  pub fn with_policy_store(mut self, policies: PolicyStore) -> Self {
    self.policies = policies;
    self
  }

  fn identity(&self) -> IdentityReconciler<'_> {
    IdentityReconciler::new(self.cloud, &self.policies, self.prompter)
  }

  fn compute(&self) -> ComputeReconciler<'_> {
    ComputeReconciler::new(self.cloud, self.artifacts.as_ref(), self.identity(), self.prompter)
  }

  fn gateway(&self) -> GatewayReconciler<'_> {
    GatewayReconciler::new(self.cloud, self.routing.as_ref())
  }

  /// Bring the stage named in `config` in line with its application definition.
  ///
  /// The stage's record is replaced only after every step has succeeded.
  pub fn deploy(&self, config: &DeployConfig) -> Result<DeployResult, DeployError> {
    validate_configuration(config)?;

    let records = RecordStore::for_project(&config.project_dir);
    let previous = records.load(&config.stage)?;
    info!(
      app = %config.app_name,
      stage = %config.stage,
      redeploy = previous.is_some(),
      "deploying"
    );

    let compute = self.compute().deploy(config, previous.as_ref())?;
    let gateway = self.gateway().deploy(config, previous.as_ref(), &compute)?;

    let resources = DeployedResources {
      backend: BACKEND_NAME.to_string(),
      api_handler_arn: compute.api_handler_arn.clone(),
      api_handler_name: compute.api_handler_name.clone(),
      rest_api_id: Some(gateway.rest_api_id),
      api_gateway_stage: gateway.stage,
      region: gateway.region,
      tool_version: TOOL_VERSION.to_string(),
      lambda_functions: compute.lambda_functions(),
    };
    records.save(&config.stage, &resources)?;

    Ok(DeployResult {
      stage: config.stage.clone(),
      resources,
      removed_functions: compute.removed,
    })
  }

  /// Tear down everything recorded for the stage named in `config`.
  ///
  /// Without a record this makes no remote call at all.
  pub fn delete(&self, config: &DeployConfig) -> Result<DeleteReport, DeployError> {
    let records = RecordStore::for_project(&config.project_dir);
    let Some(previous) = records.load(&config.stage)? else {
      info!(stage = %config.stage, "no existing resources found for stage");
      return Ok(DeleteReport::default());
    };

    let rest_api_deleted = self.gateway().delete(&previous)?;
    let functions = self.compute().delete(config, &previous)?;

    if !records.remove(&config.stage)? {
      warn!(stage = %config.stage, "record vanished during delete");
    }

    Ok(DeleteReport {
      found: true,
      rest_api_deleted,
      functions,
    })
  }
}
