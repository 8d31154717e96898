//! HTTP gateway reconciliation.

use tracing::info;
use uuid::Uuid;

use crate::cloud::{CloudClient, arn};
use crate::config::DeployConfig;
use crate::record::DeployedResources;
use crate::routing::{FunctionArns, RoutingGenerator};

use super::compute::ComputeOutcome;
use super::error::DeployError;

/// What the gateway phase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOutcome {
  pub rest_api_id: String,
  pub region: String,
  pub stage: String,
}

pub struct GatewayReconciler<'a> {
  cloud: &'a dyn CloudClient,
  routing: &'a dyn RoutingGenerator,
}

impl<'a> GatewayReconciler<'a> {
  pub fn new(cloud: &'a dyn CloudClient, routing: &'a dyn RoutingGenerator) -> Self {
    Self { cloud, routing }
  }

  /// Create or update the gateway, publish it, and let it invoke every function.
  pub fn deploy(
    &self,
    config: &DeployConfig,
    previous: Option<&DeployedResources>,
    compute: &ComputeOutcome,
  ) -> Result<GatewayOutcome, DeployError> {
    let region = self.cloud.region().to_string();
    let authorizer_arns = compute.authorizer_arns();
    let document = self.routing.generate(
      &region,
      FunctionArns {
        api_handler: &compute.api_handler_arn,
        authorizers: &authorizer_arns,
      },
      &config.app,
    );

    let existing = match previous.and_then(|p| p.rest_api_id.as_deref()) {
      Some(rest_api_id) if self.cloud.rest_api_exists(rest_api_id)? => Some(rest_api_id.to_string()),
      _ => None,
    };

    let rest_api_id = match existing {
      Some(rest_api_id) => {
        info!(rest_api_id = %rest_api_id, "rest API found, updating it");
        self.cloud.update_api_from_document(&rest_api_id, &document)?;
        rest_api_id
      }
      None => {
        info!("initiating first time gateway deployment");
        self.cloud.import_rest_api(&document)?
      }
    };

    let stage = config.api_gateway_stage();
    self.publish(&rest_api_id, &region, &stage, compute)?;

    Ok(GatewayOutcome {
      rest_api_id,
      region,
      stage,
    })
  }

  fn publish(
    &self,
    rest_api_id: &str,
    region: &str,
    stage: &str,
    compute: &ComputeOutcome,
  ) -> Result<(), DeployError> {
    let handler_arn = compute.api_handler_arn.as_str();
    let account_id =
      arn::account_id(handler_arn).ok_or_else(|| DeployError::MalformedArn(handler_arn.to_string()))?;

    info!(rest_api_id, stage, "deploying rest API to stage");
    self.cloud.deploy_rest_api(rest_api_id, stage)?;

    // Grants are added unconditionally; a fresh statement id keeps them from colliding.
    self.cloud.add_permission_for_apigateway(
      arn::function_name(handler_arn),
      region,
      account_id,
      rest_api_id,
      &Uuid::new_v4().to_string(),
    )?;

    for authorizer in &compute.authorizers {
      self
        .cloud
        .add_permission_for_authorizer(rest_api_id, &authorizer.function_arn, &Uuid::new_v4().to_string())?;
    }
    Ok(())
  }

  /// Delete the recorded gateway. Returns false when it was already gone.
  pub fn delete(&self, previous: &DeployedResources) -> Result<bool, DeployError> {
    let Some(rest_api_id) = previous.rest_api_id.as_deref() else {
      return Ok(false);
    };

    info!(rest_api_id, "deleting rest API");
    match self.cloud.delete_rest_api(rest_api_id) {
      Ok(()) => Ok(true),
      Err(e) if e.is_not_found() => {
        info!(rest_api_id, "no rest API found, already deleted");
        Ok(false)
      }
      Err(e) => Err(e.into()),
    }
  }
}
