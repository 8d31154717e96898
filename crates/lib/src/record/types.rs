use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// What a successful deploy left behind for one stage.
///
/// Read once at the start of a deploy or delete, replaced wholesale after a
/// successful deploy, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedResources {
  pub backend: String,
  pub api_handler_arn: String,
  pub api_handler_name: String,

  /// Present exactly when a gateway has been deployed for the stage.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rest_api_id: Option<String>,

  pub api_gateway_stage: String,
  pub region: String,
  pub tool_version: String,

  /// Authorizer function name -> function ARN.
  #[serde(default)]
  pub lambda_functions: BTreeMap<String, String>,
}

impl DeployedResources {
  /// ARNs of every auxiliary function in the record.
  pub fn lambda_function_arns(&self) -> BTreeSet<&str> {
    self.lambda_functions.values().map(String::as_str).collect()
  }

  /// Public URL of the published gateway stage.
  pub fn endpoint_url(&self) -> Option<String> {
    self.rest_api_id.as_ref().map(|id| {
      format!(
        "https://{}.execute-api.{}.amazonaws.com/{}/",
        id, self.region, self.api_gateway_stage
      )
    })
  }
}
