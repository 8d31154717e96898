//! Boundary to the cloud compute, identity and gateway services.
//!
//! The deployer only talks to [`CloudClient`]. Every mutating call either
//! succeeds or fails with a classified [`CloudError`]; a missing target is
//! always reported as [`CloudError::NotFound`].

pub mod arn;
mod error;
mod local;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::FunctionSettings;
use crate::policy::PermissionDocument;

pub use error::{CallContext, CloudError, ResourceKind, TransportFailure};
pub use local::{CloudCall, CloudState, InvokeGrant, LocalCloud, LocalCloudError, RestApiRecord, RoleRecord};

/// Live configuration of a compute function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionConfiguration {
  pub function_name: String,
  pub function_arn: String,
  pub runtime: String,
  pub handler: String,
  pub role_arn: String,
  pub timeout: u32,
  pub memory_size: u32,
  #[serde(default)]
  pub environment_variables: BTreeMap<String, String>,
  #[serde(default)]
  pub tags: BTreeMap<String, String>,
  pub code_sha256: String,
  pub code_size: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct CreateFunction<'a> {
  pub function_name: &'a str,
  pub role_arn: &'a str,
  pub handler: &'a str,
  pub code: &'a [u8],
  pub settings: &'a FunctionSettings,
}

/// Code and configuration replacement for an existing function, applied in one call.
#[derive(Debug, Clone, Copy)]
pub struct UpdateFunction<'a> {
  pub function_name: &'a str,
  pub role_arn: &'a str,
  pub code: &'a [u8],
  pub settings: &'a FunctionSettings,
}

/// Trust relationship letting the compute service assume the execution role.
pub fn lambda_trust_policy() -> Value {
  json!({
    "Version": "2012-10-17",
    "Statement": [{
      "Sid": "",
      "Effect": "Allow",
      "Principal": {"Service": "lambda.amazonaws.com"},
      "Action": "sts:AssumeRole"
    }]
  })
}

/// Remote operations the deployer depends on.
pub trait CloudClient {
  fn region(&self) -> &str;

  // Compute functions.

  fn function_exists(&self, name: &str) -> Result<bool, CloudError>;

  fn get_function_configuration(&self, name: &str) -> Result<FunctionConfiguration, CloudError>;

  /// Returns the ARN of the new function.
  fn create_function(&self, request: &CreateFunction<'_>) -> Result<String, CloudError>;

  fn update_function(&self, request: &UpdateFunction<'_>) -> Result<FunctionConfiguration, CloudError>;

  fn delete_function(&self, name_or_arn: &str) -> Result<(), CloudError>;

  // Execution roles.

  fn get_role_arn_for_name(&self, name: &str) -> Result<String, CloudError>;

  /// Returns the ARN of the new role.
  fn create_role(&self, name: &str, trust_policy: &Value, policy: &PermissionDocument) -> Result<String, CloudError>;

  fn put_role_policy(&self, role_name: &str, policy_name: &str, policy: &PermissionDocument)
  -> Result<(), CloudError>;

  fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> Result<(), CloudError>;

  fn delete_role(&self, name: &str) -> Result<(), CloudError>;

  // HTTP gateway.

  fn rest_api_exists(&self, rest_api_id: &str) -> Result<bool, CloudError>;

  /// Returns the id of the new rest API.
  fn import_rest_api(&self, document: &Value) -> Result<String, CloudError>;

  fn update_api_from_document(&self, rest_api_id: &str, document: &Value) -> Result<(), CloudError>;

  fn deploy_rest_api(&self, rest_api_id: &str, stage_name: &str) -> Result<(), CloudError>;

  fn delete_rest_api(&self, rest_api_id: &str) -> Result<(), CloudError>;

  fn add_permission_for_apigateway(
    &self,
    function_name: &str,
    region: &str,
    account_id: &str,
    rest_api_id: &str,
    statement_id: &str,
  ) -> Result<(), CloudError>;

  fn add_permission_for_authorizer(
    &self,
    rest_api_id: &str,
    function_arn: &str,
    statement_id: &str,
  ) -> Result<(), CloudError>;
}
