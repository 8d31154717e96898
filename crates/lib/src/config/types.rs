use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Contents of `.stagecraft/config.json`.
///
/// Top-level settings apply to every stage; `stages.<name>` overrides them,
/// and `stages.<name>.lambda_functions.<fn>` overrides those for one function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
  pub app_name: String,

  #[serde(flatten)]
  pub settings: StageSettings,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub stages: BTreeMap<String, StageSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageSettings {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub region: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_gateway_stage: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub manage_iam_role: Option<bool>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iam_role_arn: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub autogen_policy: Option<bool>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub iam_policy_file: Option<String>,

  #[serde(flatten)]
  pub function: FunctionOverrides,

  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub lambda_functions: BTreeMap<String, FunctionOverrides>,
}

/// Settings that can be declared globally, per stage, or per function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionOverrides {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub runtime: Option<String>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub environment_variables: Option<BTreeMap<String, String>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tags: Option<BTreeMap<String, String>>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lambda_timeout: Option<u32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lambda_memory_size: Option<u32>,
}

/// How the execution identity of the deployed functions is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IamRoleMode {
  /// The deployer creates and maintains the role and its policy.
  Managed,
  /// The user supplies a role; the deployer never creates, diffs, or mutates it.
  Provided { arn: Option<String> },
}

/// Function settings after applying declared values over platform defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSettings {
  pub runtime: String,
  pub environment_variables: BTreeMap<String, String>,
  pub tags: BTreeMap<String, String>,
  pub timeout: u32,
  pub memory_size: u32,
}
