use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub const POLICY_VERSION: &str = "2012-10-17";

/// A versioned list of permission statements attached to an execution role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionDocument {
  #[serde(rename = "Version")]
  pub version: String,

  #[serde(rename = "Statement", default)]
  pub statements: Vec<Statement>,
}

impl Default for PermissionDocument {
  fn default() -> Self {
    Self::empty()
  }
}

impl PermissionDocument {
  /// A document with no statements.
  pub fn empty() -> Self {
    Self {
      version: POLICY_VERSION.to_string(),
      statements: Vec::new(),
    }
  }

  pub fn new(statements: Vec<Statement>) -> Self {
    Self {
      version: POLICY_VERSION.to_string(),
      statements,
    }
  }

  /// Every action granted by an `Allow` statement, across all statements.
  pub fn allowed_actions(&self) -> BTreeSet<String> {
    self
      .statements
      .iter()
      .filter(|statement| statement.effect == Effect::Allow)
      .flat_map(|statement| statement.action.iter().cloned())
      .collect()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
  #[serde(rename = "Sid", default, skip_serializing_if = "Option::is_none")]
  pub sid: Option<String>,

  #[serde(rename = "Effect")]
  pub effect: Effect,

  #[serde(rename = "Action")]
  pub action: OneOrMany,

  #[serde(rename = "Resource")]
  pub resource: OneOrMany,

  /// Keys this tool does not interpret (`Condition`, `Principal`, ...), kept verbatim.
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

impl Statement {
  pub fn allow(actions: Vec<String>, resources: Vec<String>) -> Self {
    Self {
      sid: None,
      effect: Effect::Allow,
      action: OneOrMany::Many(actions),
      resource: OneOrMany::Many(resources),
      extra: BTreeMap::new(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
  Allow,
  Deny,
}

/// A policy field that may be written as a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
  One(String),
  Many(Vec<String>),
}

impl OneOrMany {
  pub fn iter(&self) -> impl Iterator<Item = &String> {
    match self {
      OneOrMany::One(value) => std::slice::from_ref(value).iter(),
      OneOrMany::Many(values) => values.iter(),
    }
  }
}
