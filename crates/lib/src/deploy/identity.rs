//! Execution role resolution.

use tracing::{debug, info, warn};

use crate::cloud::{CloudClient, arn, lambda_trust_policy};
use crate::config::{DeployConfig, IamRoleMode};
use crate::policy::{PermissionDocument, PolicyDiff, PolicyStore, diff_policies};
use crate::prompt::{Decision, DecisionPoint, Gate, Prompter, ask};
use crate::validate::ValidationError;

use super::error::DeployError;

/// Resolves, creates, refreshes and deletes the execution role.
pub struct IdentityReconciler<'a> {
  cloud: &'a dyn CloudClient,
  policies: &'a PolicyStore,
  prompter: &'a dyn Prompter,
}

impl<'a> IdentityReconciler<'a> {
  pub fn new(cloud: &'a dyn CloudClient, policies: &'a PolicyStore, prompter: &'a dyn Prompter) -> Self {
    Self {
      cloud,
      policies,
      prompter,
    }
  }

  /// ARN of the role the stage's functions run as.
  ///
  /// A provided role is returned untouched. A managed role named `role_name`
  /// has its policy refreshed when it exists and is created otherwise.
  pub fn resolve_or_create(&self, config: &DeployConfig, role_name: &str) -> Result<String, DeployError> {
    match config.iam_role_mode() {
      IamRoleMode::Provided { arn: Some(arn) } => {
        debug!(role_arn = %arn, "using provided role");
        return Ok(arn);
      }
      IamRoleMode::Provided { arn: None } => return Err(ValidationError::MissingIamRoleArn.into()),
      IamRoleMode::Managed => {}
    }

    match self.cloud.get_role_arn_for_name(role_name) {
      Ok(role_arn) => {
        self.refresh_policy(config, role_name)?;
        Ok(role_arn)
      }
      Err(e) if e.is_not_found() => self.create_role(config, role_name),
      Err(e) => Err(e.into()),
    }
  }

  fn refresh_policy(&self, config: &DeployConfig, role_name: &str) -> Result<(), DeployError> {
    info!(role = role_name, "updating role policy");
    let desired = self.policies.generate(config)?;
    let previous = self.policies.load_last_applied(config)?;

    let diff = diff_policies(Some(&previous), &desired);
    if !diff.is_empty() {
      info!(added = diff.added.len(), removed = diff.removed.len(), "role policy changes");
      gate(self.prompter, Decision::new(DecisionPoint::PolicyChange, describe_diff(&diff)))?;
    }

    match self.cloud.delete_role_policy(role_name, role_name) {
      Ok(()) => {}
      Err(e) if e.is_not_found() => debug!(role = role_name, "no inline policy to replace"),
      Err(e) => return Err(e.into()),
    }
    self.cloud.put_role_policy(role_name, role_name, &desired)?;
    self.policies.persist(config, &desired)?;
    Ok(())
  }

  fn create_role(&self, config: &DeployConfig, role_name: &str) -> Result<String, DeployError> {
    let policy = self.policies.generate(config)?;

    if policy.statements.len() > 1 {
      gate(
        self.prompter,
        Decision::new(DecisionPoint::PolicyCreate, describe_policy(&policy)),
      )?;
    }

    info!(role = role_name, "creating role");
    let role_arn = self.cloud.create_role(role_name, &lambda_trust_policy(), &policy)?;
    self.policies.persist(config, &policy)?;
    Ok(role_arn)
  }

  /// Delete the stage's managed role, if the user agrees.
  ///
  /// Provided roles are never touched. A role that is already gone is not an error.
  pub fn delete(&self, config: &DeployConfig, role_name: &str) -> Result<Option<String>, DeployError> {
    if let IamRoleMode::Provided { .. } = config.iam_role_mode() {
      debug!("role is provided, not deleting it");
      return Ok(None);
    }

    let role_arn = match self.cloud.get_role_arn_for_name(role_name) {
      Ok(role_arn) => role_arn,
      Err(e) if e.is_not_found() => {
        info!(role = role_name, "no role found");
        return Ok(None);
      }
      Err(e) => return Err(e.into()),
    };
    let name = arn::role_name(&role_arn).unwrap_or(role_name).to_string();

    let decision = Decision::new(DecisionPoint::DeleteRole, format!("Delete the role {}?", name));
    if gate(self.prompter, decision)? == Gate::Skip {
      return Ok(None);
    }

    match self.cloud.delete_role_policy(&name, &name) {
      Ok(()) => {}
      Err(e) if e.is_not_found() => debug!(role = %name, "role had no inline policy"),
      Err(e) => return Err(e.into()),
    }
    match self.cloud.delete_role(&name) {
      Ok(()) => Ok(Some(name)),
      Err(e) if e.is_not_found() => {
        warn!(role = %name, "role disappeared before it could be deleted");
        Ok(None)
      }
      Err(e) => Err(e.into()),
    }
  }
}

/// Ask at a gate, turning a declined abort gate into a cancellation.
pub(super) fn gate(prompter: &dyn Prompter, decision: Decision) -> Result<Gate, DeployError> {
  match ask(prompter, decision) {
    Gate::Cancel(point) => Err(DeployError::Cancelled(point)),
    other => Ok(other),
  }
}

fn describe_diff(diff: &PolicyDiff) -> String {
  let mut message = String::new();
  if !diff.added.is_empty() {
    message.push_str("The following actions will be added to the execution policy:\n\n");
    for action in &diff.added {
      message.push_str(action);
      message.push('\n');
    }
  }
  if !diff.removed.is_empty() {
    if !message.is_empty() {
      message.push('\n');
    }
    message.push_str("The following actions will be removed from the execution policy:\n\n");
    for action in &diff.removed {
      message.push_str(action);
      message.push('\n');
    }
  }
  message.push_str("\nWould you like to continue?");
  message
}

fn describe_policy(policy: &PermissionDocument) -> String {
  let rendered = serde_json::to_string_pretty(policy).unwrap_or_else(|_| format!("{:?}", policy));
  format!(
    "The following execution policy will be used:\n{}\nWould you like to continue?",
    rendered
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cloud::LocalCloud;
  use crate::policy::{Statement, policy_file_path};
  use crate::prompt::NoPrompt;
  use crate::util::testutil::{RecordingPrompter, TestProject};

  #[test]
  fn provided_role_is_used_verbatim() {
    let project = TestProject::new().with_config(
      r#"{"app_name": "demo", "manage_iam_role": false, "iam_role_arn": "arn:aws:iam::1:role/mine"}"#,
    );
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();

    let role_arn = IdentityReconciler::new(&cloud, &store, &NoPrompt)
      .resolve_or_create(&project.config("dev"), "demo-dev")
      .unwrap();

    assert_eq!(role_arn, "arn:aws:iam::1:role/mine");
    assert!(cloud.calls().is_empty());
  }

  #[test]
  fn missing_role_is_created_and_policy_recorded() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    let config = project.config("dev");

    let role_arn = IdentityReconciler::new(&cloud, &store, &NoPrompt)
      .resolve_or_create(&config, "demo-dev")
      .unwrap();

    assert_eq!(role_arn, "arn:aws:iam::123456789012:role/demo-dev");
    assert_eq!(cloud.count("create_role"), 1);
    assert!(policy_file_path(&config).exists());
    assert_eq!(store.load_last_applied(&config).unwrap(), store.generate(&config).unwrap());
  }

  #[test]
  fn trivial_policy_creates_without_prompt() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    let prompter = RecordingPrompter::answering(true);

    IdentityReconciler::new(&cloud, &store, &prompter)
      .resolve_or_create(&project.config("dev"), "demo-dev")
      .unwrap();

    assert!(prompter.asked().is_empty());
  }

  #[test]
  fn declined_policy_create_cancels_before_creating() {
    let project = TestProject::new().with_app(r#"{"actions": ["s3:GetObject"]}"#);
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    let prompter = RecordingPrompter::answering(false);

    let result =
      IdentityReconciler::new(&cloud, &store, &prompter).resolve_or_create(&project.config("dev"), "demo-dev");

    assert!(matches!(result, Err(DeployError::Cancelled(DecisionPoint::PolicyCreate))));
    assert_eq!(cloud.count("create_role"), 0);
  }

  #[test]
  fn unchanged_policy_is_reapplied_without_prompt() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    let config = project.config("dev");
    IdentityReconciler::new(&cloud, &store, &NoPrompt)
      .resolve_or_create(&config, "demo-dev")
      .unwrap();

    let prompter = RecordingPrompter::answering(true);
    IdentityReconciler::new(&cloud, &store, &prompter)
      .resolve_or_create(&config, "demo-dev")
      .unwrap();

    assert!(prompter.asked().is_empty());
    assert_eq!(cloud.count("put_role_policy"), 1);
  }

  #[test]
  fn changed_policy_prompts_with_actions() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    IdentityReconciler::new(&cloud, &store, &NoPrompt)
      .resolve_or_create(&project.config("dev"), "demo-dev")
      .unwrap();

    let project = project.with_app(r#"{"actions": ["dynamodb:PutItem"]}"#);
    let prompter = RecordingPrompter::answering(true);
    IdentityReconciler::new(&cloud, &store, &prompter)
      .resolve_or_create(&project.config("dev"), "demo-dev")
      .unwrap();

    let asked = prompter.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].point, DecisionPoint::PolicyChange);
    assert!(asked[0].message.contains("dynamodb:PutItem"));
    assert!(asked[0].message.contains("added"));

    let role = &cloud.state().roles["demo-dev"];
    assert!(role.policies["demo-dev"].allowed_actions().contains("dynamodb:PutItem"));
  }

  #[test]
  fn declined_policy_change_leaves_role_alone() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    IdentityReconciler::new(&cloud, &store, &NoPrompt)
      .resolve_or_create(&project.config("dev"), "demo-dev")
      .unwrap();

    let project = project.with_app(r#"{"actions": ["dynamodb:PutItem"]}"#);
    let config = project.config("dev");
    let result = IdentityReconciler::new(&cloud, &store, &RecordingPrompter::answering(false))
      .resolve_or_create(&config, "demo-dev");

    assert!(matches!(result, Err(DeployError::Cancelled(DecisionPoint::PolicyChange))));
    assert_eq!(cloud.count("put_role_policy"), 0);
    assert!(!store.load_last_applied(&config).unwrap().allowed_actions().contains("dynamodb:PutItem"));
  }

  #[test]
  fn delete_role_defaults_to_keeping_it() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    let config = project.config("dev");
    let identity = IdentityReconciler::new(&cloud, &store, &NoPrompt);
    identity.resolve_or_create(&config, "demo-dev").unwrap();

    assert_eq!(identity.delete(&config, "demo-dev").unwrap(), None);
    assert!(cloud.state().roles.contains_key("demo-dev"));
  }

  #[test]
  fn confirmed_delete_removes_policy_then_role() {
    let project = TestProject::new();
    let cloud = LocalCloud::in_memory("us-west-2");
    let store = PolicyStore::default();
    let config = project.config("dev");
    IdentityReconciler::new(&cloud, &store, &NoPrompt)
      .resolve_or_create(&config, "demo-dev")
      .unwrap();
    cloud.clear_calls();

    let deleted = IdentityReconciler::new(&cloud, &store, &RecordingPrompter::answering(true))
      .delete(&config, "demo-dev")
      .unwrap();

    assert_eq!(deleted.as_deref(), Some("demo-dev"));
    let operations: Vec<String> = cloud.calls().into_iter().map(|c| c.operation).collect();
    assert_eq!(operations, vec!["get_role_arn_for_name", "delete_role_policy", "delete_role"]);
  }

  #[test]
  fn describe_diff_lists_both_directions() {
    let previous = PermissionDocument::new(vec![Statement::allow(vec!["a:Old".to_string()], vec!["*".to_string()])]);
    let next = PermissionDocument::new(vec![Statement::allow(vec!["a:New".to_string()], vec!["*".to_string()])]);
    let message = describe_diff(&diff_policies(Some(&previous), &next));

    assert!(message.contains("added to the execution policy:\n\na:New\n"));
    assert!(message.contains("removed from the execution policy:\n\na:Old\n"));
  }
}
