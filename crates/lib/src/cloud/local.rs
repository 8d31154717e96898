//! Local emulation of the cloud services.
//!
//! Holds functions, roles, rest APIs and invoke grants in memory, optionally
//! persisted to a JSON state file after every mutating call. Every call is
//! appended to a journal, and failures can be queued per operation, which is
//! what the reconciler tests assert against.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::consts::MAX_LAMBDA_DEPLOYMENT_SIZE;
use crate::policy::PermissionDocument;
use crate::util::hash::hash_bytes;

use super::arn;
use super::{CallContext, CloudClient, CloudError, CreateFunction, FunctionConfiguration, ResourceKind, UpdateFunction};

pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";

#[derive(Debug, Error)]
pub enum LocalCloudError {
  #[error("failed to read cloud state {}: {source}", path.display())]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to parse cloud state {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },
}

/// One journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudCall {
  pub operation: String,
  pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudState {
  pub account_id: String,
  #[serde(default)]
  pub functions: BTreeMap<String, FunctionConfiguration>,
  #[serde(default)]
  pub roles: BTreeMap<String, RoleRecord>,
  #[serde(default)]
  pub rest_apis: BTreeMap<String, RestApiRecord>,
  #[serde(default)]
  pub grants: Vec<InvokeGrant>,
}

impl Default for CloudState {
  fn default() -> Self {
    Self {
      account_id: DEFAULT_ACCOUNT_ID.to_string(),
      functions: BTreeMap::new(),
      roles: BTreeMap::new(),
      rest_apis: BTreeMap::new(),
      grants: Vec::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRecord {
  pub arn: String,
  pub trust_policy: Value,
  #[serde(default)]
  pub policies: BTreeMap<String, PermissionDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestApiRecord {
  pub name: Option<String>,
  pub document: Value,
  #[serde(default)]
  pub stages: BTreeSet<String>,
  #[serde(default)]
  pub deployments: u32,
}

/// Permission for the gateway to invoke a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeGrant {
  pub function_name: String,
  pub principal: String,
  pub source_arn: String,
  pub statement_id: String,
}

#[derive(Debug, Default)]
struct Inner {
  state: CloudState,
  journal: Vec<CloudCall>,
  injected: Vec<(String, CloudError)>,
}

/// In-process stand-in for the remote services.
#[derive(Debug)]
pub struct LocalCloud {
  region: String,
  state_path: Option<PathBuf>,
  max_code_size: u64,
  inner: Mutex<Inner>,
}

impl LocalCloud {
  /// An empty cloud that lives only as long as this value.
  pub fn in_memory(region: impl Into<String>) -> Self {
    Self {
      region: region.into(),
      state_path: None,
      max_code_size: MAX_LAMBDA_DEPLOYMENT_SIZE,
      inner: Mutex::new(Inner::default()),
    }
  }

  /// A cloud backed by a state file, created on first write.
  pub fn open(path: &Path, region: impl Into<String>) -> Result<Self, LocalCloudError> {
    let state = match fs::read_to_string(path) {
      Ok(content) => serde_json::from_str(&content).map_err(|source| LocalCloudError::Parse {
        path: path.to_path_buf(),
        source,
      })?,
      Err(e) if e.kind() == io::ErrorKind::NotFound => CloudState::default(),
      Err(source) => {
        return Err(LocalCloudError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let cloud = Self::in_memory(region);
    cloud.lock().state = state;
    Ok(Self {
      state_path: Some(path.to_path_buf()),
      ..cloud
    })
  }

  /// Lower the package size ceiling.
  pub fn with_max_code_size(mut self, bytes: u64) -> Self {
    self.max_code_size = bytes;
    self
  }

  pub fn account_id(&self) -> String {
    self.lock().state.account_id.clone()
  }

  /// Snapshot of the emulated resources.
  pub fn state(&self) -> CloudState {
    self.lock().state.clone()
  }

  /// Every call made so far, in order.
  pub fn calls(&self) -> Vec<CloudCall> {
    self.lock().journal.clone()
  }

  /// Targets of every call to `operation`, in order.
  pub fn calls_to(&self, operation: &str) -> Vec<String> {
    self
      .lock()
      .journal
      .iter()
      .filter(|call| call.operation == operation)
      .map(|call| call.target.clone())
      .collect()
  }

  pub fn count(&self, operation: &str) -> usize {
    self.lock().journal.iter().filter(|call| call.operation == operation).count()
  }

  pub fn clear_calls(&self) {
    self.lock().journal.clear();
  }

  /// Make the next call to `operation` fail with `error`.
  pub fn inject_failure(&self, operation: &str, error: CloudError) {
    self.lock().injected.push((operation.to_string(), error));
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Journal the call and surface any queued failure for it.
  fn begin(&self, operation: &str, target: &str) -> Result<Call<'_>, CloudError> {
    let mut inner = self.lock();
    debug!(operation, target, "cloud call");
    inner.journal.push(CloudCall {
      operation: operation.to_string(),
      target: target.to_string(),
    });

    if let Some(pos) = inner.injected.iter().position(|(op, _)| op == operation) {
      let (_, error) = inner.injected.remove(pos);
      return Err(error);
    }
    Ok(Call {
      inner,
      context: CallContext::new(operation, target),
    })
  }

  /// Write `candidate` to the state file, then make it the live state.
  ///
  /// A failed write leaves the in-memory state untouched.
  fn commit(&self, call: &mut Call<'_>, candidate: CloudState) -> Result<(), CloudError> {
    if let Some(path) = &self.state_path {
      persist_state(path, &candidate).map_err(|e| {
        call.service(format!("failed to persist cloud state to {}: {}", path.display(), e))
      })?;
    }
    call.inner.state = candidate;
    Ok(())
  }

  fn check_code_size(&self, call: &Call<'_>, code: &[u8]) -> Result<(), CloudError> {
    let size = code.len() as u64;
    if size > self.max_code_size {
      return Err(CloudError::PackageTooLarge {
        context: call.context.clone(),
        size,
        limit: self.max_code_size,
        message: format!("Request must be smaller than {} bytes", self.max_code_size),
      });
    }
    Ok(())
  }

  fn source_arn(&self, account_id: &str, rest_api_id: &str, suffix: &str) -> String {
    format!(
      "arn:aws:execute-api:{}:{}:{}/{}",
      self.region, account_id, rest_api_id, suffix
    )
  }
}

/// One journalled call, holding the state lock until it returns.
struct Call<'a> {
  inner: MutexGuard<'a, Inner>,
  context: CallContext,
}

impl Call<'_> {
  fn state(&self) -> &CloudState {
    &self.inner.state
  }

  /// Copy of the live state for a mutating call to edit before `commit`.
  fn candidate(&self) -> CloudState {
    self.inner.state.clone()
  }

  fn not_found(&self, kind: ResourceKind, name: &str) -> CloudError {
    CloudError::not_found(self.context.clone(), kind, name)
  }

  fn service(&self, message: String) -> CloudError {
    CloudError::Service {
      context: self.context.clone(),
      message,
    }
  }
}

fn persist_state(path: &Path, state: &CloudState) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  let content = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
  let temp_path = path.with_extension("json.tmp");
  fs::write(&temp_path, content)?;
  fs::rename(&temp_path, path)
}

fn push_grant(call: &Call<'_>, state: &mut CloudState, grant: InvokeGrant) -> Result<(), CloudError> {
  if !state.functions.contains_key(&grant.function_name) {
    return Err(call.not_found(ResourceKind::Function, &grant.function_name));
  }
  if state
    .grants
    .iter()
    .any(|g| g.function_name == grant.function_name && g.statement_id == grant.statement_id)
  {
    return Err(call.service(format!("statement id {} already exists", grant.statement_id)));
  }
  state.grants.push(grant);
  Ok(())
}

impl CloudClient for LocalCloud {
  fn region(&self) -> &str {
    &self.region
  }

  fn function_exists(&self, name: &str) -> Result<bool, CloudError> {
    let call = self.begin("function_exists", name)?;
    Ok(call.state().functions.contains_key(arn::function_name(name)))
  }

  fn get_function_configuration(&self, name: &str) -> Result<FunctionConfiguration, CloudError> {
    let call = self.begin("get_function_configuration", name)?;
    call
      .state()
      .functions
      .get(arn::function_name(name))
      .cloned()
      .ok_or_else(|| call.not_found(ResourceKind::Function, name))
  }

  fn create_function(&self, request: &CreateFunction<'_>) -> Result<String, CloudError> {
    let name = request.function_name;
    let mut call = self.begin("create_function", name)?;
    self.check_code_size(&call, request.code)?;

    if call.state().functions.contains_key(name) {
      return Err(call.service(format!("Function already exist: {}", name)));
    }

    let mut state = call.candidate();
    let function_arn = arn::function_arn(&self.region, &state.account_id, name);
    let settings = request.settings;
    state.functions.insert(
      name.to_string(),
      FunctionConfiguration {
        function_name: name.to_string(),
        function_arn: function_arn.clone(),
        runtime: settings.runtime.clone(),
        handler: request.handler.to_string(),
        role_arn: request.role_arn.to_string(),
        timeout: settings.timeout,
        memory_size: settings.memory_size,
        environment_variables: settings.environment_variables.clone(),
        tags: settings.tags.clone(),
        code_sha256: hash_bytes(request.code),
        code_size: request.code.len() as u64,
      },
    );

    self.commit(&mut call, state)?;
    info!(function = name, "function created");
    Ok(function_arn)
  }

  fn update_function(&self, request: &UpdateFunction<'_>) -> Result<FunctionConfiguration, CloudError> {
    let name = request.function_name;
    let mut call = self.begin("update_function", name)?;
    self.check_code_size(&call, request.code)?;

    let mut state = call.candidate();
    let settings = request.settings;
    let function = state
      .functions
      .get_mut(name)
      .ok_or_else(|| call.not_found(ResourceKind::Function, name))?;
    function.runtime = settings.runtime.clone();
    function.role_arn = request.role_arn.to_string();
    function.timeout = settings.timeout;
    function.memory_size = settings.memory_size;
    function.environment_variables = settings.environment_variables.clone();
    function.tags = settings.tags.clone();
    function.code_sha256 = hash_bytes(request.code);
    function.code_size = request.code.len() as u64;
    let updated = function.clone();

    self.commit(&mut call, state)?;
    info!(function = name, "function updated");
    Ok(updated)
  }

  fn delete_function(&self, name_or_arn: &str) -> Result<(), CloudError> {
    let mut call = self.begin("delete_function", name_or_arn)?;
    let name = arn::function_name(name_or_arn);

    let mut state = call.candidate();
    if state.functions.remove(name).is_none() {
      return Err(call.not_found(ResourceKind::Function, name_or_arn));
    }
    state.grants.retain(|grant| grant.function_name != name);

    self.commit(&mut call, state)?;
    info!(function = name, "function deleted");
    Ok(())
  }

  fn get_role_arn_for_name(&self, name: &str) -> Result<String, CloudError> {
    let call = self.begin("get_role_arn_for_name", name)?;
    call
      .state()
      .roles
      .get(name)
      .map(|role| role.arn.clone())
      .ok_or_else(|| call.not_found(ResourceKind::Role, name))
  }

  fn create_role(&self, name: &str, trust_policy: &Value, policy: &PermissionDocument) -> Result<String, CloudError> {
    let mut call = self.begin("create_role", name)?;

    if call.state().roles.contains_key(name) {
      return Err(call.service(format!("Role with name {} already exists", name)));
    }

    let mut state = call.candidate();
    let role_arn = arn::role_arn(&state.account_id, name);
    let mut policies = BTreeMap::new();
    policies.insert(name.to_string(), policy.clone());
    state.roles.insert(
      name.to_string(),
      RoleRecord {
        arn: role_arn.clone(),
        trust_policy: trust_policy.clone(),
        policies,
      },
    );

    self.commit(&mut call, state)?;
    info!(role = name, "role created");
    Ok(role_arn)
  }

  fn put_role_policy(
    &self,
    role_name: &str,
    policy_name: &str,
    policy: &PermissionDocument,
  ) -> Result<(), CloudError> {
    let mut call = self.begin("put_role_policy", role_name)?;
    let mut state = call.candidate();
    let role = state
      .roles
      .get_mut(role_name)
      .ok_or_else(|| call.not_found(ResourceKind::Role, role_name))?;
    role.policies.insert(policy_name.to_string(), policy.clone());

    self.commit(&mut call, state)
  }

  fn delete_role_policy(&self, role_name: &str, policy_name: &str) -> Result<(), CloudError> {
    let mut call = self.begin("delete_role_policy", role_name)?;
    let mut state = call.candidate();
    let role = state
      .roles
      .get_mut(role_name)
      .ok_or_else(|| call.not_found(ResourceKind::Role, role_name))?;
    if role.policies.remove(policy_name).is_none() {
      return Err(call.not_found(ResourceKind::RolePolicy, policy_name));
    }

    self.commit(&mut call, state)
  }

  fn delete_role(&self, name: &str) -> Result<(), CloudError> {
    let mut call = self.begin("delete_role", name)?;
    let mut state = call.candidate();
    if state.roles.remove(name).is_none() {
      return Err(call.not_found(ResourceKind::Role, name));
    }

    self.commit(&mut call, state)?;
    info!(role = name, "role deleted");
    Ok(())
  }

  fn rest_api_exists(&self, rest_api_id: &str) -> Result<bool, CloudError> {
    let call = self.begin("rest_api_exists", rest_api_id)?;
    Ok(call.state().rest_apis.contains_key(rest_api_id))
  }

  fn import_rest_api(&self, document: &Value) -> Result<String, CloudError> {
    let name = document
      .pointer("/info/title")
      .and_then(Value::as_str)
      .map(str::to_string);
    let mut call = self.begin("import_rest_api", name.as_deref().unwrap_or("<unnamed>"))?;

    let rest_api_id: String = Uuid::new_v4().simple().to_string().chars().take(10).collect();
    let mut state = call.candidate();
    state.rest_apis.insert(
      rest_api_id.clone(),
      RestApiRecord {
        name,
        document: document.clone(),
        stages: BTreeSet::new(),
        deployments: 0,
      },
    );

    self.commit(&mut call, state)?;
    info!(rest_api_id = %rest_api_id, "rest API created");
    Ok(rest_api_id)
  }

  fn update_api_from_document(&self, rest_api_id: &str, document: &Value) -> Result<(), CloudError> {
    let mut call = self.begin("update_api_from_document", rest_api_id)?;
    let mut state = call.candidate();
    let api = state
      .rest_apis
      .get_mut(rest_api_id)
      .ok_or_else(|| call.not_found(ResourceKind::RestApi, rest_api_id))?;
    api.document = document.clone();

    self.commit(&mut call, state)
  }

  fn deploy_rest_api(&self, rest_api_id: &str, stage_name: &str) -> Result<(), CloudError> {
    let mut call = self.begin("deploy_rest_api", rest_api_id)?;
    let mut state = call.candidate();
    let api = state
      .rest_apis
      .get_mut(rest_api_id)
      .ok_or_else(|| call.not_found(ResourceKind::RestApi, rest_api_id))?;
    api.stages.insert(stage_name.to_string());
    api.deployments += 1;

    self.commit(&mut call, state)
  }

  fn delete_rest_api(&self, rest_api_id: &str) -> Result<(), CloudError> {
    let mut call = self.begin("delete_rest_api", rest_api_id)?;
    let mut state = call.candidate();
    if state.rest_apis.remove(rest_api_id).is_none() {
      return Err(call.not_found(ResourceKind::RestApi, rest_api_id));
    }
    let marker = format!(":{}/", rest_api_id);
    state.grants.retain(|grant| !grant.source_arn.contains(&marker));

    self.commit(&mut call, state)?;
    info!(rest_api_id, "rest API deleted");
    Ok(())
  }

  fn add_permission_for_apigateway(
    &self,
    function_name: &str,
    region: &str,
    account_id: &str,
    rest_api_id: &str,
    statement_id: &str,
  ) -> Result<(), CloudError> {
    let mut call = self.begin("add_permission_for_apigateway", function_name)?;
    let grant = InvokeGrant {
      function_name: function_name.to_string(),
      principal: "apigateway.amazonaws.com".to_string(),
      source_arn: format!("arn:aws:execute-api:{}:{}:{}/*", region, account_id, rest_api_id),
      statement_id: statement_id.to_string(),
    };
    let mut state = call.candidate();
    push_grant(&call, &mut state, grant)?;

    self.commit(&mut call, state)
  }

  fn add_permission_for_authorizer(
    &self,
    rest_api_id: &str,
    function_arn: &str,
    statement_id: &str,
  ) -> Result<(), CloudError> {
    let mut call = self.begin("add_permission_for_authorizer", function_arn)?;
    let account_id = arn::account_id(function_arn).unwrap_or(DEFAULT_ACCOUNT_ID).to_string();
    let grant = InvokeGrant {
      function_name: arn::function_name(function_arn).to_string(),
      principal: "apigateway.amazonaws.com".to_string(),
      source_arn: self.source_arn(&account_id, rest_api_id, "authorizers/*"),
      statement_id: statement_id.to_string(),
    };
    let mut state = call.candidate();
    push_grant(&call, &mut state, grant)?;

    self.commit(&mut call, state)
  }
}
