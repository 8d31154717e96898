use std::fmt;

use thiserror::Error;

/// Which remote call failed, and on what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
  /// Client method name, e.g. `create_function`.
  pub operation: String,
  /// Target resource name or identifier.
  pub resource: String,
}

impl CallContext {
  pub fn new(operation: impl Into<String>, resource: impl Into<String>) -> Self {
    Self {
      operation: operation.into(),
      resource: resource.into(),
    }
  }
}

impl fmt::Display for CallContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} on {}", self.operation, self.resource)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  Function,
  Role,
  RolePolicy,
  RestApi,
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ResourceKind::Function => "function",
      ResourceKind::Role => "role",
      ResourceKind::RolePolicy => "role policy",
      ResourceKind::RestApi => "rest API",
    };
    f.write_str(name)
  }
}

/// The two dominant ways a large upload dies in transit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
  /// The remote end closed the connection before all data was sent.
  ConnectionClosed,
  /// The upload did not finish in time.
  TimedOut,
  Other,
}

/// A classified failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CloudError {
  /// The target no longer exists. Never fatal during cleanup.
  #[error("{kind} not found: {name} ({context})")]
  NotFound {
    context: CallContext,
    kind: ResourceKind,
    name: String,
  },

  /// `limit` is the ceiling the service enforced, in bytes.
  #[error("{message} ({context}, package size {size} bytes)")]
  PackageTooLarge {
    context: CallContext,
    size: u64,
    limit: u64,
    message: String,
  },

  #[error("{message} ({context})")]
  Transport {
    context: CallContext,
    failure: TransportFailure,
    message: String,
  },

  #[error("{message} ({context})")]
  Service { context: CallContext, message: String },
}

impl CloudError {
  pub fn not_found(context: CallContext, kind: ResourceKind, name: impl Into<String>) -> Self {
    CloudError::NotFound {
      context,
      kind,
      name: name.into(),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, CloudError::NotFound { .. })
  }

  /// The call that failed.
  pub fn context(&self) -> &CallContext {
    match self {
      CloudError::NotFound { context, .. }
      | CloudError::PackageTooLarge { context, .. }
      | CloudError::Transport { context, .. }
      | CloudError::Service { context, .. } => context,
    }
  }
}
