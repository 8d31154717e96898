use thiserror::Error;

use crate::artifact::ArtifactError;
use crate::cloud::{CloudError, TransportFailure};
use crate::config::ConfigError;
use crate::policy::PolicyError;
use crate::prompt::DecisionPoint;
use crate::record::RecordError;
use crate::validate::ValidationError;

const WRAP_WIDTH: usize = 79;

/// Everything a deploy or delete can fail with.
#[derive(Debug, Error)]
pub enum DeployError {
  /// Pre-flight check failed; nothing remote was touched.
  #[error(transparent)]
  Validation(#[from] ValidationError),

  /// The user declined a confirmation that aborts the operation.
  #[error("cancelled at confirmation \"{0}\"")]
  Cancelled(DecisionPoint),

  /// A remote call failed.
  #[error("{}", render_cloud_error(.0))]
  Deployment(#[source] CloudError),

  /// A function ARN returned by the compute phase could not be parsed.
  #[error("function ARN \"{0}\" has no account id")]
  MalformedArn(String),

  #[error(transparent)]
  Policy(#[from] PolicyError),

  #[error(transparent)]
  Artifact(#[from] ArtifactError),

  #[error(transparent)]
  Record(#[from] RecordError),

  #[error(transparent)]
  Config(#[from] ConfigError),
}

impl From<CloudError> for DeployError {
  fn from(error: CloudError) -> Self {
    DeployError::Deployment(error)
  }
}

impl DeployError {
  pub fn is_cancelled(&self) -> bool {
    matches!(self, DeployError::Cancelled(_))
  }
}

/// Render a remote failure as location, indented cause and optional suggestion.
pub fn render_cloud_error(error: &CloudError) -> String {
  let mut message = wrap_text(&format!("ERROR - {}, received the following error:", location(error)), "");
  message.push_str("\n\n");
  message.push_str(&wrap_text(&cause(error), " "));
  message.push_str("\n\n");
  if let Some(suggestion) = suggestion(error) {
    message.push_str(&wrap_text(&suggestion, ""));
  }
  message
}

fn verb(operation: &str) -> &str {
  match operation {
    "create_function" => "create",
    "update_function" => "update",
    other => other,
  }
}

fn location(error: &CloudError) -> String {
  match error {
    CloudError::PackageTooLarge { context, .. } | CloudError::Transport { context, .. } => format!(
      "While sending your handler code to the compute service to {} function \"{}\"",
      verb(&context.operation),
      context.resource
    ),
    CloudError::Service { context, .. } | CloudError::NotFound { context, .. } => {
      format!("While running {} on \"{}\"", context.operation, context.resource)
    }
  }
}

fn cause(error: &CloudError) -> String {
  match error {
    CloudError::Transport {
      failure: TransportFailure::ConnectionClosed,
      message,
      ..
    } => format!(
      "{} The compute service closed the connection before all of the data was sent.",
      message
    ),
    CloudError::Transport {
      failure: TransportFailure::TimedOut,
      message,
      ..
    } => format!("{} Timed out sending your app to the compute service.", message),
    CloudError::Transport {
      failure: TransportFailure::Other,
      message,
      ..
    }
    | CloudError::PackageTooLarge { message, .. }
    | CloudError::Service { message, .. } => message.clone(),
    CloudError::NotFound { kind, name, .. } => format!("{} not found: {}", kind, name),
  }
}

fn suggestion(error: &CloudError) -> Option<String> {
  match error {
    CloudError::PackageTooLarge { size, limit, .. } => {
      let advice = "To avoid this error, decrease the size of your application by removing code or removing \
                    dependencies from your application.";
      if size > limit {
        Some(format!(
          "This is likely because the deployment package is {}. The compute service only allows deployment \
           packages that are {} or less in size. {}",
          megabytes(*size),
          megabytes(*limit),
          advice
        ))
      } else {
        Some(advice.to_string())
      }
    }
    CloudError::Transport { .. } | CloudError::Service { .. } | CloudError::NotFound { .. } => None,
  }
}

fn megabytes(bytes: u64) -> String {
  format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Greedy word wrap; every line starts with `indent`.
fn wrap_text(text: &str, indent: &str) -> String {
  let mut lines: Vec<String> = Vec::new();
  let mut line = String::from(indent);

  for word in text.split_whitespace() {
    let fits = line.len() + 1 + word.len() <= WRAP_WIDTH;
    if line.len() > indent.len() && !fits {
      lines.push(std::mem::replace(&mut line, String::from(indent)));
    }
    if line.len() > indent.len() {
      line.push(' ');
    }
    line.push_str(word);
  }
  lines.push(line);
  lines.join("\n")
}
