use std::collections::BTreeSet;

use crate::app::ApplicationDefinition;

use super::types::{PermissionDocument, Statement};

/// Maps an application definition to the permission document its code needs.
pub trait PolicyGenerator {
  fn generate_policy(&self, app: &ApplicationDefinition) -> PermissionDocument;
}

/// Grants log delivery to every application, plus the service actions it declares.
#[derive(Debug, Clone, Default)]
pub struct AppPolicyGenerator;

impl AppPolicyGenerator {
  pub fn new() -> Self {
    Self
  }

  fn logging_statement() -> Statement {
    Statement::allow(
      vec![
        "logs:CreateLogGroup".to_string(),
        "logs:CreateLogStream".to_string(),
        "logs:PutLogEvents".to_string(),
      ],
      vec!["arn:*:logs:*:*:*".to_string()],
    )
  }
}

impl PolicyGenerator for AppPolicyGenerator {
  fn generate_policy(&self, app: &ApplicationDefinition) -> PermissionDocument {
    let mut statements = vec![Self::logging_statement()];

    let actions: BTreeSet<&String> = app.actions.iter().filter(|a| !a.trim().is_empty()).collect();
    if !actions.is_empty() {
      let mut statement = Statement::allow(actions.into_iter().cloned().collect(), vec!["*".to_string()]);
      statement.sid = Some("ApplicationActions".to_string());
      statements.push(statement);
    }

    PermissionDocument::new(statements)
  }
}
