//! Action-level diff between two permission documents.
//!
//! Both documents are flattened to the set of granted actions; statement
//! order, grouping and resources do not affect the result.

use std::collections::BTreeSet;

use serde::Serialize;

use super::types::PermissionDocument;

/// Actions gained and lost when moving from one document to another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicyDiff {
  pub added: BTreeSet<String>,
  pub removed: BTreeSet<String>,
}

impl PolicyDiff {
  /// Returns true if neither side gained nor lost an action.
  pub fn is_empty(&self) -> bool {
    self.added.is_empty() && self.removed.is_empty()
  }
}

/// Compare `previous` against `next`. A missing previous document counts as empty.
pub fn diff_policies(previous: Option<&PermissionDocument>, next: &PermissionDocument) -> PolicyDiff {
  let previous = previous.map(PermissionDocument::allowed_actions).unwrap_or_default();
  let next = next.allowed_actions();

  PolicyDiff {
    added: next.difference(&previous).cloned().collect(),
    removed: previous.difference(&next).cloned().collect(),
  }
}
