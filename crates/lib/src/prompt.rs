//! Interactive confirmation gates.
//!
//! Reconciliation never talks to a terminal. It raises a [`Decision`] at one
//! of the fixed [`DecisionPoint`]s and asks the injected [`Prompter`]. A
//! non-interactive run answers every gate with its documented default.

use std::fmt;

use tracing::{debug, info};

/// Every place the deployer may stop and ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPoint {
  /// The live handler runs on a different runtime than configured.
  RuntimeChange,
  /// The role's attached policy is about to change.
  PolicyChange,
  /// A new role is about to be created with a non-trivial policy.
  PolicyCreate,
  /// A managed role is about to be deleted.
  DeleteRole,
}

impl DecisionPoint {
  /// Stable identifier, used in cancellation errors and logs.
  pub fn id(self) -> &'static str {
    match self {
      DecisionPoint::RuntimeChange => "runtime-change",
      DecisionPoint::PolicyChange => "policy-change",
      DecisionPoint::PolicyCreate => "policy-create",
      DecisionPoint::DeleteRole => "delete-role",
    }
  }

  pub fn default_answer(self) -> bool {
    !matches!(self, DecisionPoint::DeleteRole)
  }

  /// Whether declining cancels the whole operation.
  pub fn aborts_on_decline(self) -> bool {
    !matches!(self, DecisionPoint::DeleteRole)
  }
}

impl fmt::Display for DecisionPoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.id())
  }
}

/// A question raised at a decision point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
  pub point: DecisionPoint,
  pub message: String,
}

impl Decision {
  pub fn new(point: DecisionPoint, message: impl Into<String>) -> Self {
    Self {
      point,
      message: message.into(),
    }
  }

  pub fn default_answer(&self) -> bool {
    self.point.default_answer()
  }
}

/// Answers confirmation gates.
pub trait Prompter {
  fn confirm(&self, decision: &Decision) -> bool;
}

/// Answers every gate with its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
  fn confirm(&self, decision: &Decision) -> bool {
    let answer = decision.default_answer();
    debug!(decision = %decision.point, answer, "answered with default");
    answer
  }
}

/// Outcome of asking at a gate that may abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
  Proceed,
  /// Declined at a gate that aborts the operation.
  Cancel(DecisionPoint),
  /// Declined at a gate that only skips its step.
  Skip,
}

/// Ask `prompter` and classify the answer.
pub fn ask(prompter: &dyn Prompter, decision: Decision) -> Gate {
  if prompter.confirm(&decision) {
    return Gate::Proceed;
  }

  info!(decision = %decision.point, "declined");
  if decision.point.aborts_on_decline() {
    Gate::Cancel(decision.point)
  } else {
    Gate::Skip
  }
}
