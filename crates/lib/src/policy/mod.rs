//! Execution role permission documents: generation, diffing and persistence.

mod diff;
mod generate;
mod store;
mod types;

pub use diff::{PolicyDiff, diff_policies};
pub use generate::{AppPolicyGenerator, PolicyGenerator};
pub use store::{PolicyError, PolicyStore, policy_file_path};
pub use types::{Effect, OneOrMany, POLICY_VERSION, PermissionDocument, Statement};
