//! Deployed resource records, one per stage.

mod storage;
mod types;

pub use storage::{RecordError, RecordStore};
pub use types::DeployedResources;
