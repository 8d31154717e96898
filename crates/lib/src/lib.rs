//! stagecraft-lib: deploy serverless HTTP applications stage by stage.
//!
//! The crate reconciles a declared application against what was deployed
//! last time for a stage:
//! - `deploy`: orchestration plus the compute, identity and gateway reconcilers
//! - `policy`: execution role permission documents and their diff
//! - `record`: the per-stage record of deployed resources
//! - `cloud`: the client boundary and a local emulator of it
//! - `artifact`, `routing`: deployment package and routing document builders

pub mod app;
pub mod artifact;
pub mod cloud;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod init;
pub mod platform;
pub mod policy;
pub mod prompt;
pub mod record;
pub mod routing;
pub mod util;
pub mod validate;
