//! Fixed names and platform defaults.

/// Application name, used for data directories and the default resource tag.
pub const APP_NAME: &str = "stagecraft";

/// Tool version recorded in every deployed resource record.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend kind recorded in every deployed resource record.
pub const BACKEND_NAME: &str = "api";

/// Project-relative configuration directory.
pub const PROJECT_DIR_NAME: &str = ".stagecraft";

pub const CONFIG_FILENAME: &str = "config.json";
pub const DEPLOYED_FILENAME: &str = "deployed.json";
pub const APP_DEFINITION_FILENAME: &str = "app.json";

/// Back-compat policy file name, only consulted for the default stage.
pub const LEGACY_POLICY_FILENAME: &str = "policy.json";

pub const DEFAULT_STAGE_NAME: &str = "dev";
pub const DEFAULT_API_GATEWAY_STAGE: &str = "api";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_RUNTIME: &str = "provided.al2023";

/// Seconds.
pub const DEFAULT_LAMBDA_TIMEOUT: u32 = 60;
/// Megabytes.
pub const DEFAULT_LAMBDA_MEMORY_SIZE: u32 = 128;

/// Largest deployment package the compute service accepts, in bytes.
pub const MAX_LAMBDA_DEPLOYMENT_SIZE: u64 = 50 * 1024 * 1024;

/// Entry point of the primary API handler function.
pub const API_HANDLER_ENTRY_POINT: &str = "app.app";

/// Runtimes the compute service is known to accept.
pub const KNOWN_RUNTIMES: &[&str] = &[
  "provided.al2023",
  "provided.al2",
  "python3.12",
  "python3.13",
  "nodejs20.x",
  "nodejs22.x",
  "java21",
];

/// Tag key attached to every function this tool deploys.
pub const DEFAULT_TAG_KEY: &str = "stagecraft";
