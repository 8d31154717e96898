use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Content types the gateway treats as binary unless the application says otherwise.
pub const DEFAULT_BINARY_TYPES: &[&str] = &[
  "application/octet-stream",
  "application/x-tar",
  "application/zip",
  "audio/basic",
  "audio/ogg",
  "audio/mp4",
  "audio/mpeg",
  "audio/wav",
  "audio/webm",
  "image/png",
  "image/jpg",
  "image/jpeg",
  "image/gif",
  "video/ogg",
  "video/mpeg",
  "video/webm",
];

/// Route path -> HTTP method -> route entry, in declaration order.
pub type RouteTable = IndexMap<String, IndexMap<String, RouteEntry>>;

/// Declarative description of the HTTP application being deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDefinition {
  #[serde(default)]
  pub routes: RouteTable,

  #[serde(default)]
  pub authorizers: Vec<AuthorizerDefinition>,

  #[serde(default = "default_binary_types")]
  pub binary_types: Vec<String>,

  /// Service actions the application code calls, fed to policy generation.
  #[serde(default)]
  pub actions: Vec<String>,
}

impl Default for ApplicationDefinition {
  fn default() -> Self {
    Self {
      routes: IndexMap::new(),
      authorizers: Vec::new(),
      binary_types: default_binary_types(),
      actions: Vec::new(),
    }
  }
}

impl ApplicationDefinition {
  /// Every view name referenced by the route table, in declaration order.
  pub fn view_names(&self) -> Vec<&str> {
    self
      .routes
      .values()
      .flat_map(|methods| methods.values().map(|entry| entry.view_name.as_str()))
      .collect()
  }
}

/// A single view bound to a path and method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
  pub view_name: String,

  #[serde(default = "default_content_types")]
  pub content_types: Vec<String>,

  /// `true` expands to the default CORS configuration, `false`/absent disables it.
  #[serde(default, deserialize_with = "deserialize_cors")]
  pub cors: Option<CorsConfig>,

  /// Name of the authorizer guarding this route, if any.
  #[serde(default)]
  pub authorizer: Option<String>,

  #[serde(default)]
  pub api_key_required: bool,
}

impl RouteEntry {
  pub fn new(view_name: impl Into<String>) -> Self {
    Self {
      view_name: view_name.into(),
      content_types: default_content_types(),
      cors: None,
      authorizer: None,
      api_key_required: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsConfig {
  #[serde(default = "default_allow_origin")]
  pub allow_origin: String,

  #[serde(default = "default_allow_headers")]
  pub allow_headers: Vec<String>,

  #[serde(default)]
  pub expose_headers: Vec<String>,

  #[serde(default)]
  pub max_age: Option<u32>,

  #[serde(default)]
  pub allow_credentials: Option<bool>,
}

impl Default for CorsConfig {
  fn default() -> Self {
    Self {
      allow_origin: default_allow_origin(),
      allow_headers: default_allow_headers(),
      expose_headers: Vec::new(),
      max_age: None,
      allow_credentials: None,
    }
  }
}

/// An auxiliary function the gateway calls to authorize requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizerDefinition {
  pub name: String,

  /// Entry-point reference inside the deployment artifact, e.g. `app.check_token`.
  pub handler: String,
}

fn default_binary_types() -> Vec<String> {
  DEFAULT_BINARY_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_content_types() -> Vec<String> {
  vec!["application/json".to_string()]
}

fn default_allow_origin() -> String {
  "*".to_string()
}

fn default_allow_headers() -> Vec<String> {
  [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCors {
  Flag(bool),
  Config(CorsConfig),
}

fn deserialize_cors<'de, D>(deserializer: D) -> Result<Option<CorsConfig>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Option::<RawCors>::deserialize(deserializer)?;
  Ok(match raw {
    None | Some(RawCors::Flag(false)) => None,
    Some(RawCors::Flag(true)) => Some(CorsConfig::default()),
    Some(RawCors::Config(config)) => Some(config),
  })
}
