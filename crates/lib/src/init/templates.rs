//! Template content for `stagecraft new-project`.

/// `app.json` with a single route.
pub const APP_JSON_TEMPLATE: &str = r#"{
  "routes": {
    "/": {
      "GET": { "view_name": "index" }
    }
  },
  "authorizers": [],
  "actions": []
}
"#;

/// `.stagecraft/config.json`. `{app_name}` is substituted.
pub const CONFIG_JSON_TEMPLATE: &str = r#"{
  "app_name": "{app_name}",
  "stages": {
    "dev": {
      "api_gateway_stage": "api"
    }
  }
}
"#;

/// Starter handler source.
pub const APP_SOURCE_TEMPLATE: &str = r#"# Handler for the {app_name} application.

def index(event, context):
    return {"statusCode": 200, "body": "{\"hello\": \"world\"}"}
"#;

pub const GITIGNORE_TEMPLATE: &str = ".stagecraft/deployments/\n";
