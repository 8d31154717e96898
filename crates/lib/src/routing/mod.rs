//! Routing document handed to the gateway.
//!
//! The document is opaque to the deployer: it is generated here, pushed to
//! the gateway as-is, and never read back.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::app::{ApplicationDefinition, CorsConfig, RouteEntry};
use crate::cloud::arn;

/// Function ARNs the routing document points at.
#[derive(Debug, Clone, Copy)]
pub struct FunctionArns<'a> {
  pub api_handler: &'a str,
  /// Authorizer name -> function ARN.
  pub authorizers: &'a BTreeMap<String, String>,
}

pub trait RoutingGenerator {
  fn generate(&self, region: &str, arns: FunctionArns<'_>, app: &ApplicationDefinition) -> Value;
}

/// Swagger 2.0 style document with proxy integrations.
#[derive(Debug, Clone, Default)]
pub struct OpenApiGenerator;

impl OpenApiGenerator {
  pub fn new() -> Self {
    Self
  }
}

fn invocation_uri(region: &str, function_arn: &str) -> String {
  format!(
    "arn:aws:apigateway:{}:lambda:path/2015-03-31/functions/{}/invocations",
    region, function_arn
  )
}

fn method_entry(region: &str, handler_arn: &str, entry: &RouteEntry, binary_types: &[String]) -> Value {
  let binary = entry.content_types.iter().any(|ct| binary_types.contains(ct));
  let mut method = json!({
    "consumes": entry.content_types,
    "produces": ["application/json"],
    "responses": {"200": {"description": "200 response", "schema": {"$ref": "#/definitions/Empty"}}},
    "x-amazon-apigateway-integration": {
      "type": "aws_proxy",
      "httpMethod": "POST",
      "uri": invocation_uri(region, handler_arn),
      "passthroughBehavior": "when_no_match",
      "contentHandling": if binary { "CONVERT_TO_BINARY" } else { "CONVERT_TO_TEXT" },
    },
    "x-view-name": entry.view_name,
  });

  let mut security = Vec::new();
  if let Some(authorizer) = &entry.authorizer {
    security.push(json!({ authorizer.as_str(): [] }));
  }
  if entry.api_key_required {
    security.push(json!({"api_key": []}));
  }
  if !security.is_empty() {
    method["security"] = Value::Array(security);
  }
  method
}

/// Mock integration answering CORS preflight requests.
fn preflight_entry(cors: &CorsConfig, methods: &[String]) -> Value {
  let mut allowed: Vec<String> = methods.iter().map(|m| m.to_uppercase()).collect();
  allowed.push("OPTIONS".to_string());

  let mut headers = Map::new();
  headers.insert(
    "method.response.header.Access-Control-Allow-Origin".to_string(),
    json!(format!("'{}'", cors.allow_origin)),
  );
  headers.insert(
    "method.response.header.Access-Control-Allow-Methods".to_string(),
    json!(format!("'{}'", allowed.join(","))),
  );
  headers.insert(
    "method.response.header.Access-Control-Allow-Headers".to_string(),
    json!(format!("'{}'", cors.allow_headers.join(","))),
  );
  if !cors.expose_headers.is_empty() {
    headers.insert(
      "method.response.header.Access-Control-Expose-Headers".to_string(),
      json!(format!("'{}'", cors.expose_headers.join(","))),
    );
  }
  if let Some(max_age) = cors.max_age {
    headers.insert(
      "method.response.header.Access-Control-Max-Age".to_string(),
      json!(format!("'{}'", max_age)),
    );
  }
  if cors.allow_credentials == Some(true) {
    headers.insert(
      "method.response.header.Access-Control-Allow-Credentials".to_string(),
      json!("'true'"),
    );
  }

  let declared: Map<String, Value> = headers
    .keys()
    .map(|key| (key.trim_start_matches("method.response.header.").to_string(), json!({"type": "string"})))
    .collect();

  json!({
    "consumes": ["application/json"],
    "produces": ["application/json"],
    "responses": {"200": {"description": "200 response", "headers": declared}},
    "x-amazon-apigateway-integration": {
      "type": "mock",
      "requestTemplates": {"application/json": "{\"statusCode\": 200}"},
      "responses": {"default": {"statusCode": "200", "responseParameters": headers}},
    },
  })
}

impl RoutingGenerator for OpenApiGenerator {
  fn generate(&self, region: &str, arns: FunctionArns<'_>, app: &ApplicationDefinition) -> Value {
    let mut paths = Map::new();

    for (route, methods) in &app.routes {
      let mut path_item = Map::new();
      for (method, entry) in methods {
        path_item.insert(
          method.to_lowercase(),
          method_entry(region, arns.api_handler, entry, &app.binary_types),
        );
      }

      if let Some(cors) = methods.values().find_map(|entry| entry.cors.as_ref()) {
        let names: Vec<String> = methods.keys().cloned().collect();
        path_item.insert("options".to_string(), preflight_entry(cors, &names));
      }

      paths.insert(route.clone(), Value::Object(path_item));
    }

    let mut security_definitions = Map::new();
    for (name, function_arn) in arns.authorizers {
      security_definitions.insert(
        name.clone(),
        json!({
          "in": "header",
          "type": "apiKey",
          "name": "Authorization",
          "x-amazon-apigateway-authtype": "custom",
          "x-amazon-apigateway-authorizer": {
            "type": "token",
            "authorizerUri": invocation_uri(region, function_arn),
          },
        }),
      );
    }
    let uses_api_key = app
      .routes
      .values()
      .flat_map(|methods| methods.values())
      .any(|entry| entry.api_key_required);
    if uses_api_key {
      security_definitions.insert(
        "api_key".to_string(),
        json!({"in": "header", "type": "apiKey", "name": "x-api-key"}),
      );
    }

    let mut document = json!({
      "swagger": "2.0",
      "info": {"version": "1.0", "title": arn::function_name(arns.api_handler)},
      "schemes": ["https"],
      "x-amazon-apigateway-binary-media-types": app.binary_types,
      "paths": paths,
      "definitions": {"Empty": {"type": "object", "title": "Empty Schema"}},
    });
    if !security_definitions.is_empty() {
      document["securityDefinitions"] = Value::Object(security_definitions);
    }
    document
  }
}
