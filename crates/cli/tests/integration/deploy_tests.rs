//! Deploy command integration tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

const AUTH_APP: &str = r#"{
  "routes": {"/items": {"GET": {"view_name": "list_items", "authorizer": "auth1"}}},
  "authorizers": [{"name": "auth1", "handler": "app.auth1"}]
}"#;

#[test]
fn deploy_creates_function_and_record() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Deployed stage dev"))
    .stdout(predicate::str::contains(".execute-api.us-west-2.amazonaws.com/api/"));

  let state = env.cloud_state();
  assert!(state["functions"]["demo-dev"].is_object());
  assert_eq!(state["rest_apis"].as_object().unwrap().len(), 1);

  let deployed = env.deployed().unwrap();
  assert_eq!(deployed["dev"]["api_handler_name"], "demo-dev");
  assert!(deployed["dev"]["rest_api_id"].is_string());
}

#[test]
fn deploy_json_output_is_parseable() {
  let env = TestEnv::new();

  let output = env.cmd().args(["deploy", "--output", "json"]).output().unwrap();
  assert!(output.status.success());

  let result: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(result["stage"], "dev");
  assert_eq!(result["resources"]["api_handler_name"], "demo-dev");
  assert!(result["url"].as_str().unwrap().starts_with("https://"));
}

#[test]
fn redeploy_reuses_gateway_and_function() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();
  let first = env.deployed().unwrap();

  env.write_file("project/src/app.py", "def index(event, context):\n    return {'v': 2}\n");
  env.cmd().arg("deploy").assert().success();
  let second = env.deployed().unwrap();

  assert_eq!(first["dev"]["rest_api_id"], second["dev"]["rest_api_id"]);
  assert_eq!(first["dev"]["api_handler_arn"], second["dev"]["api_handler_arn"]);

  let state = env.cloud_state();
  let rest_api_id = second["dev"]["rest_api_id"].as_str().unwrap();
  assert_eq!(state["rest_apis"][rest_api_id]["deployments"], 2);
}

#[test]
fn stages_are_deployed_independently() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();
  env.cmd().args(["deploy", "--stage", "prod"]).assert().success();

  let state = env.cloud_state();
  assert!(state["functions"]["demo-dev"].is_object());
  assert!(state["functions"]["demo-prod"].is_object());

  let deployed = env.deployed().unwrap();
  assert_ne!(deployed["dev"]["rest_api_id"], deployed["prod"]["rest_api_id"]);
}

#[test]
fn removed_authorizer_is_cleaned_up_on_redeploy() {
  let env = TestEnv::new();
  env.write_file("project/app.json", AUTH_APP);
  env.cmd().arg("deploy").assert().success();
  assert!(env.cloud_state()["functions"]["demo-dev-auth1"].is_object());

  env.write_file(
    "project/app.json",
    r#"{"routes": {"/items": {"GET": {"view_name": "list_items"}}}}"#,
  );
  env
    .cmd()
    .arg("deploy")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed:"))
    .stdout(predicate::str::contains("demo-dev-auth1"));

  assert!(env.cloud_state()["functions"].get("demo-dev-auth1").is_none());
  assert!(env.deployed().unwrap()["dev"]["lambda_functions"].as_object().unwrap().is_empty());
}

#[test]
fn region_flag_overrides_config() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["deploy", "--region", "eu-west-1"])
    .assert()
    .success()
    .stdout(predicate::str::contains(".execute-api.eu-west-1.amazonaws.com/api/"));

  assert_eq!(env.deployed().unwrap()["dev"]["region"], "eu-west-1");
}

#[test]
fn invalid_route_fails_before_any_remote_call() {
  let env = TestEnv::new();
  env.write_file(
    "project/app.json",
    r#"{"routes": {"/items/": {"GET": {"view_name": "list_items"}}}}"#,
  );

  env
    .cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("trailing slash"));

  assert!(!env.cloud_state_path().exists());
  assert!(env.deployed().is_none());
}

#[test]
fn missing_role_arn_is_a_validation_error() {
  let env = TestEnv::new();
  env.write_file(
    "project/.stagecraft/config.json",
    r#"{"app_name": "demo", "manage_iam_role": false}"#,
  );

  env
    .cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("iam_role_arn"));
}

#[test]
fn url_and_status_after_deploy() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();
  let rest_api_id = env.deployed().unwrap()["dev"]["rest_api_id"].as_str().unwrap().to_string();

  env
    .cmd()
    .arg("url")
    .assert()
    .success()
    .stdout(predicate::str::starts_with(format!(
      "https://{}.execute-api.us-west-2.amazonaws.com/api/",
      rest_api_id
    )));

  env
    .cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("Stage dev is deployed"))
    .stdout(predicate::str::contains("Package"));
}
