//! Project scaffolding and read-only command tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn new_project_then_deploy() {
  let env = TestEnv::empty();

  env
    .cmd()
    .args(["new-project", "shop"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Created project shop"));

  let project = env.project_path().join("shop");
  assert!(project.join("app.json").exists());
  assert!(project.join(".stagecraft/config.json").exists());
  assert!(project.join("src/app.py").exists());

  env
    .cmd_in(&project)
    .arg("deploy")
    .assert()
    .success();

  assert!(env.cloud_state()["functions"]["shop-dev"].is_object());
}

#[test]
fn new_project_refuses_existing_directory() {
  let env = TestEnv::empty();
  env.write_file("project/shop/keep.txt", "");

  env
    .cmd()
    .args(["new-project", "shop"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("already exists"));
}

#[test]
fn gen_policy_prints_declared_actions() {
  let env = TestEnv::new();
  env.write_file(
    "project/app.json",
    r#"{"routes": {"/": {"GET": {"view_name": "index"}}}, "actions": ["s3:GetObject"]}"#,
  );

  let output = env.cmd().arg("gen-policy").output().unwrap();
  assert!(output.status.success());

  let document: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(document["Version"], "2012-10-17");
  assert!(String::from_utf8_lossy(&output.stdout).contains("s3:GetObject"));
  assert!(!env.cloud_state_path().exists());
}

#[test]
fn status_before_deploy() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("status")
    .assert()
    .success()
    .stdout(predicate::str::contains("No deployment recorded for stage dev"));

  let output = env.cmd().args(["status", "--output", "json"]).output().unwrap();
  let status: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(status["deployed"], false);
  assert!(status["url"].is_null());
}

#[test]
fn url_before_deploy_fails() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("url")
    .assert()
    .failure()
    .stderr(predicate::str::contains("stagecraft deploy"));
}

#[test]
fn missing_project_reports_config_path() {
  let env = TestEnv::empty();

  env
    .cmd()
    .arg("deploy")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load project"));
}
