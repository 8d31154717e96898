//! Delete command integration tests.

use predicates::prelude::*;
use serde_json::Value;

use super::common::TestEnv;

#[test]
fn delete_removes_stage_resources_and_record() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();

  env
    .cmd()
    .arg("delete")
    .assert()
    .success()
    .stdout(predicate::str::contains("Deleted stage dev"))
    .stdout(predicate::str::contains("demo-dev"));

  let state = env.cloud_state();
  assert!(state["functions"].as_object().unwrap().is_empty());
  assert!(state["rest_apis"].as_object().unwrap().is_empty());
  assert!(env.deployed().unwrap().get("dev").is_none());
}

#[test]
fn delete_keeps_role_without_confirmation() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();

  env.cmd().arg("delete").assert().success();

  assert_eq!(env.cloud_state()["roles"].as_object().unwrap().len(), 1);
}

#[test]
fn delete_leaves_other_stages_alone() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();
  env.cmd().args(["deploy", "--stage", "prod"]).assert().success();

  env.cmd().args(["delete", "--stage", "prod"]).assert().success();

  let state = env.cloud_state();
  assert!(state["functions"]["demo-dev"].is_object());
  assert!(state["functions"].get("demo-prod").is_none());
  assert!(env.deployed().unwrap()["dev"].is_object());
}

#[test]
fn delete_without_deployment_is_a_no_op() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("delete")
    .assert()
    .success()
    .stdout(predicate::str::contains("No deployment recorded for stage dev"));

  assert!(!env.cloud_state_path().exists());
}

#[test]
fn delete_json_output_reports_what_was_removed() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();

  let output = env.cmd().args(["delete", "--output", "json"]).output().unwrap();
  assert!(output.status.success());

  let report: Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(report["found"], true);
  assert_eq!(report["rest_api_deleted"], true);
  assert_eq!(report["deleted_functions"][0], "demo-dev");
  assert!(report["deleted_role"].is_null());
}

#[test]
fn redeploy_after_delete_starts_fresh() {
  let env = TestEnv::new();
  env.cmd().arg("deploy").assert().success();
  env.cmd().arg("delete").assert().success();

  env.cmd().arg("deploy").assert().success();

  let state = env.cloud_state();
  assert!(state["functions"]["demo-dev"].is_object());
  assert_eq!(state["rest_apis"].as_object().unwrap().len(), 1);
}
