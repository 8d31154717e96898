use anyhow::{Context as _, Result};
use serde_json::json;

use stagecraft_lib::init::new_project;

use super::Context;
use crate::output::{print_info, print_json, print_stat, print_success};

/// Scaffold `<project-dir>/<name>`.
pub fn cmd_new_project(ctx: &Context, name: &str) -> Result<()> {
  let created = new_project(&ctx.project_dir, name).context("Failed to create project")?;

  if ctx.output.is_json() {
    return print_json(&json!({
      "project_dir": created.project_dir,
      "app_json": created.app_json,
      "config_json": created.config_json,
    }));
  }

  print_success(&format!("Created project {}", name));
  print_stat("Directory", &created.project_dir.display().to_string());
  print_stat("Routes", &created.app_json.display().to_string());
  print_stat("Config", &created.config_json.display().to_string());
  println!();
  print_info(&format!("cd {} && stagecraft deploy", name));
  Ok(())
}
