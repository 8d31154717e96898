//! Implementation of the `stagecraft delete` command.

use anyhow::Result;
use serde_json::json;

use stagecraft_lib::deploy::Deployer;

use super::Context;
use crate::output::{print_info, print_json, print_removed, print_success};
use crate::prompts::TerminalPrompter;

pub fn cmd_delete(ctx: &Context) -> Result<()> {
  let config = ctx.load_config()?;
  let cloud = ctx.open_cloud(&config)?;
  let prompter = TerminalPrompter::new(ctx.no_prompt);

  let report = Deployer::new(&cloud, &prompter).delete(&config)?;

  if ctx.output.is_json() {
    return print_json(&json!({
      "stage": config.stage,
      "found": report.found,
      "rest_api_deleted": report.rest_api_deleted,
      "deleted_functions": report.functions.deleted,
      "missing_functions": report.functions.missing,
      "deleted_role": report.functions.role,
    }));
  }

  if !report.found {
    print_info(&format!("No deployment recorded for stage {}", config.stage));
    return Ok(());
  }

  print_success(&format!("Deleted stage {}", config.stage));
  if report.rest_api_deleted {
    print_removed("rest api");
  }
  for name in &report.functions.deleted {
    print_removed(name);
  }
  if let Some(role) = &report.functions.role {
    print_removed(&format!("role {}", role));
  }
  for name in &report.functions.missing {
    print_info(&format!("{} was already gone", name));
  }

  Ok(())
}
