//! Implementation of the `stagecraft deploy` command.

use anyhow::Result;
use serde_json::json;

use stagecraft_lib::deploy::Deployer;

use super::Context;
use crate::output::{print_info, print_json, print_removed, print_stat, print_success};
use crate::prompts::TerminalPrompter;

/// Deploy the project to the selected stage.
///
/// Deployment errors are returned unwrapped so `main` can print their
/// rendered form without an extra context line.
pub fn cmd_deploy(ctx: &Context) -> Result<()> {
  let config = ctx.load_config()?;
  let cloud = ctx.open_cloud(&config)?;
  let prompter = TerminalPrompter::new(ctx.no_prompt);

  if !ctx.output.is_json() {
    print_info(&format!(
      "Deploying {} to stage {} in {}",
      config.app_name,
      config.stage,
      config.region()
    ));
  }

  let result = Deployer::new(&cloud, &prompter).deploy(&config)?;
  let url = result.resources.endpoint_url();

  if ctx.output.is_json() {
    return print_json(&json!({
      "stage": result.stage,
      "url": url,
      "resources": result.resources,
      "removed_functions": result.removed_functions,
    }));
  }

  print_success(&format!("Deployed stage {}", result.stage));
  print_stat("Handler", &result.resources.api_handler_arn);
  for (name, arn) in &result.resources.lambda_functions {
    print_stat(name, arn);
  }
  if let Some(id) = &result.resources.rest_api_id {
    print_stat("Rest API", id);
  }
  if let Some(url) = url {
    print_stat("URL", &url);
  }

  if !result.removed_functions.is_empty() {
    println!();
    println!("Removed:");
    for arn in &result.removed_functions {
      print_removed(arn);
    }
  }

  Ok(())
}
