//! Implementation of the `stagecraft gen-policy` command.
//!
//! Prints the permission document the deployer would attach to a managed
//! role. The document is JSON in both output formats.

use anyhow::Result;

use stagecraft_lib::policy::{AppPolicyGenerator, PolicyGenerator};

use super::Context;
use crate::output::print_json;

pub fn cmd_gen_policy(ctx: &Context) -> Result<()> {
  let config = ctx.load_config()?;
  let document = AppPolicyGenerator::new().generate_policy(&config.app);
  print_json(&document)
}
