use anyhow::{Result, bail};
use serde_json::json;

use stagecraft_lib::record::RecordStore;

use super::Context;
use crate::output::print_json;

/// Print the endpoint of a deployed stage.
pub fn cmd_url(ctx: &Context) -> Result<()> {
  let store = RecordStore::for_project(&ctx.project_dir());

  let Some(url) = store.load(&ctx.stage)?.and_then(|record| record.endpoint_url()) else {
    bail!("Stage {} has no deployed rest api. Run 'stagecraft deploy' first.", ctx.stage);
  };

  if ctx.output.is_json() {
    print_json(&json!({ "stage": ctx.stage, "url": url }))
  } else {
    println!("{}", url);
    Ok(())
  }
}
