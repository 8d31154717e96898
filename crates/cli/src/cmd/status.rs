//! Status command implementation.
//!
//! Displays the stage's deployment record and the last built package.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde_json::json;

use stagecraft_lib::artifact::{ArtifactBuilder, ZipPackager};
use stagecraft_lib::record::RecordStore;
use stagecraft_lib::util::hash::hash_file;

use super::Context;
use crate::output::{package_summary, print_info, print_json, print_stat, print_success};

struct PackageInfo {
  size: u64,
  digest: String,
}

fn package_info(path: &Path) -> Option<PackageInfo> {
  let size = fs::metadata(path).ok()?.len();
  let digest = hash_file(path).ok()?;
  Some(PackageInfo { size, digest })
}

pub fn cmd_status(ctx: &Context) -> Result<()> {
  let project_dir = ctx.project_dir();
  let store = RecordStore::for_project(&project_dir);
  let record = store.load(&ctx.stage)?;
  let package = package_info(&ZipPackager::new().artifact_path(&project_dir));

  if ctx.output.is_json() {
    return print_json(&json!({
      "stage": ctx.stage,
      "deployed": record.is_some(),
      "url": record.as_ref().and_then(|r| r.endpoint_url()),
      "resources": record,
      "package": package.map(|p| json!({ "size_bytes": p.size, "sha256": p.digest })),
    }));
  }

  let Some(record) = record else {
    print_info(&format!(
      "No deployment recorded for stage {}. Run 'stagecraft deploy' to create one.",
      ctx.stage
    ));
    return Ok(());
  };

  print_success(&format!("Stage {} is deployed", ctx.stage));
  print_stat("Region", &record.region);
  print_stat("Handler", &record.api_handler_name);
  print_stat("Handler ARN", &record.api_handler_arn);
  if let Some(url) = record.endpoint_url() {
    print_stat("URL", &url);
  }
  print_stat("Functions", &record.lambda_functions.len().to_string());
  print_stat("Deployed with", &format!("stagecraft {}", record.tool_version));

  if let Some(package) = package {
    println!();
    print_stat("Package", &package_summary(package.size, &package.digest));
  }

  Ok(())
}
