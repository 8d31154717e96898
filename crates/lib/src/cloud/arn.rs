//! Helpers for the resource name formats the cloud services hand back.
//!
//! ```text
//! arn:aws:lambda:<region>:<account>:function:<name>
//! arn:aws:iam::<account>:role/<name>
//! ```

pub fn function_arn(region: &str, account_id: &str, function_name: &str) -> String {
  format!("arn:aws:lambda:{}:{}:function:{}", region, account_id, function_name)
}

pub fn role_arn(account_id: &str, role_name: &str) -> String {
  format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}

/// Last `:`-separated segment of a function ARN; plain names pass through.
pub fn function_name(name_or_arn: &str) -> &str {
  if name_or_arn.starts_with("arn:") {
    name_or_arn.rsplit(':').next().unwrap_or(name_or_arn)
  } else {
    name_or_arn
  }
}

/// Account segment of an ARN.
pub fn account_id(arn: &str) -> Option<&str> {
  arn.split(':').nth(4).filter(|id| !id.is_empty())
}

/// Role name of a role ARN.
pub fn role_name(arn: &str) -> Option<&str> {
  arn.split('/').nth(1).filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn function_arn_parts() {
    let arn = function_arn("us-west-2", "123456789012", "demo-dev");
    assert_eq!(arn, "arn:aws:lambda:us-west-2:123456789012:function:demo-dev");
    assert_eq!(function_name(&arn), "demo-dev");
    assert_eq!(account_id(&arn), Some("123456789012"));
  }

  #[test]
  fn plain_function_name_passes_through() {
    assert_eq!(function_name("demo-dev"), "demo-dev");
  }

  #[test]
  fn role_arn_parts() {
    let arn = role_arn("123456789012", "demo-dev");
    assert_eq!(arn, "arn:aws:iam::123456789012:role/demo-dev");
    assert_eq!(role_name(&arn), Some("demo-dev"));
    assert_eq!(account_id(&arn), Some("123456789012"));
    assert_eq!(role_name("not-an-arn"), None);
  }
}
