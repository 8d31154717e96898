//! Terminal output for stagecraft commands.
//!
//! Status lines go to stdout, warnings and errors to stderr, so `--output json`
//! leaves stdout parseable.

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

/// One line describing a built package, e.g. `2.4 MB (sha256 3f2a9c81d0e4)`.
pub fn package_summary(size: u64, digest: &str) -> String {
  let megabytes = size as f64 / (1024.0 * 1024.0);
  let size = if megabytes >= 0.1 {
    format!("{:.1} MB", megabytes)
  } else {
    format!("{} bytes", size)
  };
  format!("{} (sha256 {})", size, &digest[..digest.len().min(12)])
}

pub fn print_success(message: &str) {
  println!("{} {}", "✓".if_supports_color(Stream::Stdout, |s| s.green()), message);
}

pub fn print_info(message: &str) {
  println!("{} {}", "•".if_supports_color(Stream::Stdout, |s| s.blue()), message);
}

/// A resource the command deleted, listed under a success line.
pub fn print_removed(resource: &str) {
  println!("  {} {}", "-".if_supports_color(Stream::Stdout, |s| s.red()), resource);
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    "✗".if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    "⚠".if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

/// Indented `label: value` line for a deployed resource.
pub fn print_stat(label: &str, value: &str) {
  println!("  {}: {}", label.if_supports_color(Stream::Stdout, |s| s.dimmed()), value);
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
  println!("{}", json);
  Ok(())
}
