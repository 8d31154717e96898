mod cmd;
mod output;
mod prompts;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stagecraft_lib::consts::DEFAULT_STAGE_NAME;
use stagecraft_lib::deploy::DeployError;

use crate::output::{OutputFormat, print_error, print_warning};

/// stagecraft - deploy serverless HTTP applications
#[derive(Parser)]
#[command(name = "stagecraft")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project directory containing app.json
  #[arg(long, global = true, default_value = ".")]
  project_dir: PathBuf,

  /// Stage to operate on
  #[arg(long, global = true, default_value = DEFAULT_STAGE_NAME)]
  stage: String,

  /// Override the region from config.json
  #[arg(long, global = true, env = "STAGECRAFT_REGION")]
  region: Option<String>,

  /// State file of the local cloud (default: per-region file in the data directory)
  #[arg(long, global = true, env = "STAGECRAFT_CLOUD_STATE")]
  cloud_state: Option<PathBuf>,

  /// Answer every confirmation with its default
  #[arg(long, global = true)]
  no_prompt: bool,

  /// Output format
  #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Deploy the application to a stage
  Deploy,

  /// Delete every resource recorded for a stage
  Delete,

  /// Print the permission document generated for the application
  GenPolicy,

  /// Print the endpoint URL of a deployed stage
  Url,

  /// Show the deployment record of a stage
  Status,

  /// Create a new project
  NewProject {
    /// Name of the project directory and application
    name: String,
  },
}

fn init_tracing(verbose: bool) {
  let default_level = if verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .without_time()
    .init();
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  let ctx = cmd::Context {
    project_dir: cli.project_dir,
    stage: cli.stage,
    region: cli.region,
    cloud_state: cli.cloud_state,
    no_prompt: cli.no_prompt,
    output: cli.output,
  };

  let result = match cli.command {
    Commands::Deploy => cmd::cmd_deploy(&ctx),
    Commands::Delete => cmd::cmd_delete(&ctx),
    Commands::GenPolicy => cmd::cmd_gen_policy(&ctx),
    Commands::Url => cmd::cmd_url(&ctx),
    Commands::Status => cmd::cmd_status(&ctx),
    Commands::NewProject { name } => cmd::cmd_new_project(&ctx, &name),
  };

  match result {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => report(&err),
  }
}

/// Cancellation exits with 2 so scripts can tell it apart from a failure.
fn report(err: &anyhow::Error) -> ExitCode {
  match err.downcast_ref::<DeployError>() {
    Some(DeployError::Cancelled(point)) => {
      print_warning(&format!("Cancelled at confirmation \"{}\"; nothing further was changed.", point));
      ExitCode::from(2)
    }
    Some(deploy_err @ DeployError::Deployment(_)) => {
      eprintln!("{}", deploy_err);
      ExitCode::FAILURE
    }
    _ => {
      print_error(&format!("{:#}", err));
      ExitCode::FAILURE
    }
  }
}
