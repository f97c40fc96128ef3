use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

use output::OutputFormat;

/// tagpin - resolve per-service container image tags for a deployment run
#[derive(Parser)]
#[command(name = "tagpin")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// How this run selects the services that receive the new tag.
///
/// Exactly one of `--built-images` (CI build trigger) or `--application`
/// (operator dispatch) must be given; the strategies are mutually
/// exclusive.
#[derive(Debug, clap::Args)]
pub struct StrategyArgs {
  /// Newline-delimited file of image basenames built this run
  #[arg(long, value_name = "FILE", group = "strategy")]
  pub built_images: Option<PathBuf>,

  /// Application scope for an operator run: "all" or an application name
  #[arg(long, value_name = "APP", group = "strategy")]
  pub application: Option<String>,

  /// With --application: infra-only run, pin every service to its
  /// currently-deployed tag
  #[arg(long, requires = "application")]
  pub no_update_images: bool,
}

#[derive(Debug, clap::Args)]
#[command(group = ArgGroup::new("strategy").required(true))]
pub struct ResolveArgs {
  /// Path to the generated services document
  #[arg(long, value_name = "FILE", default_value = "services.generated.json")]
  pub services: PathBuf,

  #[command(flatten)]
  pub strategy: StrategyArgs,

  /// Tag to assign to the selected services
  #[arg(long, value_name = "TAG")]
  pub tag: Option<String>,

  /// Where to write the resolved document (default: in place)
  #[arg(long, value_name = "FILE")]
  pub out: Option<PathBuf>,

  /// Where to write the machine-readable run summary
  #[arg(long, value_name = "FILE")]
  pub summary: Option<PathBuf>,

  /// ECS cluster to query for currently-deployed tags
  #[arg(long, env = "TAGPIN_CLUSTER", value_name = "NAME")]
  pub cluster: String,

  /// AWS region override
  #[arg(long, env = "AWS_REGION", value_name = "REGION")]
  pub region: Option<String>,

  /// AWS CLI binary to invoke
  #[arg(long, env = "TAGPIN_AWS_BIN", value_name = "PATH")]
  pub aws_bin: Option<PathBuf>,

  /// Concurrent deployed-tag lookups
  #[arg(long, default_value_t = tagpin_core::DEFAULT_PARALLELISM)]
  pub parallelism: usize,

  /// Verify that every selected image:tag exists in its registry
  #[arg(long)]
  pub verify_registry: bool,
}

#[derive(Debug, clap::Args)]
#[command(group = ArgGroup::new("strategy").required(true))]
pub struct PlanArgs {
  /// Path to the generated services document
  #[arg(long, value_name = "FILE", default_value = "services.generated.json")]
  pub services: PathBuf,

  #[command(flatten)]
  pub strategy: StrategyArgs,

  /// Output format
  #[arg(long, value_enum, default_value = "text")]
  pub format: OutputFormat,
}

#[derive(Debug, clap::Args)]
pub struct NormalizeArgs {
  /// Path to the services document, in any supported encoding
  #[arg(long, value_name = "FILE", default_value = "services.generated.json")]
  pub services: PathBuf,

  /// Where to write the canonical document (default: in place)
  #[arg(long, value_name = "FILE")]
  pub out: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct VerifyArgs {
  /// Path to the generated services document
  #[arg(long, value_name = "FILE", default_value = "services.generated.json")]
  pub services: PathBuf,

  /// Also check that every image:tag in the document exists in its registry
  #[arg(long)]
  pub registry: bool,

  /// Output format
  #[arg(long, value_enum, default_value = "text")]
  pub format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve a final tag for every service and rewrite the document
  Resolve(ResolveArgs),

  /// Show which services would be updated versus pinned (dry run)
  Plan(PlanArgs),

  /// Rewrite the services document in the canonical object-map encoding
  Normalize(NormalizeArgs),

  /// Check the service-to-image mapping for inconsistencies
  Verify(VerifyArgs),
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
  } else {
    EnvFilter::from_default_env()
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .with_writer(std::io::stderr)
    .init();

  match cli.command {
    Commands::Resolve(args) => cmd::cmd_resolve(&args, cli.verbose),
    Commands::Plan(args) => cmd::cmd_plan(&args),
    Commands::Normalize(args) => cmd::cmd_normalize(&args),
    Commands::Verify(args) => cmd::cmd_verify(&args),
  }
}
