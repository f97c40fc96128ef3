//! Thin wrapper around the AWS CLI.
//!
//! The lookup shells out to `aws` rather than linking an SDK: the engine
//! runs inside CI jobs that already carry an authenticated AWS CLI, and the
//! two queries it needs are trivially expressed as CLI calls with JSON
//! output. The binary path is overridable so tests can substitute a stub.

use std::path::PathBuf;
use std::process::Stdio;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from invoking the AWS CLI.
#[derive(Debug, Error)]
pub enum AwsCliError {
  #[error("failed to spawn '{bin}': {source}")]
  Spawn {
    bin: String,
    #[source]
    source: std::io::Error,
  },

  #[error("aws {subcommand} exited with {code:?}: {stderr}")]
  Failed {
    subcommand: String,
    code: Option<i32>,
    stderr: String,
  },

  #[error("failed to decode aws {subcommand} output: {source}")]
  Decode {
    subcommand: String,
    #[source]
    source: serde_json::Error,
  },
}

/// Handle for running `aws` subcommands.
#[derive(Debug, Clone)]
pub struct AwsCli {
  bin: PathBuf,
  region: Option<String>,
}

impl AwsCli {
  pub fn new(bin: Option<PathBuf>, region: Option<String>) -> Self {
    Self {
      bin: bin.unwrap_or_else(|| PathBuf::from("aws")),
      region,
    }
  }

  /// Run one subcommand and deserialize its JSON output.
  pub async fn call<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, AwsCliError> {
    let subcommand = args.join(" ");
    debug!(bin = %self.bin.display(), %subcommand, "invoking aws cli");

    let mut command = Command::new(&self.bin);
    command
      .args(args)
      .args(["--output", "json"])
      .stdin(Stdio::null());
    if let Some(region) = &self.region {
      command.args(["--region", region]);
    }

    let output = command.output().await.map_err(|source| AwsCliError::Spawn {
      bin: self.bin.display().to_string(),
      source,
    })?;

    if !output.status.success() {
      return Err(AwsCliError::Failed {
        subcommand,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }

    serde_json::from_slice(&output.stdout).map_err(|source| AwsCliError::Decode {
      subcommand,
      source,
    })
  }
}
