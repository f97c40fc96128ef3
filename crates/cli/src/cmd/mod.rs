mod normalize;
mod plan;
mod resolve;
mod verify;

pub use normalize::cmd_normalize;
pub use plan::cmd_plan;
pub use resolve::cmd_resolve;
pub use verify::cmd_verify;

use anyhow::Result;
use tracing::debug;

use tagpin_core::{
  ApplicationFilter, BuildArtifactSet, BuildArtifactStrategy, DispatchStrategy, SelectStrategy,
};

use crate::StrategyArgs;

/// Build the selection strategy from the trigger flags.
///
/// clap guarantees exactly one of the two strategy flags is present.
pub(crate) fn build_strategy(args: &StrategyArgs) -> Result<Box<dyn SelectStrategy>> {
  if let Some(path) = &args.built_images {
    let artifacts = BuildArtifactSet::from_path(path)?;
    debug!(path = %path.display(), images = artifacts.len(), "using build-artifact strategy");
    return Ok(Box::new(BuildArtifactStrategy::new(artifacts)));
  }

  let application = args
    .application
    .as_deref()
    .expect("clap enforces the strategy group");
  Ok(Box::new(DispatchStrategy::new(
    !args.no_update_images,
    ApplicationFilter::parse(application),
  )))
}
