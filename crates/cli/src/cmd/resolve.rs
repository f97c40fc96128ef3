//! Implementation of the `tagpin resolve` command.
//!
//! Runs the full pipeline: normalize the services document, select the
//! services to update, assign the desired tag, pin everything else to its
//! currently-deployed tag, validate, and rewrite the document in the
//! canonical encoding.

use std::sync::Arc;

use anyhow::{Context, Result};

use tagpin_core::{RegistryProbe, RunRequest, TagLookup, run};
use tagpin_ecs::{AwsCli, EcsTagLookup};
use tagpin_registry::HttpRegistry;

use crate::ResolveArgs;
use crate::output::{print_stat, print_success, symbols};

use super::build_strategy;

pub fn cmd_resolve(args: &ResolveArgs, verbose: bool) -> Result<()> {
  let strategy = build_strategy(&args.strategy)?;

  let aws = AwsCli::new(args.aws_bin.clone(), args.region.clone());
  let lookup: Arc<dyn TagLookup> = Arc::new(EcsTagLookup::new(&args.cluster, aws));
  let probe = args.verify_registry.then(HttpRegistry::new);

  let request = RunRequest {
    services_path: &args.services,
    out_path: args.out.as_deref(),
    summary_path: args.summary.as_deref(),
    desired_tag: args.tag.as_deref(),
    parallelism: args.parallelism,
  };

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let outcome = rt.block_on(run(
    &request,
    strategy.as_ref(),
    lookup,
    probe.as_ref().map(|p| p as &dyn RegistryProbe),
  ))?;

  let total = outcome.doc.services.len();
  let pinned = total - outcome.summary.updated_count;

  print_success(&format!("Resolved tags for {} service(s)", total));
  print_stat("Updated", &outcome.summary.updated_count.to_string());
  print_stat("Pinned", &pinned.to_string());
  if let Some(tag) = &args.tag
    && outcome.summary.updated_count > 0
  {
    print_stat("Tag", tag);
  }

  if verbose {
    println!();
    for (key, record) in &outcome.doc.services {
      let symbol = if outcome.selection.contains(key) {
        symbols::UPDATE
      } else {
        symbols::PIN
      };
      let tag = record.image_tag.as_deref().unwrap_or("-");
      println!("  {} {} {}", symbol, key, tag);
    }
  }

  Ok(())
}
