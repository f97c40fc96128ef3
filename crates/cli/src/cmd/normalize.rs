//! Implementation of the `tagpin normalize` command.
//!
//! Folds a services document in any supported encoding into the canonical
//! object-map encoding, leaving every record untouched. Useful on its own
//! when a Dhall or jq pipeline hands over an array encoding.

use anyhow::{Context, Result};

use tagpin_core::{load_document, report};

use crate::NormalizeArgs;
use crate::output::{print_stat, print_success};

pub fn cmd_normalize(args: &NormalizeArgs) -> Result<()> {
  let doc = load_document(&args.services)?;

  let out_path = args.out.as_deref().unwrap_or(&args.services);
  report::write_document(&doc, out_path)
    .with_context(|| format!("Failed to write {}", out_path.display()))?;

  print_success(&format!(
    "Normalized {} service(s) to the canonical encoding",
    doc.services.len()
  ));
  print_stat("Output", &out_path.display().to_string());

  Ok(())
}
