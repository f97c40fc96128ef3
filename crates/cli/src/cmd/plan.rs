//! Implementation of the `tagpin plan` command.
//!
//! Dry run of the selection stage: shows which services would receive the
//! new tag and which would be pinned, without querying live state or
//! touching the document.

use anyhow::Result;

use tagpin_core::load_document;

use crate::PlanArgs;
use crate::output::{print_info, print_json, print_stat, symbols};

use super::build_strategy;

pub fn cmd_plan(args: &PlanArgs) -> Result<()> {
  let doc = load_document(&args.services)?;
  let strategy = build_strategy(&args.strategy)?;
  let selection = strategy.select(&doc.services)?;

  let pinned: Vec<_> = doc
    .services
    .keys()
    .filter(|key| !selection.contains(*key))
    .collect();

  if args.format.is_json() {
    let payload = serde_json::json!({
      "updated_count": selection.len(),
      "updated_keys": selection,
      "pinned_keys": pinned,
    });
    return print_json(&payload);
  }

  if selection.is_empty() {
    print_info("No services selected; every tag would be pinned to its deployed value");
  }

  for key in doc.services.keys() {
    let symbol = if selection.contains(key) {
      symbols::UPDATE
    } else {
      symbols::PIN
    };
    println!("  {} {}", symbol, key);
  }

  println!();
  print_stat("Would update", &selection.len().to_string());
  print_stat("Would pin", &pinned.len().to_string());

  Ok(())
}
