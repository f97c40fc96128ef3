//! Implementation of the `tagpin verify` command.
//!
//! Standalone consistency check for a generated services document: every
//! record must name a container image, composite keys must agree with the
//! record's application, and (optionally) every `image:tag` must exist in
//! its registry. Reports every issue in one pass and exits non-zero if any
//! were found.

use anyhow::{Context, Result};

use tagpin_core::{Selection, ValidateError, load_document, mapping_issues, verify_registry};
use tagpin_registry::HttpRegistry;

use crate::VerifyArgs;
use crate::output::{print_error, print_json, print_success, print_warning};

pub fn cmd_verify(args: &VerifyArgs) -> Result<()> {
  let doc = load_document(&args.services)?;

  let issues = mapping_issues(&doc.services);

  let mut missing_images: Vec<String> = Vec::new();
  if args.registry {
    let probe = HttpRegistry::new();
    // Check every record that already carries a tag.
    let selection: Selection = doc.services.keys().cloned().collect();

    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    match rt.block_on(verify_registry(&doc.services, &selection, &probe)) {
      Ok(()) => {}
      Err(ValidateError::MissingImages { references }) => missing_images = references,
      Err(other) => return Err(other.into()),
    }
  }

  if args.format.is_json() {
    let payload = serde_json::json!({
      "services": doc.services.len(),
      "issues": issues.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
      "missing_images": missing_images,
    });
    print_json(&payload)?;
  } else {
    for issue in &issues {
      print_warning(&issue.to_string());
    }
    for reference in &missing_images {
      print_error(&format!("not in registry: {reference}"));
    }
    if issues.is_empty() && missing_images.is_empty() {
      print_success(&format!(
        "Verified {} service(s): mapping is consistent",
        doc.services.len()
      ));
    }
  }

  if !issues.is_empty() || !missing_images.is_empty() {
    std::process::exit(1);
  }

  Ok(())
}
