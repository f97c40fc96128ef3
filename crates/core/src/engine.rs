//! End-to-end pipeline: normalize → select → resolve → validate → write.
//!
//! Data flows strictly forward through the five stages; there is no
//! feedback loop and no persisted state between runs. Any violated
//! invariant aborts the run before the writer executes, so a
//! partially-correct document is never persisted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::lookup::TagLookup;
use crate::model::ServicesDoc;
use crate::normalize::{NormalizeError, parse_document};
use crate::report::{Summary, WriteError, write_document, write_summary};
use crate::resolve::{ResolveError, resolve_tags};
use crate::select::{SelectError, SelectStrategy, Selection};
use crate::validate::{RegistryProbe, ValidateError, validate, verify_registry};

/// Concurrent pinning lookups per run, unless overridden.
pub const DEFAULT_PARALLELISM: usize = 4;

/// Errors from any stage of the pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("failed to read services document '{path}': {source}")]
  ReadDocument {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("services document '{path}' is not valid JSON: {source}")]
  ParseDocument {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error(transparent)]
  Normalize(#[from] NormalizeError),

  #[error(transparent)]
  Select(#[from] SelectError),

  #[error(transparent)]
  Resolve(#[from] ResolveError),

  #[error(transparent)]
  Validate(#[from] ValidateError),

  #[error(transparent)]
  Write(#[from] WriteError),
}

/// One resolution run.
#[derive(Debug)]
pub struct RunRequest<'a> {
  /// The services document to read.
  pub services_path: &'a Path,
  /// Where to write the resolved document; defaults to in-place.
  pub out_path: Option<&'a Path>,
  /// Where to write the machine-readable summary, if anywhere.
  pub summary_path: Option<&'a Path>,
  /// Tag to assign to selected services.
  pub desired_tag: Option<&'a str>,
  /// Bound on concurrent pinning lookups.
  pub parallelism: usize,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
  pub doc: ServicesDoc,
  pub selection: Selection,
  pub summary: Summary,
}

/// Read and normalize a services document from disk.
pub fn load_document(path: &Path) -> Result<ServicesDoc, EngineError> {
  let body = std::fs::read_to_string(path).map_err(|source| EngineError::ReadDocument {
    path: path.to_path_buf(),
    source,
  })?;
  let value = serde_json::from_str(&body).map_err(|source| EngineError::ParseDocument {
    path: path.to_path_buf(),
    source,
  })?;
  Ok(parse_document(value)?)
}

/// Run the full pipeline and write the resolved document.
///
/// `probe` enables the optional registry-existence check for selected
/// services; pass `None` to skip it.
pub async fn run(
  request: &RunRequest<'_>,
  strategy: &dyn SelectStrategy,
  lookup: Arc<dyn TagLookup>,
  probe: Option<&dyn RegistryProbe>,
) -> Result<RunOutcome, EngineError> {
  let mut doc = load_document(request.services_path)?;
  info!(
    path = %request.services_path.display(),
    services = doc.services.len(),
    "loaded services document"
  );

  let selection = strategy.select(&doc.services)?;

  resolve_tags(
    &mut doc.services,
    &selection,
    request.desired_tag,
    lookup,
    request.parallelism,
  )
  .await?;

  let serialized = serde_json::to_value(&doc.services).map_err(WriteError::Serialize)?;
  validate(&doc.services, &serialized)?;

  if let Some(probe) = probe {
    verify_registry(&doc.services, &selection, probe).await?;
  }

  let out_path = request.out_path.unwrap_or(request.services_path);
  write_document(&doc, out_path)?;

  let summary = Summary::new(&doc.services, &selection);
  if let Some(summary_path) = request.summary_path {
    write_summary(&summary, summary_path)?;
  }

  info!(
    updated = summary.updated_count,
    pinned = doc.services.len() - summary.updated_count,
    "resolution complete"
  );

  Ok(RunOutcome {
    doc,
    selection,
    summary,
  })
}
