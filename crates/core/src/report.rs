//! Serialization of the resolved document and the run summary.
//!
//! The writer only ever emits the canonical object-map shape, whatever
//! shape the input arrived in. Alongside the document it produces the
//! [`Summary`]: read-only projections (updated count, updated keys, the
//! updated subset of the map) for downstream consumers that act on just the
//! changed services. Projections never feed back into the canonical map.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::model::{ServiceKey, ServiceMap, ServicesDoc};
use crate::select::Selection;

/// Errors raised while writing outputs.
#[derive(Debug, Error)]
pub enum WriteError {
  #[error("failed to serialize services document: {0}")]
  Serialize(#[from] serde_json::Error),

  #[error("failed to write '{path}': {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Machine-readable projections of one run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
  /// How many services received the desired tag.
  pub updated_count: usize,
  /// The selected keys, sorted.
  pub updated_keys: Vec<ServiceKey>,
  /// The selected subset of the canonical map.
  pub updated_services: ServiceMap,
}

impl Summary {
  pub fn new(services: &ServiceMap, selection: &Selection) -> Self {
    let updated_services: ServiceMap = services
      .iter()
      .filter(|(key, _)| selection.contains(*key))
      .map(|(key, record)| (key.clone(), record.clone()))
      .collect();

    Self {
      updated_count: updated_services.len(),
      updated_keys: updated_services.keys().cloned().collect(),
      updated_services,
    }
  }
}

/// Build the on-disk JSON value for a document (always Shape A).
pub fn document_value(doc: &ServicesDoc) -> Result<Value, WriteError> {
  let mut fields = doc.rest.clone();
  fields.insert("services".to_string(), serde_json::to_value(&doc.services)?);
  Ok(Value::Object(fields))
}

/// Write the resolved document to `path`, pretty-printed.
pub fn write_document(doc: &ServicesDoc, path: &Path) -> Result<(), WriteError> {
  let value = document_value(doc)?;
  write_json(&value, path)?;
  info!(path = %path.display(), services = doc.services.len(), "wrote services document");
  Ok(())
}

/// Write the run summary to `path`.
pub fn write_summary(summary: &Summary, path: &Path) -> Result<(), WriteError> {
  let value = serde_json::to_value(summary)?;
  write_json(&value, path)?;
  info!(path = %path.display(), updated = summary.updated_count, "wrote run summary");
  Ok(())
}

fn write_json(value: &Value, path: &Path) -> Result<(), WriteError> {
  let mut body = serde_json::to_string_pretty(value)?;
  body.push('\n');
  std::fs::write(path, body).map_err(|source| WriteError::Io {
    path: path.to_path_buf(),
    source,
  })
}
