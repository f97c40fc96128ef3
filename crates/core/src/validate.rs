//! Final invariant checks between resolution and the write.
//!
//! The downstream deployment tool consumes `services` as `map(object(...))`
//! and rejects array encodings outright, so the single most important check
//! here is that the value about to be serialized really is a JSON object.
//! After that: every record must carry a non-empty tag, and (optionally)
//! every freshly assigned `image:tag` must actually exist in its registry.
//!
//! Violations name every offender, not just the first, so one failed run is
//! enough to fix all of them.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::{ServiceKey, ServiceMap};
use crate::select::Selection;

/// Errors from a registry manifest probe.
#[derive(Debug, Error)]
pub enum ProbeError {
  /// The image reference could not be split into registry and repository.
  #[error("invalid image reference '{image}'")]
  InvalidReference { image: String },

  /// The registry query failed (network, auth, unexpected status).
  #[error("registry query failed for '{image}': {message}")]
  Query { image: String, message: String },
}

/// Query interface for image existence in a container registry.
#[async_trait]
pub trait RegistryProbe: Send + Sync {
  /// Whether `image:tag` exists in its registry.
  async fn manifest_exists(&self, image: &str, tag: &str) -> Result<bool, ProbeError>;
}

/// Errors raised by validation.
#[derive(Debug, Error)]
pub enum ValidateError {
  /// The serialized `services` value is not a JSON object.
  #[error("serialized 'services' must be a JSON object, found {found}")]
  NotAnObject { found: &'static str },

  /// One or more services ended up with an empty or missing tag.
  #[error("service(s) with empty or missing image_tag: {}", .keys.iter().map(|k| k.as_str()).collect::<Vec<_>>().join(", "))]
  MissingTags { keys: Vec<ServiceKey> },

  /// One or more selected services reference an image:tag that does not
  /// exist in its registry.
  #[error("image reference(s) not found in registry: {}", .references.join(", "))]
  MissingImages { references: Vec<String> },

  /// A registry probe itself failed.
  #[error(transparent)]
  Probe(#[from] ProbeError),
}

/// Check the shape and tag invariants of a resolved map.
///
/// `serialized` is the exact `services` value about to be written; it is
/// checked rather than the typed map so the object-shape invariant holds at
/// the serialization boundary, where the deployment tool reads it.
pub fn validate(services: &ServiceMap, serialized: &Value) -> Result<(), ValidateError> {
  if !serialized.is_object() {
    let found = match serialized {
      Value::Array(_) => "array",
      Value::Null => "null",
      Value::Bool(_) => "boolean",
      Value::Number(_) => "number",
      Value::String(_) => "string",
      Value::Object(_) => unreachable!(),
    };
    return Err(ValidateError::NotAnObject { found });
  }

  let missing: Vec<ServiceKey> = services
    .iter()
    .filter(|(_, record)| !record.has_tag())
    .map(|(key, _)| key.clone())
    .collect();

  if !missing.is_empty() {
    return Err(ValidateError::MissingTags { keys: missing });
  }

  debug!(services = services.len(), "validated resolved services");
  Ok(())
}

/// Verify that every selected service's `image:tag` exists in its registry.
///
/// Distinguishes "tag assigned but the image was never pushed" from the
/// cheaper checks in [`validate`]. Probes run sequentially; the selected
/// set is small and this path is opt-in.
pub async fn verify_registry(
  services: &ServiceMap,
  selection: &Selection,
  probe: &dyn RegistryProbe,
) -> Result<(), ValidateError> {
  let mut missing = Vec::new();

  for key in selection {
    let Some(record) = services.get(key) else {
      continue;
    };
    let Some(tag) = record.image_tag.as_deref() else {
      continue;
    };

    let reference = format!("{}:{}", record.container_image, tag);
    debug!(key = %key, reference = %reference, "probing registry");

    if !probe.manifest_exists(&record.container_image, tag).await? {
      missing.push(reference);
    }
  }

  if !missing.is_empty() {
    return Err(ValidateError::MissingImages { references: missing });
  }

  Ok(())
}

/// A non-fatal inconsistency found by the standalone mapping check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingIssue {
  /// The record has no registry path to deploy from.
  MissingImage { key: ServiceKey },
  /// The record has no owning application.
  MissingApplication { key: ServiceKey },
  /// The key does not use the `application::name` composite form.
  MalformedKey { key: ServiceKey },
  /// The key's application component disagrees with the record's field.
  ApplicationMismatch {
    key: ServiceKey,
    key_application: String,
    record_application: String,
  },
}

impl std::fmt::Display for MappingIssue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      MappingIssue::MissingImage { key } => {
        write!(f, "service '{key}' has no container_image")
      }
      MappingIssue::MissingApplication { key } => {
        write!(f, "service '{key}' has no application")
      }
      MappingIssue::MalformedKey { key } => {
        write!(f, "service key '{key}' is not in 'application::name' form")
      }
      MappingIssue::ApplicationMismatch {
        key,
        key_application,
        record_application,
      } => write!(
        f,
        "service '{key}' is keyed under application '{key_application}' \
         but its record says '{record_application}'"
      ),
    }
  }
}

/// Check every record's image mapping for consistency.
///
/// Used by the standalone `verify` command; unlike [`validate`] this
/// collects issues instead of failing, so an operator sees the whole
/// picture in one pass.
pub fn mapping_issues(services: &ServiceMap) -> Vec<MappingIssue> {
  let mut issues = Vec::new();

  for (key, record) in services {
    if record.container_image.is_empty() {
      issues.push(MappingIssue::MissingImage { key: key.clone() });
    }
    if record.application.is_empty() {
      issues.push(MappingIssue::MissingApplication { key: key.clone() });
    }

    match key.application() {
      None => issues.push(MappingIssue::MalformedKey { key: key.clone() }),
      Some(app) if !record.application.is_empty() && app != record.application => {
        issues.push(MappingIssue::ApplicationMismatch {
          key: key.clone(),
          key_application: app.to_string(),
          record_application: record.application.clone(),
        });
      }
      Some(_) => {}
    }
  }

  issues
}
