//! Core data model for the tag resolution engine.
//!
//! The central structure is the [`ServiceMap`]: an ordered mapping from
//! [`ServiceKey`] to [`ServiceRecord`], built fresh each run from the
//! on-disk services document and discarded after the final write. Keys use
//! the composite `application::name` form so that two applications sharing
//! a service name never collide in the same map.
//!
//! # Ordering
//!
//! Uses [`BTreeMap`] to ensure deterministic serialization order. Key order
//! carries no semantic meaning; the deployment tool treats `services` as an
//! unordered object map.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between the application and service components of a key.
pub const KEY_SEPARATOR: &str = "::";

/// Composite service identifier, conventionally `application::name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceKey(pub String);

impl ServiceKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The application component, when the key uses the composite form.
  pub fn application(&self) -> Option<&str> {
    self.0.split_once(KEY_SEPARATOR).map(|(app, _)| app)
  }

  /// The service-name component, when the key uses the composite form.
  pub fn name(&self) -> Option<&str> {
    self.0.split_once(KEY_SEPARATOR).map(|(_, name)| name)
  }
}

impl fmt::Display for ServiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ServiceKey {
  fn from(s: &str) -> Self {
    Self(s.to_string())
  }
}

/// One service entry in the canonical map.
///
/// `container_image` and `application` are set upstream at generation time
/// and never modified here. `image_tag` is the one field this engine
/// mutates; it must be present and non-empty by the time the document is
/// written. Every other field (cpu, memory, alb config, env, ...) is opaque
/// to the engine and passes through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
  /// Registry path of the image, without a tag.
  pub container_image: String,

  /// Tag to deploy. Mutated by the resolver; `None` or empty is rejected
  /// by validation before the write.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub image_tag: Option<String>,

  /// Owning application; drives the manual selection filter.
  #[serde(default)]
  pub application: String,

  /// Passthrough fields preserved verbatim.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ServiceRecord {
  /// Final path component of `container_image`.
  ///
  /// `ghcr.io/org/api` → `api`. Matched against the build artifact set by
  /// the automatic selection strategy.
  pub fn image_basename(&self) -> &str {
    self
      .container_image
      .rsplit('/')
      .next()
      .unwrap_or(&self.container_image)
  }

  /// Whether the record carries a usable (non-empty) tag.
  pub fn has_tag(&self) -> bool {
    self.image_tag.as_deref().is_some_and(|t| !t.is_empty())
  }
}

/// The canonical mapping from service key to record.
pub type ServiceMap = BTreeMap<ServiceKey, ServiceRecord>;

/// The on-disk services document.
///
/// Only the `services` value is interpreted; every other top-level field is
/// carried through to the output untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicesDoc {
  /// The canonical map parsed out of the `services` field.
  pub services: ServiceMap,

  /// Remaining top-level fields, preserved verbatim.
  pub rest: Map<String, Value>,
}

impl ServicesDoc {
  pub fn new(services: ServiceMap) -> Self {
    Self {
      services,
      rest: Map::new(),
    }
  }
}
