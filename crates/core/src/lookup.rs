//! The live infrastructure-state collaborator boundary.
//!
//! Pinned services keep the tag that is currently running in production,
//! which only the infrastructure itself knows. [`TagLookup`] is the narrow
//! seam the resolver queries for it; the real implementation (cluster and
//! task-definition inspection) lives in `tagpin-ecs`, and tests substitute
//! an in-memory fake.
//!
//! Failures are deliberately not retried here. A transient error surfaces
//! as fatal so an ambiguous tag can never reach the deployment tool; any
//! retry policy belongs inside the collaborator, not the engine.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::ServiceKey;

/// Errors from a live-tag lookup, each naming the failing detail.
#[derive(Debug, Error)]
pub enum LookupError {
  /// The deployed service could not be found in the cluster.
  #[error("service '{deployed_name}' not found in cluster '{cluster}'")]
  ServiceNotFound {
    deployed_name: String,
    cluster: String,
  },

  /// The service exists but has no usable task definition.
  #[error("no active task definition for service '{deployed_name}'")]
  TaskDefinitionMissing { deployed_name: String },

  /// The running image reference carries no tag component.
  #[error("cannot parse a tag out of image reference '{image}'")]
  UnparsableImage { image: String },

  /// The backend query itself failed (subprocess, network, decoding).
  #[error("infrastructure query failed: {message}")]
  Backend { message: String },
}

/// Query interface for the currently-deployed tag of a service.
#[async_trait]
pub trait TagLookup: Send + Sync {
  /// Return the tag currently running in production for `key`.
  async fn current_tag(&self, key: &ServiceKey) -> Result<String, LookupError>;
}

/// In-memory lookup used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
  tags: std::collections::BTreeMap<ServiceKey, String>,
}

impl StaticLookup {
  pub fn new(tags: impl IntoIterator<Item = (ServiceKey, String)>) -> Self {
    Self {
      tags: tags.into_iter().collect(),
    }
  }
}

#[async_trait]
impl TagLookup for StaticLookup {
  async fn current_tag(&self, key: &ServiceKey) -> Result<String, LookupError> {
    self
      .tags
      .get(key)
      .cloned()
      .ok_or_else(|| LookupError::ServiceNotFound {
        deployed_name: key.to_string(),
        cluster: "static".to_string(),
      })
  }
}
