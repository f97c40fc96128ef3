//! Tag resolution: assign a final `image_tag` to every service.
//!
//! Selected services receive the desired tag. Every other service is
//! pinned: its currently-deployed tag is fetched through the [`TagLookup`]
//! collaborator so a deploy never silently rolls a service back to whatever
//! stale tag the generated file happened to carry.
//!
//! Pinning lookups are independent of one another and run concurrently
//! through a [`JoinSet`] bounded by a [`Semaphore`]; the bound is a latency
//! optimization only. All lookups must succeed before any pinned tag is
//! written into the map, so a failure in one can never be masked by
//! successes in others.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::lookup::{LookupError, TagLookup};
use crate::model::{ServiceKey, ServiceMap};
use crate::select::Selection;

/// Errors raised while resolving tags.
#[derive(Debug, Error)]
pub enum ResolveError {
  /// A non-empty selection needs a tag to update to.
  #[error("{selected} service(s) selected for update but no desired tag was given")]
  MissingDesiredTag { selected: usize },

  /// A pinned service's live-tag lookup failed.
  #[error("failed to resolve current tag for '{key}': {source}")]
  Lookup {
    key: ServiceKey,
    #[source]
    source: LookupError,
  },

  /// A lookup task died before producing a result.
  #[error("tag lookup task failed: {message}")]
  TaskFailed { message: String },
}

/// Resolve a final tag for every service in the map.
///
/// Mutates `services` in place: selected keys get `desired_tag`, all other
/// keys get their live-queried current tag. On error the map is left
/// untouched; mutation happens only after every lookup has succeeded.
pub async fn resolve_tags(
  services: &mut ServiceMap,
  selection: &Selection,
  desired_tag: Option<&str>,
  lookup: Arc<dyn TagLookup>,
  parallelism: usize,
) -> Result<(), ResolveError> {
  let desired_tag = desired_tag.filter(|t| !t.is_empty());

  if !selection.is_empty() && desired_tag.is_none() {
    return Err(ResolveError::MissingDesiredTag {
      selected: selection.len(),
    });
  }

  let pinned: Vec<ServiceKey> = services
    .keys()
    .filter(|key| !selection.contains(*key))
    .cloned()
    .collect();

  debug!(
    updated = selection.len(),
    pinned = pinned.len(),
    parallelism,
    "resolving service tags"
  );

  let pinned_tags = fetch_current_tags(pinned, lookup, parallelism).await?;

  for (key, record) in services.iter_mut() {
    if selection.contains(key) {
      // Checked above: a non-empty selection always has a desired tag.
      record.image_tag = desired_tag.map(str::to_string);
    } else if let Some(tag) = pinned_tags.get(key) {
      record.image_tag = Some(tag.clone());
    }
  }

  Ok(())
}

/// Fetch current tags for the pinned keys, bounded by `parallelism`.
async fn fetch_current_tags(
  keys: Vec<ServiceKey>,
  lookup: Arc<dyn TagLookup>,
  parallelism: usize,
) -> Result<std::collections::BTreeMap<ServiceKey, String>, ResolveError> {
  let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
  let mut join_set: JoinSet<Result<(ServiceKey, String), ResolveError>> = JoinSet::new();

  for key in keys {
    let lookup = lookup.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      let _permit = semaphore.acquire().await.unwrap();

      debug!(key = %key, "querying deployed tag");
      let tag = lookup
        .current_tag(&key)
        .await
        .map_err(|source| ResolveError::Lookup {
          key: key.clone(),
          source,
        })?;

      debug!(key = %key, tag = %tag, "pinned to deployed tag");
      Ok((key, tag))
    });
  }

  let mut tags = std::collections::BTreeMap::new();
  while let Some(join_result) = join_set.join_next().await {
    match join_result {
      Ok(Ok((key, tag))) => {
        tags.insert(key, tag);
      }
      // First failure aborts the run; dropping the JoinSet cancels the rest.
      Ok(Err(e)) => return Err(e),
      Err(e) => {
        return Err(ResolveError::TaskFailed {
          message: e.to_string(),
        });
      }
    }
  }

  Ok(tags)
}
