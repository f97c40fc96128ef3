//! Image reference parsing.

use thiserror::Error;

/// Registry used when a reference names no host.
pub const DEFAULT_REGISTRY: &str = "registry-1.docker.io";

#[derive(Debug, Error)]
#[error("invalid image reference '{reference}'")]
pub struct ParseImageError {
  pub reference: String,
}

/// A tagless image reference split into registry host and repository.
///
/// `ghcr.io/org/api` → host `ghcr.io`, repository `org/api`. A first path
/// component is treated as a host when it looks like one (contains a dot or
/// a port, or is `localhost`), matching the docker CLI's rule. Bare
/// single-component references default to the Docker Hub `library/`
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
  pub registry: String,
  pub repository: String,
}

impl ImageRef {
  pub fn parse(reference: &str) -> Result<Self, ParseImageError> {
    if reference.is_empty() || reference.contains(char::is_whitespace) {
      return Err(ParseImageError {
        reference: reference.to_string(),
      });
    }

    let (registry, repository) = match reference.split_once('/') {
      Some((first, rest)) if looks_like_host(first) => (first.to_string(), rest.to_string()),
      Some(_) => (DEFAULT_REGISTRY.to_string(), reference.to_string()),
      None => (DEFAULT_REGISTRY.to_string(), format!("library/{reference}")),
    };

    if repository.is_empty() {
      return Err(ParseImageError {
        reference: reference.to_string(),
      });
    }

    Ok(Self {
      registry,
      repository,
    })
  }
}

fn looks_like_host(component: &str) -> bool {
  component == "localhost" || component.contains('.') || component.contains(':')
}
