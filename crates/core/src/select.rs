//! Selection of the services that receive the new image tag this run.
//!
//! Exactly one of two strategies runs per invocation, chosen by the caller
//! from the trigger that started the run:
//!
//! - [`BuildArtifactStrategy`] (CI build trigger): a service is selected iff
//!   the basename of its `container_image` is among the images built this
//!   run. An empty artifact set, or a set that matches nothing, means the
//!   CI-to-deploy mapping is broken and the run must fail rather than
//!   proceed as a silent no-op.
//! - [`DispatchStrategy`] (operator dispatch): selection is scoped by an
//!   application filter, or empty when the operator asked for an infra-only
//!   run. An application matching zero services is a valid (deliberately
//!   narrow) selection here, unlike the automatic strategy.
//!
//! Every strategy guarantees its selection is a subset of the map's keys.

use std::collections::BTreeSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::model::{ServiceKey, ServiceMap};

/// Keys selected to receive the desired tag.
pub type Selection = BTreeSet<ServiceKey>;

/// Errors raised while computing a selection.
#[derive(Debug, Error)]
pub enum SelectError {
  /// Could not read the built-images file.
  #[error("failed to read built images from '{path}': {source}")]
  ReadArtifacts {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The CI build produced no images at all.
  #[error("build artifact set is empty: no images were built this run")]
  EmptyArtifactSet,

  /// No service's image basename matched any built image.
  #[error(
    "no services matched the build artifact set \
     ({artifacts} built image(s) against {services} service(s)); \
     the CI-to-deploy image mapping is broken"
  )]
  NoMatches { artifacts: usize, services: usize },
}

/// A selection strategy: which keys get the new tag.
pub trait SelectStrategy {
  fn select(&self, services: &ServiceMap) -> Result<Selection, SelectError>;
}

/// The set of image basenames built by CI this run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArtifactSet {
  images: BTreeSet<String>,
}

impl BuildArtifactSet {
  pub fn new(images: impl IntoIterator<Item = String>) -> Self {
    Self {
      images: images.into_iter().collect(),
    }
  }

  /// Parse a newline-delimited list of image basenames.
  ///
  /// Blank lines and `#` comments are ignored.
  pub fn from_reader(reader: impl BufRead) -> std::io::Result<Self> {
    let mut images = BTreeSet::new();
    for line in reader.lines() {
      let line = line?;
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      images.insert(line.to_string());
    }
    Ok(Self { images })
  }

  pub fn from_path(path: &Path) -> Result<Self, SelectError> {
    let file = std::fs::File::open(path).map_err(|source| SelectError::ReadArtifacts {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_reader(std::io::BufReader::new(file)).map_err(|source| SelectError::ReadArtifacts {
      path: path.to_path_buf(),
      source,
    })
  }

  pub fn len(&self) -> usize {
    self.images.len()
  }

  pub fn is_empty(&self) -> bool {
    self.images.is_empty()
  }

  pub fn contains(&self, basename: &str) -> bool {
    self.images.contains(basename)
  }
}

/// Automatic strategy: select services whose image was rebuilt this run.
#[derive(Debug, Clone)]
pub struct BuildArtifactStrategy {
  artifacts: BuildArtifactSet,
}

impl BuildArtifactStrategy {
  pub fn new(artifacts: BuildArtifactSet) -> Self {
    Self { artifacts }
  }
}

impl SelectStrategy for BuildArtifactStrategy {
  fn select(&self, services: &ServiceMap) -> Result<Selection, SelectError> {
    if self.artifacts.is_empty() {
      return Err(SelectError::EmptyArtifactSet);
    }

    let selection: Selection = services
      .iter()
      .filter(|(_, record)| self.artifacts.contains(record.image_basename()))
      .map(|(key, _)| key.clone())
      .collect();

    if selection.is_empty() {
      return Err(SelectError::NoMatches {
        artifacts: self.artifacts.len(),
        services: services.len(),
      });
    }

    debug!(
      selected = selection.len(),
      artifacts = self.artifacts.len(),
      "selected services by build artifacts"
    );
    Ok(selection)
  }
}

/// Application scope of a manual dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationFilter {
  /// Every service, regardless of application.
  All,
  /// Only services whose `application` field matches.
  Named(String),
}

impl ApplicationFilter {
  /// Parse the dispatch input: the literal `all`, or an application name.
  pub fn parse(value: &str) -> Self {
    if value == "all" {
      ApplicationFilter::All
    } else {
      ApplicationFilter::Named(value.to_string())
    }
  }
}

/// Manual strategy: operator-dispatched runs scoped by application.
#[derive(Debug, Clone)]
pub struct DispatchStrategy {
  /// When false the run is infra-only and nothing is selected.
  pub update_images: bool,
  pub filter: ApplicationFilter,
}

impl DispatchStrategy {
  pub fn new(update_images: bool, filter: ApplicationFilter) -> Self {
    Self {
      update_images,
      filter,
    }
  }
}

impl SelectStrategy for DispatchStrategy {
  fn select(&self, services: &ServiceMap) -> Result<Selection, SelectError> {
    if !self.update_images {
      // Infra-only run: an empty selection is intended, not an error.
      debug!("image updates disabled, selecting nothing");
      return Ok(Selection::new());
    }

    let selection: Selection = match &self.filter {
      ApplicationFilter::All => services.keys().cloned().collect(),
      ApplicationFilter::Named(app) => services
        .iter()
        .filter(|(_, record)| record.application == *app)
        .map(|(key, _)| key.clone())
        .collect(),
    };

    debug!(
      selected = selection.len(),
      filter = ?self.filter,
      "selected services by dispatch scope"
    );
    Ok(selection)
  }
}
