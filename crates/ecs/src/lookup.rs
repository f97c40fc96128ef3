//! Live-tag lookup against a running ECS cluster.
//!
//! Implements the engine's [`TagLookup`] boundary. The resolution chain for
//! one service key:
//!
//! 1. derive the deployed service name (`application::name` → `application-name`)
//! 2. `ecs describe-services` → the active task definition ARN
//! 3. `ecs describe-task-definition` → the first container's image reference
//! 4. split the tag off the image reference
//!
//! Any break in the chain fails the lookup with the offending detail; the
//! engine treats that as fatal for the whole run.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use tagpin_core::{LookupError, ServiceKey, TagLookup};

use crate::aws::{AwsCli, AwsCliError};

/// `aws ecs describe-services` response, reduced to what the lookup reads.
#[derive(Debug, Deserialize)]
struct DescribeServices {
  #[serde(default)]
  services: Vec<ServiceDescription>,
}

#[derive(Debug, Deserialize)]
struct ServiceDescription {
  #[serde(rename = "serviceName")]
  service_name: String,
  status: String,
  #[serde(rename = "taskDefinition")]
  task_definition: Option<String>,
}

/// `aws ecs describe-task-definition` response, reduced likewise.
#[derive(Debug, Deserialize)]
struct DescribeTaskDefinition {
  #[serde(rename = "taskDefinition")]
  task_definition: TaskDefinition,
}

#[derive(Debug, Deserialize)]
struct TaskDefinition {
  #[serde(rename = "containerDefinitions", default)]
  container_definitions: Vec<ContainerDefinition>,
}

#[derive(Debug, Deserialize)]
struct ContainerDefinition {
  image: String,
}

/// [`TagLookup`] backed by the AWS CLI.
#[derive(Debug, Clone)]
pub struct EcsTagLookup {
  aws: AwsCli,
  cluster: String,
}

impl EcsTagLookup {
  pub fn new(cluster: impl Into<String>, aws: AwsCli) -> Self {
    Self {
      aws,
      cluster: cluster.into(),
    }
  }

  async fn active_task_definition(&self, deployed_name: &str) -> Result<String, LookupError> {
    let response: DescribeServices = self
      .aws
      .call(&[
        "ecs",
        "describe-services",
        "--cluster",
        &self.cluster,
        "--services",
        deployed_name,
      ])
      .await
      .map_err(backend)?;

    let service = response
      .services
      .into_iter()
      .find(|s| s.service_name == deployed_name && s.status == "ACTIVE")
      .ok_or_else(|| LookupError::ServiceNotFound {
        deployed_name: deployed_name.to_string(),
        cluster: self.cluster.clone(),
      })?;

    service
      .task_definition
      .ok_or_else(|| LookupError::TaskDefinitionMissing {
        deployed_name: deployed_name.to_string(),
      })
  }

  async fn running_image(&self, deployed_name: &str, arn: &str) -> Result<String, LookupError> {
    let response: DescribeTaskDefinition = self
      .aws
      .call(&["ecs", "describe-task-definition", "--task-definition", arn])
      .await
      .map_err(backend)?;

    response
      .task_definition
      .container_definitions
      .into_iter()
      .next()
      .map(|c| c.image)
      .ok_or_else(|| LookupError::TaskDefinitionMissing {
        deployed_name: deployed_name.to_string(),
      })
  }
}

#[async_trait]
impl TagLookup for EcsTagLookup {
  async fn current_tag(&self, key: &ServiceKey) -> Result<String, LookupError> {
    let deployed_name = deployed_service_name(key);
    debug!(key = %key, deployed = %deployed_name, cluster = %self.cluster, "looking up deployed tag");

    let arn = self.active_task_definition(&deployed_name).await?;
    let image = self.running_image(&deployed_name, &arn).await?;

    let tag = image_tag(&image).ok_or_else(|| LookupError::UnparsableImage {
      image: image.clone(),
    })?;
    Ok(tag.to_string())
  }
}

fn backend(err: AwsCliError) -> LookupError {
  LookupError::Backend {
    message: err.to_string(),
  }
}

/// ECS service name for a composite key: `shop::api` → `shop-api`.
///
/// Keys without the composite separator are used verbatim.
pub fn deployed_service_name(key: &ServiceKey) -> String {
  match (key.application(), key.name()) {
    (Some(app), Some(name)) => format!("{app}-{name}"),
    _ => key.as_str().to_string(),
  }
}

/// Tag component of an image reference, if it has one.
///
/// Handles registry hosts with ports (`registry:5000/repo:tag`); digest
/// references (`repo@sha256:...`) carry no tag and return `None`.
pub fn image_tag(image: &str) -> Option<&str> {
  let repo_part = image.rsplit('/').next().unwrap_or(image);
  if repo_part.contains('@') {
    return None;
  }
  repo_part
    .rsplit_once(':')
    .map(|(_, tag)| tag)
    .filter(|tag| !tag.is_empty())
}
