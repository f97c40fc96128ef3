//! tagpin-ecs: the live infrastructure collaborator.
//!
//! Answers "what tag is this service running right now?" by inspecting the
//! ECS cluster through the AWS CLI. Plugs into the engine behind the
//! [`tagpin_core::TagLookup`] trait so the engine itself never touches AWS.

pub mod aws;
pub mod lookup;

pub use aws::{AwsCli, AwsCliError};
pub use lookup::{EcsTagLookup, deployed_service_name, image_tag};
