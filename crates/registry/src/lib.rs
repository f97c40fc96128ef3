//! tagpin-registry: image existence checks.
//!
//! Implements the engine's [`tagpin_core::RegistryProbe`] boundary over the
//! registry HTTP API, so a run can refuse to ship a tag that was assigned
//! but never actually pushed.

pub mod image;
pub mod probe;

pub use image::{ImageRef, ParseImageError};
pub use probe::HttpRegistry;
