//! tagpin-core: the service image tag resolution engine.
//!
//! Given a generated services document and the set of images built this
//! run, the engine decides which services receive the new tag and pins
//! every other service to the tag currently deployed in production:
//! - `normalize`: fold the four supported `services` encodings into one
//!   canonical object map
//! - `select`: choose the services to update (build-artifact or dispatch
//!   strategy)
//! - `resolve`: assign the desired tag to selected services and live-query
//!   current tags for the rest
//! - `validate`: enforce the shape and non-empty-tag invariants before
//!   anything reaches disk
//! - `report`: write the canonical document and the run summary
//!
//! Collaborator boundaries ([`lookup::TagLookup`],
//! [`validate::RegistryProbe`]) are narrow traits so the engine tests with
//! fakes; real implementations live in `tagpin-ecs` and `tagpin-registry`.

pub mod engine;
pub mod lookup;
pub mod model;
pub mod normalize;
pub mod report;
pub mod resolve;
pub mod select;
pub mod validate;

pub use engine::{DEFAULT_PARALLELISM, EngineError, RunOutcome, RunRequest, load_document, run};
pub use lookup::{LookupError, TagLookup};
pub use model::{ServiceKey, ServiceMap, ServiceRecord, ServicesDoc};
pub use normalize::{NormalizeError, Shape, normalize, parse_document};
pub use report::{Summary, WriteError};
pub use resolve::{ResolveError, resolve_tags};
pub use select::{
  ApplicationFilter, BuildArtifactSet, BuildArtifactStrategy, DispatchStrategy, SelectError,
  SelectStrategy, Selection,
};
pub use validate::{
  MappingIssue, ProbeError, RegistryProbe, ValidateError, mapping_issues, validate,
  verify_registry,
};
