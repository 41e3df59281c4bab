//! Job Definition Module
//!
//! Reads job definitions written in YAML or JSON and turns them into
//! [`TaskFlowJob`](crate::model::TaskFlowJob)s.
//!
//! # Structure
//!
//! - [`model`]: Serde types of the definition format
//! - [`loader`]: File loading and job construction

pub mod loader;
pub mod model;

pub use loader::{build_job, load_job, parse_definition, DefinitionFormat};
pub use model::{JobDefinition, ScriptDefinition, TaskDefinition};
