//! Job Descriptor Module
//!
//! Serializes a [`TaskFlowJob`](crate::model::TaskFlowJob) into the XML
//! job descriptor accepted by the scheduler.
//!
//! # Structure
//!
//! - [`schema`]: Known schema versions and their namespaces
//! - [`tags`]: Element and attribute vocabulary
//! - [`duration`]: Formatting of duration attributes
//! - [`transformer`]: The descriptor writer

pub mod duration;
pub mod schema;
pub mod tags;
pub mod transformer;

pub use duration::format_duration;
pub use schema::{Schema, SCHEMA_LATEST};
pub use tags::{XmlAttribute, XmlTag};
pub use transformer::Job2XmlTransformer;
