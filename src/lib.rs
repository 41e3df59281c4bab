//! jobdesc - Task Flow Job Descriptors
//!
//! Builds distributed-workflow jobs in memory (tasks, scripts, resource
//! requirements and control flow) and serializes them into the versioned
//! XML job descriptor understood by the scheduler.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`model`]: Jobs, tasks, scripts and their fail-fast builder API
//! - [`descriptor`]: XML descriptor writer and schema registry
//! - [`definition`]: YAML/JSON job definition files
//! - [`substitution`]: `${name}` variable interpolation
//!
//! # Example
//!
//! ```rust
//! use jobdesc::model::{SimpleScript, Task, TaskFlowJob};
//! use jobdesc::Job2XmlTransformer;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build the job
//!     let mut job = TaskFlowJob::new("Hello World Job");
//!     let mut task = Task::script(SimpleScript::inline("groovy", "println 'Hello World'"))
//!         .with_name("hello_task")?;
//!     task.set_precious_result(true);
//!     job.add_task(task)?;
//!
//!     // Serialize it
//!     let xml = Job2XmlTransformer::new().transform(&job)?;
//!     assert!(xml.contains("hello_task"));
//!     Ok(())
//! }
//! ```

pub mod definition;
pub mod descriptor;
pub mod error;
pub mod model;
pub mod substitution;

// Re-export commonly used types
pub use definition::load_job;
pub use descriptor::{Job2XmlTransformer, Schema};
pub use error::{DefinitionError, DescriptorError, JobError};
pub use model::{Task, TaskFlowJob};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "jobdesc";
