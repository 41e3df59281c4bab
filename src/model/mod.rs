//! Job Model Module
//!
//! In-memory representation of a task flow job, built through a fail-fast
//! builder API and consumed read-only by the descriptor writer.
//!
//! # Structure
//!
//! - [`common`]: Attributes shared by jobs and tasks (error policy, retries, generic information)
//! - [`variables`]: Job and task variables
//! - [`script`]: Scripts and selection scripts
//! - [`flow`]: Flow scripts and control-flow actions
//! - [`fork`]: Forked process configuration
//! - [`parallel`]: Multi-node reservations and topologies
//! - [`dataspace`]: Input/output file selectors
//! - [`task`]: Tasks
//! - [`job`]: Task flow jobs

pub mod common;
pub mod dataspace;
pub mod flow;
pub mod fork;
pub mod job;
pub mod parallel;
pub mod script;
pub mod task;
pub mod variables;

pub use common::{CommonAttributes, JobPriority, OnTaskError, RestartMode};
pub use dataspace::{FileSelector, InputAccessMode, InputSelector, OutputAccessMode, OutputSelector};
pub use flow::{FlowAction, FlowActionType, FlowBlock, FlowScript};
pub use fork::ForkEnvironment;
pub use job::TaskFlowJob;
pub use parallel::{ParallelEnvironment, TopologyDescriptor};
pub use script::{Script, ScriptSource, SelectionScript, SimpleScript};
pub use task::{Dependency, Executable, Task, TaskId};
pub use variables::{JobVariable, TaskVariable};
