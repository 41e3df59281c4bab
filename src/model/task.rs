//! Task model
//!
//! A [`Task`] is one unit of work in a job: either a native command line or
//! a script, decorated with dependencies, file transfers, scripts run
//! around the executable, resource requirements and flow control.
//!
//! # Example
//!
//! ```
//! use jobdesc::model::script::SimpleScript;
//! use jobdesc::model::task::Task;
//!
//! let mut prepare = Task::native(vec!["/bin/prepare.sh".to_string()]).with_name("prepare")?;
//! let mut compute = Task::script(SimpleScript::inline("groovy", "println 'hi'")).with_name("compute")?;
//! compute.add_dependence(&prepare);
//!
//! // The link survives a rename of the upstream task
//! prepare.set_name("setup")?;
//! assert!(compute.depends_on(&prepare));
//! # Ok::<(), jobdesc::error::JobError>(())
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::common::CommonAttributes;
use super::dataspace::{FileSelector, InputAccessMode, InputSelector, OutputAccessMode, OutputSelector};
use super::flow::{FlowBlock, FlowScript};
use super::fork::ForkEnvironment;
use super::parallel::ParallelEnvironment;
use super::script::{SelectionScript, SimpleScript};
use super::variables::{verify_variable_map, JobVariable, TaskVariable};
use crate::error::{JobError, MAX_NAME_LENGTH};
use crate::substitution::substitute;

/// Name carried by tasks that were never named.
pub const DEFAULT_TASK_NAME: &str = "Default Task Name (Not Set)";

/// Prefix of the names given to unnamed tasks when they join a job.
pub const TASK_NAME_IF_NOT_SET: &str = "task_";

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a task, stable across renames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity slot of a task. A cloned task is a different task.
#[derive(Debug)]
struct Identity(TaskId);

impl Clone for Identity {
    fn clone(&self) -> Self {
        Self(TaskId::next())
    }
}

/// Link from a task to one of its upstream tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    /// Upstream task held by identity; `last_name` is its name when linked
    Task { id: TaskId, last_name: String },
    /// Upstream task known only by name
    Named(String),
}

impl Dependency {
    /// Name to report when the upstream task cannot be found.
    pub fn reference(&self) -> &str {
        match self {
            Self::Task { last_name, .. } => last_name,
            Self::Named(name) => name,
        }
    }
}

/// What a task actually runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Executable {
    /// Command line; first element is the program, the rest its arguments
    Native { command_line: Vec<String> },
    /// Script run by a script engine
    Script(SimpleScript),
}

/// One unit of work of a job.
#[derive(Debug, Clone)]
pub struct Task {
    identity: Identity,
    name: String,
    description: Option<String>,
    tag: Option<String>,
    common: CommonAttributes,
    executable: Executable,
    /// Upstream tasks, in the order their results are bound
    dependencies: Vec<Dependency>,
    flow_block: FlowBlock,
    input_files: Vec<InputSelector>,
    output_files: Vec<OutputSelector>,
    parallel_environment: Option<ParallelEnvironment>,
    selection_scripts: Vec<SelectionScript>,
    pre_script: Option<SimpleScript>,
    post_script: Option<SimpleScript>,
    cleaning_script: Option<SimpleScript>,
    flow_script: Option<FlowScript>,
    fork_environment: Option<ForkEnvironment>,
    variables: IndexMap<String, TaskVariable>,
    unresolved_variables: IndexMap<String, TaskVariable>,
    walltime: Option<i64>,
    run_as_me: Option<bool>,
    fork: Option<bool>,
    precious_result: Option<bool>,
    precious_logs: Option<bool>,
}

impl Task {
    fn with_executable(executable: Executable) -> Self {
        Self {
            identity: Identity(TaskId::next()),
            name: DEFAULT_TASK_NAME.to_string(),
            description: None,
            tag: None,
            common: CommonAttributes::new(),
            executable,
            dependencies: Vec::new(),
            flow_block: FlowBlock::None,
            input_files: Vec::new(),
            output_files: Vec::new(),
            parallel_environment: None,
            selection_scripts: Vec::new(),
            pre_script: None,
            post_script: None,
            cleaning_script: None,
            flow_script: None,
            fork_environment: None,
            variables: IndexMap::new(),
            unresolved_variables: IndexMap::new(),
            walltime: None,
            run_as_me: None,
            fork: None,
            precious_result: None,
            precious_logs: None,
        }
    }

    /// Creates an unnamed task running a command line.
    pub fn native(command_line: Vec<String>) -> Self {
        Self::with_executable(Executable::Native { command_line })
    }

    /// Creates an unnamed task running a script.
    pub fn script(script: SimpleScript) -> Self {
        Self::with_executable(Executable::Script(script))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Result<Self, JobError> {
        self.set_name(name)?;
        Ok(self)
    }

    pub fn id(&self) -> TaskId {
        self.identity.0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the task.
    ///
    /// Empty names and names longer than 255 characters are rejected.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), JobError> {
        let name = name.into();
        check_task_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn has_default_name(&self) -> bool {
        self.name == DEFAULT_TASK_NAME
    }

    /// Gives an unnamed task its positional name (`task_<position>`).
    pub(crate) fn assign_positional_name(&mut self, position: usize) {
        self.name = format!("{}{}", TASK_NAME_IF_NOT_SET, position);
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = Some(tag.into());
    }

    pub fn common(&self) -> &CommonAttributes {
        &self.common
    }

    pub fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    pub fn is_native(&self) -> bool {
        matches!(self.executable, Executable::Native { .. })
    }

    pub fn command_line(&self) -> Option<&[String]> {
        match &self.executable {
            Executable::Native { command_line } => Some(command_line),
            Executable::Script(_) => None,
        }
    }

    pub fn executable_script(&self) -> Option<&SimpleScript> {
        match &self.executable {
            Executable::Script(script) => Some(script),
            Executable::Native { .. } => None,
        }
    }

    /// Appends `task` to the dependency list.
    ///
    /// The link follows the task's identity, so it may still be unnamed or
    /// renamed later. Order is kept as given. Cycles are not detected here.
    pub fn add_dependence(&mut self, task: &Task) {
        self.dependencies.push(Dependency::Task {
            id: task.id(),
            last_name: task.name.clone(),
        });
    }

    /// Appends a dependency on the task called `name`.
    ///
    /// The name is matched when the job resolves its dependencies.
    pub fn add_dependence_on(&mut self, name: impl Into<String>) {
        self.dependencies.push(Dependency::Named(name.into()));
    }

    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Whether `task` was linked through [`add_dependence`](Self::add_dependence).
    pub fn depends_on(&self, task: &Task) -> bool {
        self.dependencies
            .iter()
            .any(|d| matches!(d, Dependency::Task { id, .. } if *id == task.id()))
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    pub fn flow_block(&self) -> FlowBlock {
        self.flow_block
    }

    pub fn set_flow_block(&mut self, block: FlowBlock) {
        self.flow_block = block;
    }

    pub fn add_input_files(&mut self, files: FileSelector, mode: InputAccessMode) {
        self.input_files.push(InputSelector::new(files, mode));
    }

    pub fn add_input_selector(&mut self, selector: InputSelector) {
        self.input_files.push(selector);
    }

    pub fn input_files(&self) -> &[InputSelector] {
        &self.input_files
    }

    pub fn add_output_files(&mut self, files: FileSelector, mode: OutputAccessMode) {
        self.output_files.push(OutputSelector::new(files, mode));
    }

    pub fn add_output_selector(&mut self, selector: OutputSelector) {
        self.output_files.push(selector);
    }

    pub fn output_files(&self) -> &[OutputSelector] {
        &self.output_files
    }

    pub fn parallel_environment(&self) -> Option<&ParallelEnvironment> {
        self.parallel_environment.as_ref()
    }

    pub fn set_parallel_environment(&mut self, environment: Option<ParallelEnvironment>) {
        self.parallel_environment = environment;
    }

    /// Nodes reserved by this task; one unless a parallel environment says otherwise.
    pub fn number_of_nodes_needed(&self) -> u32 {
        self.parallel_environment
            .as_ref()
            .map_or(1, ParallelEnvironment::nodes_number)
    }

    pub fn selection_scripts(&self) -> &[SelectionScript] {
        &self.selection_scripts
    }

    pub fn add_selection_script(&mut self, script: SelectionScript) {
        self.selection_scripts.push(script);
    }

    pub fn set_selection_scripts(&mut self, scripts: Vec<SelectionScript>) {
        self.selection_scripts = scripts;
    }

    pub fn pre_script(&self) -> Option<&SimpleScript> {
        self.pre_script.as_ref()
    }

    pub fn set_pre_script(&mut self, script: Option<SimpleScript>) {
        self.pre_script = script;
    }

    pub fn post_script(&self) -> Option<&SimpleScript> {
        self.post_script.as_ref()
    }

    pub fn set_post_script(&mut self, script: Option<SimpleScript>) {
        self.post_script = script;
    }

    pub fn cleaning_script(&self) -> Option<&SimpleScript> {
        self.cleaning_script.as_ref()
    }

    pub fn set_cleaning_script(&mut self, script: Option<SimpleScript>) {
        self.cleaning_script = script;
    }

    pub fn flow_script(&self) -> Option<&FlowScript> {
        self.flow_script.as_ref()
    }

    pub fn set_flow_script(&mut self, script: Option<FlowScript>) {
        self.flow_script = script;
    }

    pub fn fork_environment(&self) -> Option<&ForkEnvironment> {
        self.fork_environment.as_ref()
    }

    pub fn set_fork_environment(&mut self, environment: Option<ForkEnvironment>) {
        self.fork_environment = environment;
    }

    pub fn variables(&self) -> &IndexMap<String, TaskVariable> {
        &self.variables
    }

    /// Replaces the task variables; rejected maps leave the old ones in place.
    pub fn set_variables(&mut self, variables: IndexMap<String, TaskVariable>) -> Result<(), JobError> {
        verify_variable_map(&variables)?;
        self.variables = variables;
        Ok(())
    }

    pub fn add_variable(&mut self, variable: TaskVariable) {
        self.variables.insert(variable.name().to_string(), variable);
    }

    pub fn unresolved_variables(&self) -> &IndexMap<String, TaskVariable> {
        &self.unresolved_variables
    }

    pub fn set_unresolved_variables(
        &mut self,
        variables: IndexMap<String, TaskVariable>,
    ) -> Result<(), JobError> {
        verify_variable_map(&variables)?;
        self.unresolved_variables = variables;
        Ok(())
    }

    /// Values visible to this task: job values, overridden by task values
    /// unless the task variable inherits an existing job value.
    pub fn effective_variables(
        &self,
        job_variables: &IndexMap<String, JobVariable>,
    ) -> IndexMap<String, String> {
        let mut values: IndexMap<String, String> = job_variables
            .iter()
            .map(|(name, var)| (name.clone(), var.value.clone()))
            .collect();
        for (name, var) in &self.variables {
            if var.job_inherited && job_variables.contains_key(name) {
                continue;
            }
            values.insert(name.clone(), var.value().to_string());
        }
        values
    }

    /// Generic information with `${...}` references replaced by variable values.
    pub fn resolved_generic_information(
        &self,
        job_variables: &IndexMap<String, JobVariable>,
    ) -> Result<IndexMap<String, String>, JobError> {
        let values = self.effective_variables(job_variables);
        self.common
            .generic_information()
            .iter()
            .map(|(key, value)| -> Result<(String, String), JobError> {
                Ok((key.clone(), substitute(value, &values)?))
            })
            .collect()
    }

    /// Maximum execution time in milliseconds.
    pub fn walltime(&self) -> Option<i64> {
        self.walltime
    }

    pub fn set_walltime(&mut self, millis: i64) -> Result<(), JobError> {
        if millis < 0 {
            return Err(JobError::NegativeWalltime(millis));
        }
        self.walltime = Some(millis);
        Ok(())
    }

    pub fn run_as_me(&self) -> Option<bool> {
        self.run_as_me
    }

    pub fn set_run_as_me(&mut self, enabled: bool) {
        self.run_as_me = Some(enabled);
    }

    pub fn fork(&self) -> Option<bool> {
        self.fork
    }

    pub fn set_fork(&mut self, enabled: bool) {
        self.fork = Some(enabled);
    }

    pub fn precious_result(&self) -> Option<bool> {
        self.precious_result
    }

    pub fn set_precious_result(&mut self, enabled: bool) {
        self.precious_result = Some(enabled);
    }

    pub fn precious_logs(&self) -> Option<bool> {
        self.precious_logs
    }

    pub fn set_precious_logs(&mut self, enabled: bool) {
        self.precious_logs = Some(enabled);
    }
}

fn check_task_name(name: &str) -> Result<(), JobError> {
    if name.trim().is_empty() {
        return Err(JobError::MissingTaskName);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(JobError::NameTooLong {
            kind: "Task name",
            name: name.to_string(),
        });
    }
    Ok(())
}
