//! Job Definition Loader
//!
//! Reads a definition file and builds the job through the model builder
//! API, so every construction error is reported at load time.

use std::fs;
use std::path::Path;

use log::{debug, info};

use super::model::{
    CommonDefinition, FilesDefinition, FlowDefinition, ForkDefinition, JobDefinition,
    ParallelDefinition, ScriptDefinition, TaskDefinition, TopologyDefinition,
};
use crate::error::DefinitionError;
use crate::model::common::CommonAttributes;
use crate::model::dataspace::{FileSelector, InputSelector, OutputSelector};
use crate::model::flow::{FlowBlock, FlowScript};
use crate::model::fork::ForkEnvironment;
use crate::model::job::TaskFlowJob;
use crate::model::parallel::{ParallelEnvironment, TopologyDescriptor};
use crate::model::script::{SelectionScript, SimpleScript};
use crate::model::task::Task;
use crate::model::variables::unique_variable_map;

/// Serialization format of a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Yaml,
    Json,
}

impl DefinitionFormat {
    /// `.json` files are JSON, everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Loads a job from a YAML or JSON definition file.
///
/// # Example
///
/// ```rust,no_run
/// use jobdesc::definition::load_job;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let job = load_job("nightly.yaml")?;
///     println!("Loaded {} tasks", job.len());
///     Ok(())
/// }
/// ```
pub fn load_job<P: AsRef<Path>>(path: P) -> Result<TaskFlowJob, DefinitionError> {
    let path = path.as_ref();
    info!("Loading job definition from: {}", path.display());

    let content = fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path.display().to_string(),
        source,
    })?;
    debug!("Definition content loaded ({} bytes)", content.len());

    let definition = parse_definition(&content, DefinitionFormat::from_path(path))?;
    let job = build_job(definition)?;

    info!("Built job '{}' with {} tasks", job.name(), job.len());
    Ok(job)
}

pub fn parse_definition(
    content: &str,
    format: DefinitionFormat,
) -> Result<JobDefinition, DefinitionError> {
    let definition = match format {
        DefinitionFormat::Yaml => serde_yaml::from_str(content)?,
        DefinitionFormat::Json => serde_json::from_str(content)?,
    };
    Ok(definition)
}

/// Builds a job from a parsed definition.
///
/// Dependencies are resolved by name once every task is in place, so a
/// task may depend on one declared after it.
pub fn build_job(definition: JobDefinition) -> Result<TaskFlowJob, DefinitionError> {
    let mut job = match definition.name {
        Some(name) => TaskFlowJob::new(name),
        None => TaskFlowJob::default(),
    };

    if let Some(description) = definition.description {
        job.set_description(description);
    }
    if let Some(project) = definition.project_name {
        job.set_project_name(project);
    }
    if let Some(priority) = definition.priority {
        job.set_priority(priority.parse()?);
    }
    apply_common(job.common_mut(), definition.common)?;

    if let Some(url) = definition.input_space {
        job.set_input_space(url);
    }
    if let Some(url) = definition.output_space {
        job.set_output_space(url);
    }
    if let Some(url) = definition.global_space {
        job.set_global_space(url);
    }
    if let Some(url) = definition.user_space {
        job.set_user_space(url);
    }
    if let Some(svg) = definition.visualization {
        job.set_visualization(svg);
    }

    job.set_variables(unique_variable_map(definition.variables)?)?;

    for (index, task_definition) in definition.tasks.into_iter().enumerate() {
        let task = build_task(task_definition, index + 1)?;
        debug!("Task '{}' built", task.name());
        job.add_task(task)?;
    }

    job.check_dependencies()?;
    Ok(job)
}

fn build_task(definition: TaskDefinition, position: usize) -> Result<Task, DefinitionError> {
    let label = definition
        .name
        .clone()
        .unwrap_or_else(|| format!("#{}", position));

    let mut task = match (definition.command, definition.script) {
        (Some(command), None) => Task::native(command),
        (None, Some(script)) => Task::script(build_script(script, &label)?),
        _ => return Err(DefinitionError::InvalidExecutable { task: label }),
    };

    if let Some(name) = definition.name {
        task.set_name(name)?;
    }
    if let Some(description) = definition.description {
        task.set_description(description);
    }
    if let Some(tag) = definition.tag {
        task.set_tag(tag);
    }

    for reference in definition.depends {
        task.add_dependence_on(reference);
    }

    apply_common(task.common_mut(), definition.common)?;

    if let Some(walltime) = definition.walltime {
        task.set_walltime(walltime)?;
    }
    if let Some(enabled) = definition.run_as_me {
        task.set_run_as_me(enabled);
    }
    if let Some(enabled) = definition.fork {
        task.set_fork(enabled);
    }
    if let Some(enabled) = definition.precious_result {
        task.set_precious_result(enabled);
    }
    if let Some(enabled) = definition.precious_logs {
        task.set_precious_logs(enabled);
    }

    task.set_variables(unique_variable_map(definition.variables)?)?;

    for files in definition.input_files {
        let (selector, mode) = build_selector(files);
        task.add_input_selector(InputSelector {
            files: selector,
            mode: mode.map(|m| m.parse()).transpose()?,
        });
    }
    for files in definition.output_files {
        let (selector, mode) = build_selector(files);
        task.add_output_selector(OutputSelector {
            files: selector,
            mode: mode.map(|m| m.parse()).transpose()?,
        });
    }

    if let Some(parallel) = definition.parallel {
        task.set_parallel_environment(Some(build_parallel(parallel)?));
    }

    for selection in definition.selection {
        let script = build_script(selection.script, &label)?;
        task.add_selection_script(SelectionScript::from_script(script, selection.dynamic));
    }

    if let Some(fork) = definition.fork_environment {
        task.set_fork_environment(Some(build_fork(fork, &label)?));
    }

    task.set_pre_script(build_optional_script(definition.pre, &label)?);
    task.set_post_script(build_optional_script(definition.post, &label)?);
    task.set_cleaning_script(build_optional_script(definition.cleaning, &label)?);

    if let Some(block) = definition.flow_block {
        task.set_flow_block(block.parse::<FlowBlock>()?);
    }
    if let Some(flow) = definition.flow {
        task.set_flow_script(Some(build_flow(flow, &label)?));
    }

    Ok(task)
}

fn apply_common(
    attributes: &mut CommonAttributes,
    definition: CommonDefinition,
) -> Result<(), DefinitionError> {
    if let Some(policy) = definition.on_task_error {
        attributes.set_on_task_error(policy.parse()?);
    }
    if let Some(count) = definition.max_number_of_execution {
        attributes.set_max_number_of_execution(count)?;
    }
    if let Some(mode) = definition.restart_task_on_error {
        attributes.set_restart_task_on_error(mode.parse()?);
    }
    if let Some(delay) = definition.task_retry_delay {
        attributes.set_task_retry_delay(delay);
    }
    if !definition.generic_information.is_empty() {
        attributes.set_generic_information(definition.generic_information)?;
    }
    Ok(())
}

fn build_script(definition: ScriptDefinition, task: &str) -> Result<SimpleScript, DefinitionError> {
    let mut script = match (definition.code, definition.url) {
        (Some(code), _) => SimpleScript::inline(definition.engine, code),
        (None, Some(url)) => SimpleScript::from_url(definition.engine, url),
        (None, None) => {
            return Err(DefinitionError::MissingScriptSource {
                context: format!("task '{}'", task),
            })
        }
    };
    script.core_mut().set_parameters(definition.parameters);
    if let Some(name) = definition.name {
        script.core_mut().set_script_name(name);
    }
    Ok(script)
}

fn build_optional_script(
    definition: Option<ScriptDefinition>,
    task: &str,
) -> Result<Option<SimpleScript>, DefinitionError> {
    definition.map(|d| build_script(d, task)).transpose()
}

fn build_selector(definition: FilesDefinition) -> (FileSelector, Option<String>) {
    let mut selector = FileSelector::default();
    for pattern in definition.includes {
        selector.add_include(pattern);
    }
    for pattern in definition.excludes {
        selector.add_exclude(pattern);
    }
    (selector, definition.access_mode)
}

fn build_parallel(definition: ParallelDefinition) -> Result<ParallelEnvironment, DefinitionError> {
    let topology = definition.topology.map(|t| match t {
        TopologyDefinition::Arbitrary => TopologyDescriptor::Arbitrary,
        TopologyDefinition::BestProximity => TopologyDescriptor::BestProximity,
        TopologyDefinition::ThresholdProximity { threshold } => {
            TopologyDescriptor::ThresholdProximity { threshold }
        }
        TopologyDefinition::SingleHost => TopologyDescriptor::SingleHost,
        TopologyDefinition::SingleHostExclusive => TopologyDescriptor::SingleHostExclusive,
        TopologyDefinition::MultipleHostsExclusive => TopologyDescriptor::MultipleHostsExclusive,
        TopologyDefinition::DifferentHostsExclusive => TopologyDescriptor::DifferentHostsExclusive,
    });
    Ok(ParallelEnvironment::new(definition.nodes, topology)?)
}

fn build_fork(definition: ForkDefinition, task: &str) -> Result<ForkEnvironment, DefinitionError> {
    let mut fork = ForkEnvironment::new();
    if let Some(java_home) = definition.java_home {
        fork = fork.with_java_home(java_home);
    }
    if let Some(working_dir) = definition.working_dir {
        fork = fork.with_working_dir(working_dir);
    }
    for (name, value) in definition.system_environment {
        fork.add_system_environment_variable(name, value);
    }
    for argument in definition.jvm_arguments {
        fork.add_jvm_argument(argument);
    }
    for entry in definition.additional_classpath {
        fork.add_additional_classpath(entry);
    }
    fork.set_pre_java_command(definition.pre_java_command);
    fork.set_env_script(build_optional_script(definition.env_script, task)?);
    fork.set_docker_windows_to_linux(definition.docker_windows_to_linux);
    Ok(fork)
}

fn build_flow(definition: FlowDefinition, task: &str) -> Result<FlowScript, DefinitionError> {
    let mut flow = FlowScript::continue_with(build_script(definition.script, task)?);
    flow.set_action_type(&definition.action);
    flow.set_target(definition.target);
    flow.set_target_else(definition.target_else);
    flow.set_target_continuation(definition.target_continuation);
    flow.set_cron_expr(definition.cron);
    Ok(flow)
}
