//! Job descriptor writer
//!
//! [`Job2XmlTransformer`] walks a [`TaskFlowJob`] and writes the XML job
//! descriptor for one schema version. Element and attribute order follow
//! the schema; attributes that were never set on the model are left out.
//!
//! Output is deterministic: the same job always produces the same bytes.
//!
//! # Example
//!
//! ```
//! use jobdesc::descriptor::Job2XmlTransformer;
//! use jobdesc::model::job::TaskFlowJob;
//! use jobdesc::model::script::SimpleScript;
//! use jobdesc::model::task::Task;
//!
//! let mut job = TaskFlowJob::new("Hello World Job");
//! let mut task = Task::script(SimpleScript::inline("groovy", "println 'Hello World'"))
//!     .with_name("hello_task")?;
//! task.set_precious_result(true);
//! job.add_task(task)?;
//!
//! let xml = Job2XmlTransformer::new().transform(&job)?;
//! assert!(xml.contains(r#"<task name="hello_task" preciousResult="true">"#));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info, warn};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use super::duration::format_duration;
use super::schema::Schema;
use super::tags::{XmlAttribute, XmlTag, XSI_NAMESPACE};
use crate::error::DescriptorError;
use crate::model::dataspace::FileSelector;
use crate::model::flow::{FlowActionType, FlowBlock, FlowScript};
use crate::model::fork::ForkEnvironment;
use crate::model::job::TaskFlowJob;
use crate::model::parallel::{ParallelEnvironment, TopologyDescriptor};
use crate::model::script::{Script, ScriptCore};
use crate::model::task::{Executable, Task};
use crate::model::variables::JobVariable;

const INDENT_SIZE: usize = 4;

/// Writes job descriptors for a fixed schema version.
#[derive(Debug, Clone, Copy)]
pub struct Job2XmlTransformer {
    schema: &'static Schema,
}

impl Default for Job2XmlTransformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Job2XmlTransformer {
    /// Transformer targeting the latest schema.
    pub fn new() -> Self {
        Self {
            schema: Schema::latest(),
        }
    }

    pub fn with_schema(schema: &'static Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Renders the descriptor as a string.
    pub fn transform(&self, job: &TaskFlowJob) -> Result<String, DescriptorError> {
        let mut buffer = Vec::new();
        self.write_to(job, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Writes the descriptor to `out`.
    ///
    /// I/O errors are returned as they come; nothing is retried.
    pub fn write_to<W: Write>(&self, job: &TaskFlowJob, out: W) -> Result<(), DescriptorError> {
        info!(
            "Writing descriptor for job '{}' ({} tasks, schema {})",
            job.name(),
            job.len(),
            self.schema.version()
        );

        let mut writer = DescriptorWriter::new(out);
        writer.declaration()?;
        writer.job(job, self.schema)?;
        writer.finish()
    }

    /// Writes the descriptor to a file, creating or truncating it.
    pub fn write_to_file<P: AsRef<Path>>(
        &self,
        job: &TaskFlowJob,
        path: P,
    ) -> Result<(), DescriptorError> {
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        self.write_to(job, &mut out)?;
        out.flush()?;

        debug!("Descriptor written to {}", path.display());
        Ok(())
    }
}

/// Ordered attribute list of one element.
#[derive(Default)]
struct Attributes<'a> {
    entries: Vec<(XmlAttribute, Cow<'a, str>)>,
}

impl<'a> Attributes<'a> {
    fn new() -> Self {
        Self::default()
    }

    fn with(mut self, name: XmlAttribute, value: impl Into<Cow<'a, str>>) -> Self {
        self.entries.push((name, value.into()));
        self
    }

    fn with_opt<V: Into<Cow<'a, str>>>(self, name: XmlAttribute, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    fn with_flag(self, name: XmlAttribute, value: Option<bool>) -> Self {
        self.with_opt(name, value.map(|v| v.to_string()))
    }

    fn into_start(self, tag: XmlTag) -> BytesStart<'static> {
        let mut start = BytesStart::new(tag.as_str());
        for (name, value) in &self.entries {
            start.push_attribute((name.as_str(), value.as_ref()));
        }
        start
    }
}

/// Event-level writer holding the element helpers.
struct DescriptorWriter<W: Write> {
    xml: Writer<W>,
}

impl<W: Write> DescriptorWriter<W> {
    fn new(out: W) -> Self {
        Self {
            xml: Writer::new_with_indent(out, b' ', INDENT_SIZE),
        }
    }

    fn declaration(&mut self) -> Result<(), DescriptorError> {
        self.xml
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn finish(mut self) -> Result<(), DescriptorError> {
        let out = self.xml.get_mut();
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    fn start(&mut self, tag: XmlTag, attributes: Attributes<'_>) -> Result<(), DescriptorError> {
        self.xml.write_event(Event::Start(attributes.into_start(tag)))?;
        Ok(())
    }

    fn end(&mut self, tag: XmlTag) -> Result<(), DescriptorError> {
        self.xml.write_event(Event::End(BytesEnd::new(tag.as_str())))?;
        Ok(())
    }

    fn empty(&mut self, tag: XmlTag, attributes: Attributes<'_>) -> Result<(), DescriptorError> {
        self.xml.write_event(Event::Empty(attributes.into_start(tag)))?;
        Ok(())
    }

    /// Writes `text` as CDATA, splitting it around every `]]>`.
    fn cdata(&mut self, text: &str) -> Result<(), DescriptorError> {
        let mut rest = text;
        while let Some(pos) = rest.find("]]>") {
            self.xml
                .write_event(Event::CData(BytesCData::new(&rest[..pos + 2])))?;
            rest = &rest[pos + 2..];
        }
        self.xml.write_event(Event::CData(BytesCData::new(rest)))?;
        Ok(())
    }

    fn cdata_element(
        &mut self,
        tag: XmlTag,
        attributes: Attributes<'_>,
        text: &str,
    ) -> Result<(), DescriptorError> {
        self.start(tag, attributes)?;
        self.cdata(text)?;
        self.end(tag)
    }

    fn job(&mut self, job: &TaskFlowJob, schema: &Schema) -> Result<(), DescriptorError> {
        let common = job.common();
        let attributes = Attributes::new()
            .with(XmlAttribute::Xmlns, schema.namespace())
            .with(XmlAttribute::XmlnsXsi, XSI_NAMESPACE)
            .with(XmlAttribute::SchemaLocation, schema.schema_location())
            .with_opt(XmlAttribute::ProjectName, job.project_name())
            .with(XmlAttribute::Priority, job.priority().as_str())
            .with_opt(
                XmlAttribute::OnTaskError,
                common.on_task_error().map(|p| p.as_str()),
            )
            .with_opt(
                XmlAttribute::MaxNumberOfExecution,
                common.max_number_of_execution().map(|n| n.to_string()),
            )
            .with(XmlAttribute::Name, job.name())
            .with_opt(
                XmlAttribute::RestartTaskOnError,
                common.restart_task_on_error().map(|m| m.as_str()),
            )
            .with_opt(
                XmlAttribute::TaskRetryDelay,
                common.task_retry_delay().map(format_duration),
            );
        self.start(XmlTag::Job, attributes)?;

        let variables = if job.unresolved_variables().is_empty() {
            job.variables()
        } else {
            job.unresolved_variables()
        };
        self.variables(variables.values().map(|v| (v, None)))?;

        if let Some(description) = job.description() {
            self.cdata_element(XmlTag::Description, Attributes::new(), description)?;
        }
        self.generic_information(common.generic_information())?;

        let spaces = [
            (XmlTag::InputSpace, job.input_space()),
            (XmlTag::OutputSpace, job.output_space()),
            (XmlTag::GlobalSpace, job.global_space()),
            (XmlTag::UserSpace, job.user_space()),
        ];
        for (tag, url) in spaces {
            if let Some(url) = url {
                self.empty(tag, Attributes::new().with(XmlAttribute::Url, url))?;
            }
        }

        self.start(XmlTag::TaskFlow, Attributes::new())?;
        for task in job.tasks() {
            self.task(job, task)?;
        }
        self.end(XmlTag::TaskFlow)?;

        if let Some(svg) = job.visualization() {
            self.start(XmlTag::Metadata, Attributes::new())?;
            self.cdata_element(XmlTag::Visualization, Attributes::new(), svg)?;
            self.end(XmlTag::Metadata)?;
        }

        self.end(XmlTag::Job)
    }

    /// `inherited` is `Some` for task variables only.
    fn variables<'v>(
        &mut self,
        variables: impl ExactSizeIterator<Item = (&'v JobVariable, Option<bool>)>,
    ) -> Result<(), DescriptorError> {
        if variables.len() == 0 {
            return Ok(());
        }
        self.start(XmlTag::Variables, Attributes::new())?;
        for (variable, inherited) in variables {
            let attributes = Attributes::new()
                .with(XmlAttribute::Name, variable.name.as_str())
                .with(XmlAttribute::Value, variable.value.as_str())
                .with_flag(XmlAttribute::Inherited, inherited)
                .with_opt(XmlAttribute::Model, variable.model.as_deref())
                .with_opt(XmlAttribute::Description, variable.description.as_deref())
                .with_opt(XmlAttribute::Group, variable.group.as_deref())
                .with(XmlAttribute::Advanced, variable.advanced.to_string())
                .with(XmlAttribute::Hidden, variable.hidden.to_string());
            self.empty(XmlTag::Variable, attributes)?;
        }
        self.end(XmlTag::Variables)
    }

    fn generic_information(&mut self, info: &IndexMap<String, String>) -> Result<(), DescriptorError> {
        if info.is_empty() {
            return Ok(());
        }
        self.start(XmlTag::GenericInformation, Attributes::new())?;
        for (name, value) in info {
            let attributes = Attributes::new()
                .with(XmlAttribute::Name, name.as_str())
                .with(XmlAttribute::Value, value.as_str());
            self.empty(XmlTag::Info, attributes)?;
        }
        self.end(XmlTag::GenericInformation)
    }

    fn task(&mut self, job: &TaskFlowJob, task: &Task) -> Result<(), DescriptorError> {
        debug!("Writing task '{}'", task.name());

        let common = task.common();
        let attributes = Attributes::new()
            .with_opt(
                XmlAttribute::OnTaskError,
                common.on_task_error().map(|p| p.as_str()),
            )
            .with_opt(
                XmlAttribute::MaxNumberOfExecution,
                common.max_number_of_execution().map(|n| n.to_string()),
            )
            .with(XmlAttribute::Name, task.name())
            .with_opt(
                XmlAttribute::RestartTaskOnError,
                common.restart_task_on_error().map(|m| m.as_str()),
            )
            .with_opt(
                XmlAttribute::TaskRetryDelay,
                common.task_retry_delay().map(format_duration),
            )
            .with_opt(XmlAttribute::Walltime, task.walltime().map(format_duration))
            .with_flag(XmlAttribute::RunAsMe, task.run_as_me())
            .with_flag(XmlAttribute::Fork, task.fork())
            .with_flag(XmlAttribute::PreciousResult, task.precious_result())
            .with_flag(XmlAttribute::PreciousLogs, task.precious_logs());
        self.start(XmlTag::Task, attributes)?;

        if let Some(description) = task.description() {
            self.cdata_element(XmlTag::Description, Attributes::new(), description)?;
        }

        let variables = if task.unresolved_variables().is_empty() {
            task.variables()
        } else {
            task.unresolved_variables()
        };
        self.variables(
            variables
                .values()
                .map(|v| (&v.variable, Some(v.job_inherited))),
        )?;
        self.generic_information(common.generic_information())?;

        if task.has_dependencies() {
            self.start(XmlTag::Depends, Attributes::new())?;
            for reference in job.dependency_names(task) {
                self.empty(XmlTag::Task, Attributes::new().with(XmlAttribute::Ref, reference))?;
            }
            self.end(XmlTag::Depends)?;
        }

        if !task.input_files().is_empty() {
            self.start(XmlTag::InputFiles, Attributes::new())?;
            for selector in task.input_files() {
                self.files(&selector.files, selector.mode.map(|m| m.as_str()))?;
            }
            self.end(XmlTag::InputFiles)?;
        }

        if let Some(parallel) = task.parallel_environment() {
            self.parallel(parallel)?;
        }

        if !task.selection_scripts().is_empty() {
            self.start(XmlTag::Selection, Attributes::new())?;
            for script in task.selection_scripts() {
                let kind = if script.is_dynamic() { "dynamic" } else { "static" };
                self.script(script, Attributes::new().with(XmlAttribute::Type, kind))?;
            }
            self.end(XmlTag::Selection)?;
        }

        if let Some(fork) = task.fork_environment() {
            self.fork_environment(fork)?;
        }

        if let Some(pre) = task.pre_script() {
            self.wrapped_script(XmlTag::Pre, pre)?;
        }

        self.executable(task)?;
        self.control_flow(task)?;

        if let Some(post) = task.post_script() {
            self.wrapped_script(XmlTag::Post, post)?;
        }
        if let Some(cleaning) = task.cleaning_script() {
            self.wrapped_script(XmlTag::Cleaning, cleaning)?;
        }

        if !task.output_files().is_empty() {
            self.start(XmlTag::OutputFiles, Attributes::new())?;
            for selector in task.output_files() {
                self.files(&selector.files, selector.mode.map(|m| m.as_str()))?;
            }
            self.end(XmlTag::OutputFiles)?;
        }

        self.end(XmlTag::Task)
    }

    /// Only the first include and first exclude patterns are written.
    fn files(&mut self, files: &FileSelector, mode: Option<&str>) -> Result<(), DescriptorError> {
        let attributes = Attributes::new()
            .with_opt(XmlAttribute::Includes, files.first_include())
            .with_opt(XmlAttribute::Excludes, files.first_exclude())
            .with_opt(XmlAttribute::AccessMode, mode);
        self.empty(XmlTag::Files, attributes)
    }

    fn parallel(&mut self, parallel: &ParallelEnvironment) -> Result<(), DescriptorError> {
        let attributes = Attributes::new().with(
            XmlAttribute::NumberOfNodes,
            parallel.nodes_number().to_string(),
        );

        let Some(topology) = parallel.topology() else {
            return self.empty(XmlTag::Parallel, attributes);
        };

        self.start(XmlTag::Parallel, attributes)?;
        self.start(XmlTag::Topology, Attributes::new())?;
        let (tag, attributes) = match topology {
            TopologyDescriptor::Arbitrary => (XmlTag::Arbitrary, Attributes::new()),
            TopologyDescriptor::BestProximity => (XmlTag::BestProximity, Attributes::new()),
            TopologyDescriptor::ThresholdProximity { threshold } => (
                XmlTag::ThresholdProximity,
                Attributes::new().with(XmlAttribute::Threshold, threshold.to_string()),
            ),
            TopologyDescriptor::SingleHost => (XmlTag::SingleHost, Attributes::new()),
            TopologyDescriptor::SingleHostExclusive => {
                (XmlTag::SingleHostExclusive, Attributes::new())
            }
            TopologyDescriptor::MultipleHostsExclusive => {
                (XmlTag::MultipleHostsExclusive, Attributes::new())
            }
            TopologyDescriptor::DifferentHostsExclusive => {
                (XmlTag::DifferentHostsExclusive, Attributes::new())
            }
        };
        self.empty(tag, attributes)?;
        self.end(XmlTag::Topology)?;
        self.end(XmlTag::Parallel)
    }

    fn fork_environment(&mut self, fork: &ForkEnvironment) -> Result<(), DescriptorError> {
        let attributes = Attributes::new()
            .with_opt(XmlAttribute::WorkingDir, fork.working_dir())
            .with_opt(XmlAttribute::JavaHome, fork.java_home());

        let has_children = !fork.system_environment().is_empty()
            || !fork.jvm_arguments().is_empty()
            || !fork.additional_classpath().is_empty()
            || fork.env_script().is_some();
        if !has_children {
            return self.empty(XmlTag::ForkEnvironment, attributes);
        }

        self.start(XmlTag::ForkEnvironment, attributes)?;

        if !fork.system_environment().is_empty() {
            self.start(XmlTag::SystemEnvironment, Attributes::new())?;
            for (name, value) in fork.system_environment() {
                let attributes = Attributes::new()
                    .with(XmlAttribute::Name, name.as_str())
                    .with(XmlAttribute::Value, value.as_str());
                self.empty(XmlTag::Variable, attributes)?;
            }
            self.end(XmlTag::SystemEnvironment)?;
        }

        if !fork.jvm_arguments().is_empty() {
            self.start(XmlTag::JvmArgs, Attributes::new())?;
            for argument in fork.jvm_arguments() {
                self.empty(
                    XmlTag::JvmArg,
                    Attributes::new().with(XmlAttribute::Value, argument.as_str()),
                )?;
            }
            self.end(XmlTag::JvmArgs)?;
        }

        if !fork.additional_classpath().is_empty() {
            self.start(XmlTag::AdditionalClasspath, Attributes::new())?;
            for path in fork.additional_classpath() {
                self.empty(
                    XmlTag::PathElement,
                    Attributes::new().with(XmlAttribute::Path, path.as_str()),
                )?;
            }
            self.end(XmlTag::AdditionalClasspath)?;
        }

        if let Some(script) = fork.env_script() {
            self.wrapped_script(XmlTag::EnvScript, script)?;
        }

        self.end(XmlTag::ForkEnvironment)
    }

    fn executable(&mut self, task: &Task) -> Result<(), DescriptorError> {
        match task.executable() {
            Executable::Native { command_line } => {
                let Some((command, arguments)) = command_line.split_first() else {
                    warn!(
                        "Task '{}' has no command line, writing an empty native executable",
                        task.name()
                    );
                    return self.empty(XmlTag::NativeExecutable, Attributes::new());
                };

                self.start(XmlTag::NativeExecutable, Attributes::new())?;
                let attributes = Attributes::new().with(XmlAttribute::Value, command.as_str());
                if arguments.is_empty() {
                    self.empty(XmlTag::StaticCommand, attributes)?;
                } else {
                    self.start(XmlTag::StaticCommand, attributes)?;
                    self.arguments(arguments)?;
                    self.end(XmlTag::StaticCommand)?;
                }
                self.end(XmlTag::NativeExecutable)
            }
            Executable::Script(script) => self.wrapped_script(XmlTag::ScriptExecutable, script),
        }
    }

    fn control_flow(&mut self, task: &Task) -> Result<(), DescriptorError> {
        let block = task.flow_block();
        let action = task.flow_script().and_then(|script| {
            let element = flow_action_element(script);
            if element.is_none() {
                debug!("Task '{}' flow script has no action, not written", task.name());
            }
            element.map(|(tag, attributes)| (script, tag, attributes))
        });

        let attributes = Attributes::new().with_opt(
            XmlAttribute::Block,
            (block != FlowBlock::None).then(|| block.as_str()),
        );

        match action {
            None if block == FlowBlock::None => Ok(()),
            None => self.empty(XmlTag::ControlFlow, attributes),
            Some((script, tag, action_attributes)) => {
                self.start(XmlTag::ControlFlow, attributes)?;
                self.start(tag, action_attributes)?;
                self.script(script, Attributes::new())?;
                self.end(tag)?;
                self.end(XmlTag::ControlFlow)
            }
        }
    }

    /// `<tag><script>...</script></tag>`
    fn wrapped_script(&mut self, tag: XmlTag, script: &dyn Script) -> Result<(), DescriptorError> {
        self.start(tag, Attributes::new())?;
        self.script(script, Attributes::new())?;
        self.end(tag)
    }

    fn script(&mut self, script: &dyn Script, attributes: Attributes<'_>) -> Result<(), DescriptorError> {
        self.start(XmlTag::Script, attributes)?;
        self.script_body(script.core())?;
        self.end(XmlTag::Script)
    }

    /// Either `<file url>` (URL without code) or `<code>`, never both.
    fn script_body(&mut self, core: &ScriptCore) -> Result<(), DescriptorError> {
        let language = core.engine_name();

        if let (None, Some(url)) = (core.code(), core.url()) {
            let attributes = Attributes::new()
                .with(XmlAttribute::Url, url)
                .with(XmlAttribute::Language, language);
            if core.parameters().is_empty() {
                return self.empty(XmlTag::File, attributes);
            }
            self.start(XmlTag::File, attributes)?;
            self.arguments(core.parameters())?;
            return self.end(XmlTag::File);
        }

        self.cdata_element(
            XmlTag::Code,
            Attributes::new().with(XmlAttribute::Language, language),
            core.code().unwrap_or_default(),
        )?;
        self.arguments(core.parameters())
    }

    fn arguments(&mut self, arguments: &[String]) -> Result<(), DescriptorError> {
        if arguments.is_empty() {
            return Ok(());
        }
        self.start(XmlTag::Arguments, Attributes::new())?;
        for argument in arguments {
            self.empty(
                XmlTag::Argument,
                Attributes::new().with(XmlAttribute::Value, argument.as_str()),
            )?;
        }
        self.end(XmlTag::Arguments)
    }
}

/// Element declaring a flow action. `continue` has none.
fn flow_action_element(script: &FlowScript) -> Option<(XmlTag, Attributes<'_>)> {
    match script.action_type() {
        FlowActionType::If => Some((
            XmlTag::If,
            Attributes::new()
                .with_opt(XmlAttribute::Target, script.target())
                .with_opt(XmlAttribute::Else, script.target_else())
                .with_opt(XmlAttribute::Continuation, script.target_continuation()),
        )),
        FlowActionType::Loop => Some((
            XmlTag::Loop,
            Attributes::new().with_opt(XmlAttribute::Target, script.target()),
        )),
        FlowActionType::Replicate => Some((XmlTag::Replicate, Attributes::new())),
        FlowActionType::Continue => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::common::{JobPriority, OnTaskError, RestartMode};
    use crate::model::dataspace::{InputAccessMode, OutputAccessMode};
    use crate::model::script::{SelectionScript, SimpleScript};
    use crate::model::variables::TaskVariable;

    fn groovy(code: &str) -> SimpleScript {
        SimpleScript::inline("groovy", code)
    }

    fn named(task: Task, name: &str) -> Task {
        task.with_name(name).unwrap()
    }

    fn render(job: &TaskFlowJob) -> String {
        Job2XmlTransformer::new().transform(job).unwrap()
    }

    fn position(xml: &str, needle: &str) -> usize {
        xml.find(needle)
            .unwrap_or_else(|| panic!("'{}' not found in:\n{}", needle, xml))
    }

    fn hello_world_job() -> TaskFlowJob {
        let mut job = TaskFlowJob::new("Hello World Job");
        let mut task = named(Task::script(groovy("println 'Hello World'")), "hello_task");
        task.set_precious_result(true);
        job.add_task(task).unwrap();
        job
    }

    #[test]
    fn test_hello_world() {
        let xml = render(&hello_world_job());

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"name="Hello World Job""#));
        assert!(xml.contains(r#"<task name="hello_task" preciousResult="true">"#));
        assert!(xml.contains(r#"<code language="groovy"><![CDATA[println 'Hello World']]></code>"#));
        assert!(position(&xml, "<scriptExecutable>") < position(&xml, "<script>"));
        assert!(position(&xml, "<script>") < position(&xml, "<code "));
        assert!(!xml.contains("<depends>"));
        assert_eq!(xml.matches("<task ").count(), 1);
    }

    #[test]
    fn test_root_attributes() {
        let mut job = hello_world_job();
        job.set_project_name("demo");
        job.set_priority(JobPriority::High);
        job.common_mut().set_task_retry_delay(65_000);

        let xml = render(&job);
        let root = &xml[position(&xml, "<job ")..position(&xml, "<taskFlow>")];

        assert!(root.contains(r#"xmlns="urn:proactive:jobdescriptor:3.12""#));
        assert!(root.contains(r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#));
        assert!(root.contains("xsi:schemaLocation=\"urn:proactive:jobdescriptor:3.12 http"));
        assert!(position(root, "xsi:schemaLocation") < position(root, "projectName="));
        assert!(position(root, "projectName=") < position(root, "priority=\"high\""));
        assert!(position(root, "priority=") < position(root, "name=\"Hello World Job\""));
        assert!(root.contains(r#"taskRetryDelay="1:05""#));
        assert!(!root.contains("onTaskError"));
        assert!(!root.contains("maxNumberOfExecution"));
    }

    #[test]
    fn test_unset_task_attributes_are_omitted() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::script(groovy("1")), "plain")).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<task name="plain">"#));
    }

    #[test]
    fn test_task_attribute_order() {
        let mut task = named(Task::native(vec!["ls".to_string()]), "t");
        task.common_mut().set_on_task_error(OnTaskError::None);
        task.common_mut().set_max_number_of_execution(3).unwrap();
        task.common_mut().set_restart_task_on_error(RestartMode::Elsewhere);
        task.set_walltime(3_723_000).unwrap();
        task.set_run_as_me(false);
        task.set_fork(true);
        task.set_precious_logs(true);

        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();
        let xml = render(&job);

        assert!(xml.contains(
            r#"<task onTaskError="none" maxNumberOfExecution="3" name="t" restartTaskOnError="elsewhere" walltime="01:02:03" runAsMe="false" fork="true" preciousLogs="true">"#
        ));
    }

    #[test]
    fn test_depends_in_call_order() {
        let mut job = TaskFlowJob::new("job");
        let a = named(Task::script(groovy("a")), "a");
        let b = named(Task::script(groovy("b")), "b");
        let c = named(Task::script(groovy("c")), "c");
        let mut sink = named(Task::script(groovy("sink")), "sink");
        sink.add_dependence(&c);
        sink.add_dependence(&a);
        sink.add_dependence(&b);
        job.add_tasks([a, b, c, sink]).unwrap();

        let xml = render(&job);
        let depends = &xml[position(&xml, "<depends>")..position(&xml, "</depends>")];
        assert!(position(depends, r#"ref="c""#) < position(depends, r#"ref="a""#));
        assert!(position(depends, r#"ref="a""#) < position(depends, r#"ref="b""#));
        assert_eq!(xml.matches("<depends>").count(), 1);
    }

    #[test]
    fn test_task_order_follows_insertion() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::script(groovy("1")), "zeta")).unwrap();
        job.add_task(named(Task::script(groovy("2")), "alpha")).unwrap();

        let xml = render(&job);
        assert!(position(&xml, r#"name="zeta""#) < position(&xml, r#"name="alpha""#));
    }

    #[test]
    fn test_idempotent() {
        let job = hello_world_job();
        let transformer = Job2XmlTransformer::new();
        assert_eq!(transformer.transform(&job).unwrap(), transformer.transform(&job).unwrap());
    }

    #[test]
    fn test_url_script_uses_file_element() {
        let script = SimpleScript::from_url("python", "http://host/s.py")
            .with_parameters(vec!["x".to_string()]);
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::script(script), "t")).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<file url="http://host/s.py" language="python">"#));
        assert!(xml.contains(r#"<argument value="x"/>"#));
        assert!(!xml.contains("<code "));
    }

    #[test]
    fn test_fetched_url_script_uses_code() {
        let mut script = SimpleScript::from_url("python", "http://host/s.py");
        script.core_mut().set_fetched_code("print(1)");
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::script(script), "t")).unwrap();

        let xml = render(&job);
        assert!(xml.contains("<![CDATA[print(1)]]>"));
        assert!(!xml.contains("<file "));
    }

    #[test]
    fn test_code_arguments_are_siblings() {
        let script = groovy("println args").with_parameters(vec!["a".to_string(), "b".to_string()]);
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::script(script), "t")).unwrap();

        let xml = render(&job);
        assert!(position(&xml, "</code>") < position(&xml, "<arguments>"));
        assert!(position(&xml, "</arguments>") < position(&xml, "</script>"));
    }

    #[test]
    fn test_native_executable() {
        let task = named(
            Task::native(vec!["/bin/echo".to_string(), "a b".to_string(), "<c>".to_string()]),
            "native",
        );
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<staticCommand value="/bin/echo">"#));
        assert!(xml.contains(r#"<argument value="a b"/>"#));
        assert!(xml.contains(r#"<argument value="&lt;c&gt;"/>"#));
    }

    #[test]
    fn test_empty_command_line_is_tolerated() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::native(Vec::new()), "empty")).unwrap();

        let xml = render(&job);
        assert!(xml.contains("<nativeExecutable/>"));
    }

    #[test]
    fn test_cdata_split() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(named(Task::script(groovy("a]]>b")), "t")).unwrap();

        let xml = render(&job);
        assert!(xml.contains("<![CDATA[a]]]]><![CDATA[>b]]>"));
    }

    #[test]
    fn test_file_selectors_write_first_patterns() {
        let mut selector = FileSelector::new("*.csv").with_exclude("tmp_*");
        selector.add_include("*.json");
        selector.add_exclude("*.bak");

        let mut task = named(Task::script(groovy("1")), "t");
        task.add_input_files(selector, InputAccessMode::TransferFromInputSpace);
        task.add_output_files(FileSelector::new("out/**"), OutputAccessMode::TransferToUserSpace);
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(
            r#"<files includes="*.csv" excludes="tmp_*" accessMode="transferFromInputSpace"/>"#
        ));
        assert!(!xml.contains("*.json"));
        assert!(xml.contains(r#"<files includes="out/**" accessMode="transferToUserSpace"/>"#));
        assert!(position(&xml, "<inputFiles>") < position(&xml, "<scriptExecutable>"));
        assert!(position(&xml, "</scriptExecutable>") < position(&xml, "<outputFiles>"));
    }

    #[test]
    fn test_parallel_topology() {
        let mut task = named(Task::native(vec!["mpirun".to_string()]), "mpi");
        task.set_parallel_environment(Some(
            ParallelEnvironment::new(4, Some(TopologyDescriptor::ThresholdProximity { threshold: 50 }))
                .unwrap(),
        ));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<parallel numberOfNodes="4">"#));
        assert!(xml.contains(r#"<thresholdProximity threshold="50"/>"#));
    }

    #[test]
    fn test_every_topology_element() {
        let cases = [
            (TopologyDescriptor::Arbitrary, "<arbitrary/>"),
            (TopologyDescriptor::BestProximity, "<bestProximity/>"),
            (
                TopologyDescriptor::ThresholdProximity { threshold: 5 },
                r#"<thresholdProximity threshold="5"/>"#,
            ),
            (TopologyDescriptor::SingleHost, "<singleHost/>"),
            (TopologyDescriptor::SingleHostExclusive, "<singleHostExclusive/>"),
            (TopologyDescriptor::MultipleHostsExclusive, "<multipleHostsExclusive/>"),
            (TopologyDescriptor::DifferentHostsExclusive, "<differentHostsExclusive/>"),
        ];

        for (topology, element) in cases {
            let mut task = named(Task::native(vec!["mpirun".to_string()]), "mpi");
            task.set_parallel_environment(Some(ParallelEnvironment::new(2, Some(topology)).unwrap()));
            let mut job = TaskFlowJob::new("job");
            job.add_task(task).unwrap();

            let xml = render(&job);
            let inner = &xml[position(&xml, "<topology>") + "<topology>".len()..position(&xml, "</topology>")];
            assert_eq!(inner.trim(), element);
        }
    }

    #[test]
    fn test_parallel_without_topology() {
        let mut task = named(Task::native(vec!["mpirun".to_string()]), "mpi");
        task.set_parallel_environment(Some(ParallelEnvironment::new(2, None).unwrap()));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<parallel numberOfNodes="2"/>"#));
        assert!(!xml.contains("<topology>"));
    }

    #[test]
    fn test_selection_scripts() {
        let mut task = named(Task::script(groovy("1")), "t");
        task.add_selection_script(SelectionScript::inline("groovy", "selected = true", false));
        task.add_selection_script(SelectionScript::inline("groovy", "selected = check()", true));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(position(&xml, r#"<script type="static">"#) < position(&xml, r#"<script type="dynamic">"#));
        assert!(position(&xml, "</selection>") < position(&xml, "<scriptExecutable>"));
    }

    #[test]
    fn test_fork_environment() {
        let mut fork = ForkEnvironment::new()
            .with_working_dir("/tmp/work")
            .with_java_home("/usr/lib/jvm")
            .with_env_script(groovy("env"));
        fork.add_system_environment_variable("PATH", "/bin");
        fork.add_jvm_argument("-Xmx1g");
        fork.add_additional_classpath("/opt/a.jar");

        let mut task = named(Task::script(groovy("1")), "t");
        task.set_fork_environment(Some(fork));
        task.set_pre_script(Some(groovy("pre")));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<forkEnvironment workingDir="/tmp/work" javaHome="/usr/lib/jvm">"#));
        assert!(position(&xml, "<SystemEnvironment>") < position(&xml, "<jvmArgs>"));
        assert!(position(&xml, "<jvmArgs>") < position(&xml, "<additionalClasspath>"));
        assert!(position(&xml, "<additionalClasspath>") < position(&xml, "<envScript>"));
        assert!(position(&xml, "</forkEnvironment>") < position(&xml, "<pre>"));
        assert!(xml.contains(r#"<pathElement path="/opt/a.jar"/>"#));
    }

    #[test]
    fn test_control_flow_if() {
        let mut task = named(Task::script(groovy("1")), "decide");
        task.set_flow_block(FlowBlock::Start);
        task.set_flow_script(Some(FlowScript::if_branch(
            groovy("branch = 'if'"),
            "A",
            "B",
            Some("C".to_string()),
        )));
        task.set_post_script(Some(groovy("post")));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<controlFlow block="start">"#));
        assert!(xml.contains(r#"<if target="A" else="B" continuation="C">"#));
        assert!(position(&xml, "</scriptExecutable>") < position(&xml, "<controlFlow"));
        assert!(position(&xml, "</controlFlow>") < position(&xml, "<post>"));
    }

    #[test]
    fn test_control_flow_loop() {
        let mut task = named(Task::script(groovy("1")), "again");
        task.set_flow_block(FlowBlock::End);
        task.set_flow_script(Some(FlowScript::loop_to(groovy("loop = true"), "start")));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        let flow = &xml[position(&xml, r#"<controlFlow block="end">"#)..position(&xml, "</controlFlow>")];
        assert!(flow.contains(r#"<loop target="start">"#));
        assert!(position(flow, "<loop ") < position(flow, "<![CDATA[loop = true]]>"));
        assert!(flow.contains("</loop>"));
        assert!(!flow.contains("<if") && !flow.contains("<replicate"));
    }

    #[test]
    fn test_control_flow_replicate() {
        let mut task = named(Task::script(groovy("1")), "split");
        task.set_flow_script(Some(FlowScript::replicate(groovy("runs = 3"))));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains("<controlFlow>"));
        let flow = &xml[position(&xml, "<controlFlow>")..position(&xml, "</controlFlow>")];
        assert!(position(flow, "<replicate>") < position(flow, "<![CDATA[runs = 3]]>"));
        assert!(flow.contains("</replicate>"));
    }

    #[test]
    fn test_post_cleaning_output_files_order() {
        let mut task = named(Task::script(groovy("1")), "t");
        task.add_output_files(FileSelector::new("*.out"), OutputAccessMode::TransferToOutputSpace);
        task.set_cleaning_script(Some(groovy("clean")));
        task.set_post_script(Some(groovy("post")));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(position(&xml, "</scriptExecutable>") < position(&xml, "<post>"));
        assert!(position(&xml, "</post>") < position(&xml, "<cleaning>"));
        assert!(position(&xml, "</cleaning>") < position(&xml, "<outputFiles>"));
        assert!(position(&xml, "</outputFiles>") < position(&xml, "</task>"));
    }

    #[test]
    fn test_depends_on_unnamed_task() {
        let first = Task::script(groovy("1"));
        let mut second = Task::script(groovy("2"));
        second.add_dependence(&first);
        let mut job = TaskFlowJob::new("job");
        job.add_tasks([first, second]).unwrap();

        let xml = render(&job);
        let depends = &xml[position(&xml, "<depends>")..position(&xml, "</depends>")];
        assert!(depends.contains(r#"<task ref="task_1"/>"#));
    }

    #[test]
    fn test_depends_after_rename() {
        let mut a = named(Task::script(groovy("a")), "a");
        let mut b = named(Task::script(groovy("b")), "b");
        b.add_dependence(&a);
        a.set_name("a2").unwrap();
        let mut job = TaskFlowJob::new("job");
        job.add_tasks([a, b]).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<task ref="a2"/>"#));
        assert!(!xml.contains(r#"ref="a""#));
    }

    #[test]
    fn test_control_flow_block_only() {
        let mut task = named(Task::script(groovy("1")), "end");
        task.set_flow_block(FlowBlock::End);
        task.set_flow_script(Some(FlowScript::continue_with(groovy("noop"))));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(r#"<controlFlow block="end"/>"#));
    }

    #[test]
    fn test_no_control_flow_without_block_or_action() {
        let mut task = named(Task::script(groovy("1")), "t");
        task.set_flow_script(Some(FlowScript::continue_with(groovy("noop"))));
        let mut job = TaskFlowJob::new("job");
        job.add_task(task).unwrap();

        assert!(!render(&job).contains("controlFlow"));
    }

    #[test]
    fn test_variables_and_generic_information() {
        let mut job = TaskFlowJob::new("job");
        job.add_variable(JobVariable::new("N", "3").with_model("PA:Integer"));
        job.common_mut().add_generic_information("queue", "${Q}").unwrap();

        let mut task = named(Task::script(groovy("1")), "t");
        task.add_variable(TaskVariable::new("N", "4").inherited());
        job.add_task(task).unwrap();

        let xml = render(&job);
        assert!(xml.contains(
            r#"<variable name="N" value="3" model="PA:Integer" advanced="false" hidden="false"/>"#
        ));
        assert!(xml.contains(
            r#"<variable name="N" value="4" inherited="true" advanced="false" hidden="false"/>"#
        ));
        assert!(xml.contains(r#"<info name="queue" value="${Q}"/>"#));
        assert!(position(&xml, "<variables>") < position(&xml, "<genericInformation>"));
    }

    #[test]
    fn test_data_spaces_and_visualization() {
        let mut job = hello_world_job();
        job.set_description("demo job");
        job.set_input_space("file:///in");
        job.set_user_space("file:///user");
        job.set_visualization("<svg/>");

        let xml = render(&job);
        assert!(xml.contains("<description><![CDATA[demo job]]></description>"));
        assert!(position(&xml, r#"<inputSpace url="file:///in"/>"#) < position(&xml, "<userSpace"));
        assert!(position(&xml, "</taskFlow>") < position(&xml, "<metadata>"));
        assert!(xml.contains("<visualization><![CDATA[<svg/>]]></visualization>"));
        assert!(!xml.contains("<outputSpace"));
    }

    #[test]
    fn test_other_schema() {
        let schema = Schema::from_version("3.8").unwrap();
        let xml = Job2XmlTransformer::with_schema(schema)
            .transform(&hello_world_job())
            .unwrap();
        assert!(xml.contains(r#"xmlns="urn:proactive:jobdescriptor:3.8""#));
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.xml");
        let job = hello_world_job();

        let transformer = Job2XmlTransformer::new();
        transformer.write_to_file(&job, &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, transformer.transform(&job).unwrap());
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("job.xml");

        let result = Job2XmlTransformer::new().write_to_file(&hello_world_job(), &path);
        assert!(matches!(result, Err(DescriptorError::Io(_))));
    }
}
