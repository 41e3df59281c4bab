//! Task flow job
//!
//! [`TaskFlowJob`] owns an ordered list of uniquely named tasks plus the
//! job-level attributes written to the descriptor root.
//!
//! # Example
//!
//! ```
//! use jobdesc::model::job::TaskFlowJob;
//! use jobdesc::model::script::SimpleScript;
//! use jobdesc::model::task::Task;
//!
//! let mut job = TaskFlowJob::new("Hello World Job");
//! job.add_task(Task::script(SimpleScript::inline("groovy", "println 'hi'")))?;
//!
//! assert_eq!(job.tasks()[0].name(), "task_1");
//! # Ok::<(), jobdesc::error::JobError>(())
//! ```

use indexmap::IndexMap;
use log::debug;

use super::common::{CommonAttributes, JobPriority};
use super::task::{Dependency, Task, TaskId};
use super::variables::{verify_variable_map, JobVariable};
use crate::error::{JobError, MAX_NAME_LENGTH};
use crate::substitution::{substitute, substitute_map};

/// Name carried by jobs that were never named.
pub const DEFAULT_JOB_NAME: &str = "Default Job Name (Not Set)";

/// A job made of a flow of tasks.
#[derive(Debug, Clone)]
pub struct TaskFlowJob {
    name: String,
    description: Option<String>,
    project_name: Option<String>,
    priority: JobPriority,
    input_space: Option<String>,
    output_space: Option<String>,
    global_space: Option<String>,
    user_space: Option<String>,
    visualization: Option<String>,
    variables: IndexMap<String, JobVariable>,
    unresolved_variables: IndexMap<String, JobVariable>,
    common: CommonAttributes,
    tasks: Vec<Task>,
}

impl Default for TaskFlowJob {
    fn default() -> Self {
        Self {
            name: DEFAULT_JOB_NAME.to_string(),
            description: None,
            project_name: None,
            priority: JobPriority::default(),
            input_space: None,
            output_space: None,
            global_space: None,
            user_space: None,
            visualization: None,
            variables: IndexMap::new(),
            unresolved_variables: IndexMap::new(),
            common: CommonAttributes::new(),
            tasks: Vec::new(),
        }
    }
}

impl TaskFlowJob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn project_name(&self) -> Option<&str> {
        self.project_name.as_deref()
    }

    pub fn set_project_name(&mut self, project: impl Into<String>) {
        self.project_name = Some(project.into());
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: JobPriority) {
        self.priority = priority;
    }

    pub fn input_space(&self) -> Option<&str> {
        self.input_space.as_deref()
    }

    pub fn set_input_space(&mut self, url: impl Into<String>) {
        self.input_space = Some(url.into());
    }

    pub fn output_space(&self) -> Option<&str> {
        self.output_space.as_deref()
    }

    pub fn set_output_space(&mut self, url: impl Into<String>) {
        self.output_space = Some(url.into());
    }

    pub fn global_space(&self) -> Option<&str> {
        self.global_space.as_deref()
    }

    pub fn set_global_space(&mut self, url: impl Into<String>) {
        self.global_space = Some(url.into());
    }

    pub fn user_space(&self) -> Option<&str> {
        self.user_space.as_deref()
    }

    pub fn set_user_space(&mut self, url: impl Into<String>) {
        self.user_space = Some(url.into());
    }

    /// Workflow drawing (SVG), carried as opaque text.
    pub fn visualization(&self) -> Option<&str> {
        self.visualization.as_deref()
    }

    pub fn set_visualization(&mut self, svg: impl Into<String>) {
        self.visualization = Some(svg.into());
    }

    pub fn common(&self) -> &CommonAttributes {
        &self.common
    }

    pub fn common_mut(&mut self) -> &mut CommonAttributes {
        &mut self.common
    }

    pub fn variables(&self) -> &IndexMap<String, JobVariable> {
        &self.variables
    }

    /// Replaces the job variables; rejected maps leave the old ones in place.
    pub fn set_variables(&mut self, variables: IndexMap<String, JobVariable>) -> Result<(), JobError> {
        verify_variable_map(&variables)?;
        self.variables = variables;
        Ok(())
    }

    pub fn add_variable(&mut self, variable: JobVariable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    /// Variables as written by the user, before any substitution.
    pub fn unresolved_variables(&self) -> &IndexMap<String, JobVariable> {
        &self.unresolved_variables
    }

    pub fn set_unresolved_variables(
        &mut self,
        variables: IndexMap<String, JobVariable>,
    ) -> Result<(), JobError> {
        verify_variable_map(&variables)?;
        self.unresolved_variables = variables;
        Ok(())
    }

    /// Adds a task at the end of the flow.
    ///
    /// An unnamed task is renamed `task_<n>`, `n` being its 1-based
    /// position. Fails when the name is already taken or too long.
    pub fn add_task(&mut self, mut task: Task) -> Result<(), JobError> {
        if task.has_default_name() {
            task.assign_positional_name(self.tasks.len() + 1);
        }
        if task.name().chars().count() > MAX_NAME_LENGTH {
            return Err(JobError::NameTooLong {
                kind: "Task name",
                name: task.name().to_string(),
            });
        }
        if self.task(task.name()).is_some() {
            return Err(JobError::DuplicateTaskName(task.name().to_string()));
        }

        debug!("Adding task '{}' to job '{}'", task.name(), self.name);
        self.tasks.push(task);
        Ok(())
    }

    /// Adds several tasks, stopping at the first rejected one.
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = Task>) -> Result<(), JobError> {
        for task in tasks {
            self.add_task(task)?;
        }
        Ok(())
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name() == name)
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn task_by_id(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    /// Task of this job a dependency points at.
    pub fn resolve_dependency(&self, dependency: &Dependency) -> Option<&Task> {
        match dependency {
            Dependency::Task { id, .. } => self.task_by_id(*id),
            Dependency::Named(name) => self.task(name),
        }
    }

    /// Current names of the upstream tasks of `task`, in dependency order.
    ///
    /// A dependency on a task outside the job keeps its last known name.
    pub fn dependency_names<'a>(&'a self, task: &'a Task) -> Vec<&'a str> {
        task.dependencies()
            .iter()
            .map(|dependency| match self.resolve_dependency(dependency) {
                Some(upstream) => upstream.name(),
                None => {
                    debug!(
                        "Task '{}' depends on '{}', which is not part of job '{}'",
                        task.name(),
                        dependency.reference(),
                        self.name
                    );
                    dependency.reference()
                }
            })
            .collect()
    }

    /// Checks that every dependency points at a task of this job.
    pub fn check_dependencies(&self) -> Result<(), JobError> {
        for task in &self.tasks {
            for dependency in task.dependencies() {
                if self.resolve_dependency(dependency).is_none() {
                    return Err(JobError::UnknownDependency {
                        task: task.name().to_string(),
                        reference: dependency.reference().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Job generic information with variable references replaced.
    pub fn resolved_generic_information(&self) -> Result<IndexMap<String, String>, JobError> {
        let values: IndexMap<String, String> = self
            .variables
            .iter()
            .map(|(name, var)| (name.clone(), var.value.clone()))
            .collect();
        substitute_map(self.common.generic_information(), &values)
    }

    /// Generic information seen by one task: job entries overridden by the
    /// task's own, resolved against the task's effective variables.
    pub fn resolved_task_generic_information(
        &self,
        task_name: &str,
    ) -> Option<Result<IndexMap<String, String>, JobError>> {
        let task = self.task(task_name)?;
        let values = task.effective_variables(&self.variables);

        let mut merged = self.common.generic_information().clone();
        for (key, value) in task.common().generic_information() {
            merged.insert(key.clone(), value.clone());
        }

        let resolved = merged
            .into_iter()
            .map(|(key, value)| -> Result<(String, String), JobError> {
                let value = substitute(&value, &values)?;
                Ok((key, value))
            })
            .collect();
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::script::SimpleScript;
    use crate::model::variables::{variable_map, TaskVariable};

    fn task(name: Option<&str>) -> Task {
        let task = Task::script(SimpleScript::inline("groovy", "1"));
        match name {
            Some(name) => task.with_name(name).unwrap(),
            None => task,
        }
    }

    #[test]
    fn test_new_job_defaults() {
        let job = TaskFlowJob::default();
        assert_eq!(job.name(), DEFAULT_JOB_NAME);
        assert_eq!(job.priority(), JobPriority::Normal);
        assert!(job.is_empty());
        assert!(job.project_name().is_none());
    }

    #[test]
    fn test_unnamed_tasks_get_positional_names() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(task(Some("first"))).unwrap();
        job.add_task(task(None)).unwrap();
        job.add_task(task(None)).unwrap();

        let names: Vec<&str> = job.tasks().iter().map(Task::name).collect();
        assert_eq!(names, vec!["first", "task_2", "task_3"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(task(Some("a"))).unwrap();
        assert_eq!(
            job.add_task(task(Some("a"))),
            Err(JobError::DuplicateTaskName("a".to_string()))
        );
        assert_eq!(job.len(), 1);
    }

    #[test]
    fn test_positional_name_collision_rejected() {
        let mut job = TaskFlowJob::new("job");
        job.add_task(task(Some("task_2"))).unwrap();
        assert!(matches!(
            job.add_task(task(None)),
            Err(JobError::DuplicateTaskName(name)) if name == "task_2"
        ));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut job = TaskFlowJob::new("job");
        job.add_tasks(["z", "a", "m"].iter().map(|n| task(Some(n)))).unwrap();
        let names: Vec<&str> = job.tasks().iter().map(Task::name).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        assert!(job.task("a").is_some());
        assert!(job.task("b").is_none());
    }

    #[test]
    fn test_set_variables_rejects_mismatch() {
        let mut job = TaskFlowJob::new("job");
        job.set_variables(variable_map(vec![JobVariable::new("a", "1")]))
            .unwrap();

        let mut bad = IndexMap::new();
        bad.insert("x".to_string(), JobVariable::new("y", "2"));
        assert!(matches!(
            job.set_variables(bad),
            Err(JobError::VariableNameMismatch { .. })
        ));
        assert!(job.variables().contains_key("a"));
    }

    #[test]
    fn test_check_dependencies() {
        let mut job = TaskFlowJob::new("job");
        let a = task(Some("a"));
        let mut b = task(Some("b"));
        b.add_dependence(&a);
        job.add_task(a).unwrap();
        job.add_task(b).unwrap();
        assert!(job.check_dependencies().is_ok());

        let mut c = task(Some("c"));
        c.add_dependence_on("ghost");
        job.add_task(c).unwrap();
        assert_eq!(
            job.check_dependencies(),
            Err(JobError::UnknownDependency {
                task: "c".to_string(),
                reference: "ghost".to_string(),
            })
        );
    }

    #[test]
    fn test_dependency_on_unnamed_task_gets_positional_name() {
        let mut job = TaskFlowJob::new("job");
        let first = task(None);
        let mut second = task(None);
        second.add_dependence(&first);
        job.add_task(first).unwrap();
        job.add_task(second).unwrap();

        assert_eq!(job.dependency_names(&job.tasks()[1]), ["task_1"]);
        assert!(job.check_dependencies().is_ok());
    }

    #[test]
    fn test_dependency_follows_rename() {
        let mut job = TaskFlowJob::new("job");
        let mut a = task(Some("a"));
        let mut b = task(Some("b"));
        b.add_dependence(&a);
        a.set_name("a2").unwrap();
        job.add_task(a).unwrap();
        job.add_task(b).unwrap();

        assert_eq!(job.dependency_names(job.task("b").unwrap()), ["a2"]);
        assert!(job.check_dependencies().is_ok());
    }

    #[test]
    fn test_dependency_outside_job() {
        let mut job = TaskFlowJob::new("job");
        let outsider = task(Some("outsider"));
        let mut t = task(Some("t"));
        t.add_dependence(&outsider);
        t.add_dependence_on("later");
        job.add_task(t).unwrap();

        assert_eq!(job.dependency_names(job.task("t").unwrap()), ["outsider", "later"]);
        assert_eq!(
            job.check_dependencies(),
            Err(JobError::UnknownDependency {
                task: "t".to_string(),
                reference: "outsider".to_string(),
            })
        );
    }

    #[test]
    fn test_resolved_generic_information() {
        let mut job = TaskFlowJob::new("job");
        job.add_variable(JobVariable::new("QUEUE", "cpu"));
        job.common_mut()
            .add_generic_information("queue", "${QUEUE}")
            .unwrap();
        job.common_mut()
            .add_generic_information("owner", "ops")
            .unwrap();

        let mut t = task(Some("t"));
        t.add_variable(TaskVariable::new("QUEUE", "gpu"));
        t.common_mut()
            .add_generic_information("owner", "ml")
            .unwrap();
        job.add_task(t).unwrap();

        let resolved = job.resolved_generic_information().unwrap();
        assert_eq!(resolved["queue"], "cpu");

        let for_task = job.resolved_task_generic_information("t").unwrap().unwrap();
        assert_eq!(for_task["queue"], "gpu");
        assert_eq!(for_task["owner"], "ml");

        assert!(job.resolved_task_generic_information("missing").is_none());
    }

    #[test]
    fn test_cyclic_generic_information_fails() {
        let mut job = TaskFlowJob::new("job");
        job.add_variable(JobVariable::new("A", "${B}"));
        job.add_variable(JobVariable::new("B", "${A}"));
        job.common_mut()
            .add_generic_information("loop", "${A}")
            .unwrap();

        assert!(matches!(
            job.resolved_generic_information(),
            Err(JobError::InfiniteInterpolation(_))
        ));
    }
}
