//! Job and task variables.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// A named variable declared at job level.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct JobVariable {
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// Type/validation model understood by the scheduler portal (e.g. `PA:Integer`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub advanced: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl JobVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// A variable declared on a task.
///
/// When `job_inherited` is set the task takes the job-level value of the
/// same name, if one exists, instead of its own.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskVariable {
    #[serde(flatten)]
    pub variable: JobVariable,
    #[serde(default)]
    pub job_inherited: bool,
}

impl TaskVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variable: JobVariable::new(name, value),
            job_inherited: false,
        }
    }

    pub fn inherited(mut self) -> Self {
        self.job_inherited = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.variable.name
    }

    pub fn value(&self) -> &str {
        &self.variable.value
    }
}

/// Anything stored in a variable map keyed by its own name.
pub trait NamedVariable {
    fn variable_name(&self) -> &str;
}

impl NamedVariable for JobVariable {
    fn variable_name(&self) -> &str {
        &self.name
    }
}

impl NamedVariable for TaskVariable {
    fn variable_name(&self) -> &str {
        self.name()
    }
}

/// Checks that every entry of `map` is stored under its own name.
pub fn verify_variable_map<V: NamedVariable>(map: &IndexMap<String, V>) -> Result<(), JobError> {
    for (key, variable) in map {
        if key != variable.variable_name() {
            return Err(JobError::VariableNameMismatch {
                key: key.clone(),
                name: variable.variable_name().to_string(),
            });
        }
    }
    Ok(())
}

/// Builds a correctly keyed map from a list of variables.
pub fn variable_map<V: NamedVariable>(variables: impl IntoIterator<Item = V>) -> IndexMap<String, V> {
    variables
        .into_iter()
        .map(|v| (v.variable_name().to_string(), v))
        .collect()
}

/// Like [`variable_map`], but a name declared twice is an error.
pub fn unique_variable_map<V: NamedVariable>(
    variables: impl IntoIterator<Item = V>,
) -> Result<IndexMap<String, V>, JobError> {
    let mut map = IndexMap::new();
    for variable in variables {
        let name = variable.variable_name().to_string();
        if map.contains_key(&name) {
            return Err(JobError::DuplicateVariableName(name));
        }
        map.insert(name, variable);
    }
    Ok(map)
}
