//! Job Definition Data Model
//!
//! Serde mirror of the job builder API, read from YAML or JSON.
//!
//! # Example YAML Format
//!
//! ```yaml
//! name: nightly_report
//! priority: high
//! variables:
//!   - name: DAY
//!     value: "2024-01-01"
//! tasks:
//!   - name: extract
//!     command: /opt/bin/extract --day ${DAY}
//!     walltime: 600000
//!
//!   - name: report
//!     depends: extract
//!     precious_result: true
//!     script:
//!       engine: groovy
//!       code: println "report for " + variables.get("DAY")
//! ```

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::variables::{JobVariable, TaskVariable};

/// Top-level job definition.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct JobDefinition {
    /// Job name; the placeholder name is used when absent
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub project_name: Option<String>,

    /// idle, lowest, low, normal, high or highest
    #[serde(default)]
    pub priority: Option<String>,

    #[serde(flatten)]
    pub common: CommonDefinition,

    #[serde(default)]
    pub input_space: Option<String>,

    #[serde(default)]
    pub output_space: Option<String>,

    #[serde(default)]
    pub global_space: Option<String>,

    #[serde(default)]
    pub user_space: Option<String>,

    /// SVG drawing of the workflow
    #[serde(default)]
    pub visualization: Option<String>,

    #[serde(default)]
    pub variables: Vec<JobVariable>,

    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
}

/// Attributes shared by jobs and tasks.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CommonDefinition {
    /// cancelJob, suspendTask, pauseJob, continueJobExecution or none
    #[serde(default)]
    pub on_task_error: Option<String>,

    #[serde(default)]
    pub max_number_of_execution: Option<i64>,

    /// anywhere or elsewhere
    #[serde(default)]
    pub restart_task_on_error: Option<String>,

    /// Milliseconds
    #[serde(default)]
    pub task_retry_delay: Option<i64>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub generic_information: IndexMap<String, String>,
}

/// One task. Exactly one of `command` and `script` must be given.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TaskDefinition {
    /// Positional name (`task_<n>`) when absent
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub tag: Option<String>,

    /// Native command line, as a list or a whitespace separated string
    #[serde(deserialize_with = "command_line", default)]
    pub command: Option<Vec<String>>,

    #[serde(default)]
    pub script: Option<ScriptDefinition>,

    /// Names of the tasks this one waits for, in binding order
    #[serde(deserialize_with = "single_or_vec", default)]
    pub depends: Vec<String>,

    #[serde(flatten)]
    pub common: CommonDefinition,

    /// Milliseconds
    #[serde(default)]
    pub walltime: Option<i64>,

    #[serde(default)]
    pub run_as_me: Option<bool>,

    #[serde(default)]
    pub fork: Option<bool>,

    #[serde(default)]
    pub precious_result: Option<bool>,

    #[serde(default)]
    pub precious_logs: Option<bool>,

    #[serde(default)]
    pub variables: Vec<TaskVariable>,

    #[serde(default)]
    pub input_files: Vec<FilesDefinition>,

    #[serde(default)]
    pub output_files: Vec<FilesDefinition>,

    #[serde(default)]
    pub parallel: Option<ParallelDefinition>,

    #[serde(default)]
    pub selection: Vec<SelectionDefinition>,

    #[serde(default)]
    pub fork_environment: Option<ForkDefinition>,

    #[serde(default)]
    pub pre: Option<ScriptDefinition>,

    #[serde(default)]
    pub post: Option<ScriptDefinition>,

    #[serde(default)]
    pub cleaning: Option<ScriptDefinition>,

    /// none, start or end
    #[serde(default)]
    pub flow_block: Option<String>,

    #[serde(default)]
    pub flow: Option<FlowDefinition>,
}

/// Script given inline or by URL; inline code wins when both are set.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScriptDefinition {
    #[serde(alias = "language")]
    pub engine: String,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(deserialize_with = "single_or_vec", default)]
    pub parameters: Vec<String>,

    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct SelectionDefinition {
    #[serde(flatten)]
    pub script: ScriptDefinition,

    /// Static scripts (the default) may have their result cached
    #[serde(default)]
    pub dynamic: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FilesDefinition {
    #[serde(deserialize_with = "single_or_vec", default)]
    pub includes: Vec<String>,

    #[serde(deserialize_with = "single_or_vec", default)]
    pub excludes: Vec<String>,

    /// e.g. transferFromInputSpace, cacheFromUserSpace, transferToOutputSpace
    #[serde(default)]
    pub access_mode: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ParallelDefinition {
    pub nodes: i64,

    #[serde(default)]
    pub topology: Option<TopologyDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TopologyDefinition {
    Arbitrary,
    BestProximity,
    ThresholdProximity { threshold: i64 },
    SingleHost,
    SingleHostExclusive,
    MultipleHostsExclusive,
    DifferentHostsExclusive,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ForkDefinition {
    #[serde(default)]
    pub java_home: Option<String>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub system_environment: IndexMap<String, String>,

    #[serde(default)]
    pub jvm_arguments: Vec<String>,

    #[serde(default)]
    pub additional_classpath: Vec<String>,

    #[serde(default)]
    pub pre_java_command: Vec<String>,

    #[serde(default)]
    pub env_script: Option<ScriptDefinition>,

    #[serde(default)]
    pub docker_windows_to_linux: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FlowDefinition {
    /// continue, if, loop or replicate; anything else means continue
    #[serde(rename = "type", default)]
    pub action: String,

    pub script: ScriptDefinition,

    #[serde(default)]
    pub target: Option<String>,

    #[serde(default)]
    pub target_else: Option<String>,

    #[serde(default)]
    pub target_continuation: Option<String>,

    #[serde(default)]
    pub cron: Option<String>,
}

/// Deserializes either a single string or array of strings into Vec<String>
fn single_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(arr) => arr
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(de::Error::custom("Expected string in array")),
            })
            .collect(),
        _ => Err(de::Error::custom("Expected string or array of strings")),
    }
}

/// A command line is either a list of words or one string split on whitespace
fn command_line<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.split_whitespace().map(str::to_string).collect())),
        Value::Array(arr) => arr
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(de::Error::custom("Expected string in command line")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Err(de::Error::custom("Expected string or array of strings")),
    }
}
