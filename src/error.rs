//! Typed errors for the job model, the descriptor writer and the
//! definition loader.
//!
//! Construction errors ([`JobError`]) are raised by the builder API at the
//! point of violation. The descriptor writer only fails on I/O
//! ([`DescriptorError`]); malformed-but-tolerated model states are logged
//! and degraded instead.

use thiserror::Error;

/// Maximum length of task names and generic information keys.
pub const MAX_NAME_LENGTH: usize = 255;

/// Errors raised while assembling a job graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Two tasks of the same job share a name
    #[error("Task '{0}' is already present in the job")]
    DuplicateTaskName(String),

    /// Task added without a name
    #[error("Task name must not be empty")]
    MissingTaskName,

    /// Name longer than [`MAX_NAME_LENGTH`]
    #[error("{kind} '{name}' exceeds {MAX_NAME_LENGTH} characters")]
    NameTooLong { kind: &'static str, name: String },

    /// Variable map entry stored under a key other than its own name
    #[error("Variable map key '{key}' does not match variable name '{name}'")]
    VariableNameMismatch { key: String, name: String },

    /// Same variable name declared twice in one list
    #[error("Variable '{0}' is declared more than once")]
    DuplicateVariableName(String),

    /// `maxNumberOfExecution` must be strictly positive
    #[error("maxNumberOfExecution must be greater than 0, got {0}")]
    InvalidMaxNumberOfExecution(i64),

    /// Walltime in milliseconds must not be negative
    #[error("Walltime must be positive or zero, got {0} ms")]
    NegativeWalltime(i64),

    /// Parallel environments need at least one node
    #[error("nodesNumber must be at least 1, got {0}")]
    InvalidNodesNumber(i64),

    /// Dependency reference not present in the job
    #[error("Task '{task}' depends on unknown task '{reference}'")]
    UnknownDependency { task: String, reference: String },

    /// Flow script result bindings could not be mapped to an action
    #[error("Invalid flow script binding: {0}")]
    InvalidFlowBinding(String),

    /// Variable references that resolve to themselves
    #[error("Infinite loop in property interpolation of '{0}'")]
    InfiniteInterpolation(String),

    /// String not matching any variant of a closed vocabulary
    #[error("Unknown {kind} value: '{value}'")]
    UnknownValue { kind: &'static str, value: String },
}

impl JobError {
    /// Create an unknown-value error for an enumerated attribute
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownValue {
            kind,
            value: value.into(),
        }
    }
}

/// Errors raised while writing a descriptor document.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error("Descriptor is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Errors raised while loading a job definition file.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("Failed to read job definition '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML job definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON job definition: {0}")]
    Json(#[from] serde_json::Error),

    /// Task with both or neither of `command` and `script`
    #[error("Task '{task}' needs exactly one of 'command' or 'script'")]
    InvalidExecutable { task: String },

    /// Script with neither `code` nor `url`
    #[error("Script of {context} needs either 'code' or 'url'")]
    MissingScriptSource { context: String },

    #[error("Invalid job definition: {0}")]
    Job(#[from] JobError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_display() {
        let err = JobError::DuplicateTaskName("t1".to_string());
        assert!(err.to_string().contains("t1"));

        let err = JobError::VariableNameMismatch {
            key: "a".to_string(),
            name: "b".to_string(),
        };
        assert!(err.to_string().contains("'a'"));
        assert!(err.to_string().contains("'b'"));

        let err = JobError::InfiniteInterpolation("x".to_string());
        assert!(err.to_string().starts_with("Infinite loop in property interpolation"));
    }

    #[test]
    fn test_unknown_value_helper() {
        let err = JobError::unknown("priority", "urgent");
        assert_eq!(err.to_string(), "Unknown priority value: 'urgent'");
    }

    #[test]
    fn test_name_too_long_mentions_limit() {
        let err = JobError::NameTooLong {
            kind: "Task name",
            name: "x".to_string(),
        };
        assert!(err.to_string().contains("255"));
    }
}
