//! Attributes shared by jobs and tasks.
//!
//! Every optional attribute is stored as an `Option`: `None` means "never
//! set", which the descriptor writer relies on to decide whether the
//! attribute is written at all. Setting a value equal to the scheduler's
//! default still counts as set.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{JobError, MAX_NAME_LENGTH};

/// Policy applied by the scheduler when a task ends in error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OnTaskError {
    CancelJob,
    SuspendTask,
    PauseJob,
    ContinueJobExecution,
    None,
}

impl OnTaskError {
    pub const ALL: [OnTaskError; 5] = [
        OnTaskError::CancelJob,
        OnTaskError::SuspendTask,
        OnTaskError::PauseJob,
        OnTaskError::ContinueJobExecution,
        OnTaskError::None,
    ];

    /// Descriptor spelling of this policy.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CancelJob => "cancelJob",
            Self::SuspendTask => "suspendTask",
            Self::PauseJob => "pauseJob",
            Self::ContinueJobExecution => "continueJobExecution",
            Self::None => "none",
        }
    }
}

impl fmt::Display for OnTaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OnTaskError {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JobError::unknown("onTaskError", s))
    }
}

/// Where a task is restarted after an error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    /// Any eligible node, including the one that failed
    Anywhere,
    /// Any eligible node except the one that failed
    Elsewhere,
}

impl RestartMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anywhere => "anywhere",
            Self::Elsewhere => "elsewhere",
        }
    }
}

impl fmt::Display for RestartMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartMode {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anywhere" => Ok(Self::Anywhere),
            "elsewhere" => Ok(Self::Elsewhere),
            _ => Err(JobError::unknown("restartTaskOnError", s)),
        }
    }
}

/// Scheduling priority of a job.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    Idle,
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

impl JobPriority {
    pub const ALL: [JobPriority; 6] = [
        JobPriority::Idle,
        JobPriority::Lowest,
        JobPriority::Low,
        JobPriority::Normal,
        JobPriority::High,
        JobPriority::Highest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Lowest => "lowest",
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Highest => "highest",
        }
    }

    /// Numeric level used by the scheduler (0 = idle, 5 = highest).
    pub fn priority(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPriority {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JobError::unknown("priority", s))
    }
}

/// Error-handling and metadata attributes carried by both jobs and tasks.
///
/// A task inherits nothing from its job here: each level only records what
/// was explicitly set on it, and the scheduler merges the two.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonAttributes {
    on_task_error: Option<OnTaskError>,
    restart_task_on_error: Option<RestartMode>,
    max_number_of_execution: Option<i64>,
    task_retry_delay: Option<i64>,
    generic_information: IndexMap<String, String>,
}

impl CommonAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_task_error(&self) -> Option<OnTaskError> {
        self.on_task_error
    }

    pub fn set_on_task_error(&mut self, policy: OnTaskError) {
        self.on_task_error = Some(policy);
    }

    pub fn restart_task_on_error(&self) -> Option<RestartMode> {
        self.restart_task_on_error
    }

    pub fn set_restart_task_on_error(&mut self, mode: RestartMode) {
        self.restart_task_on_error = Some(mode);
    }

    pub fn max_number_of_execution(&self) -> Option<i64> {
        self.max_number_of_execution
    }

    /// Sets how many times a task may run before it is considered failed.
    ///
    /// Values below 1 are rejected.
    pub fn set_max_number_of_execution(&mut self, count: i64) -> Result<(), JobError> {
        if count <= 0 {
            return Err(JobError::InvalidMaxNumberOfExecution(count));
        }
        self.max_number_of_execution = Some(count);
        Ok(())
    }

    /// Delay between two executions of a failed task, in milliseconds.
    pub fn task_retry_delay(&self) -> Option<i64> {
        self.task_retry_delay
    }

    /// A delay of zero or less means the task is restarted immediately.
    pub fn set_task_retry_delay(&mut self, millis: i64) {
        self.task_retry_delay = Some(millis);
    }

    pub fn generic_information(&self) -> &IndexMap<String, String> {
        &self.generic_information
    }

    /// Replaces the generic information map.
    ///
    /// The previous map is kept when any key is too long.
    pub fn set_generic_information(
        &mut self,
        info: IndexMap<String, String>,
    ) -> Result<(), JobError> {
        for key in info.keys() {
            check_generic_information_key(key)?;
        }
        self.generic_information = info;
        Ok(())
    }

    pub fn add_generic_information(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), JobError> {
        let key = key.into();
        check_generic_information_key(&key)?;
        self.generic_information.insert(key, value.into());
        Ok(())
    }
}

fn check_generic_information_key(key: &str) -> Result<(), JobError> {
    if key.chars().count() > MAX_NAME_LENGTH {
        return Err(JobError::NameTooLong {
            kind: "Generic information key",
            name: key.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_task_error_parse_case_insensitive() {
        assert_eq!("CANCELJOB".parse::<OnTaskError>().unwrap(), OnTaskError::CancelJob);
        assert_eq!(
            "continueJobExecution".parse::<OnTaskError>().unwrap(),
            OnTaskError::ContinueJobExecution
        );
        assert!("explode".parse::<OnTaskError>().is_err());
    }

    #[test]
    fn test_priority_default_and_parse() {
        assert_eq!(JobPriority::default(), JobPriority::Normal);
        assert_eq!("High".parse::<JobPriority>().unwrap(), JobPriority::High);
        assert_eq!(JobPriority::Highest.priority(), 5);
        assert_eq!(JobPriority::Idle.to_string(), "idle");
    }

    #[test]
    fn test_restart_mode_roundtrip_strings() {
        for mode in [RestartMode::Anywhere, RestartMode::Elsewhere] {
            assert_eq!(mode.as_str().parse::<RestartMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_unset_attributes_are_none() {
        let attrs = CommonAttributes::new();
        assert!(attrs.on_task_error().is_none());
        assert!(attrs.max_number_of_execution().is_none());
        assert!(attrs.task_retry_delay().is_none());
        assert!(attrs.restart_task_on_error().is_none());
    }

    #[test]
    fn test_setting_default_value_counts_as_set() {
        let mut attrs = CommonAttributes::new();
        attrs.set_on_task_error(OnTaskError::None);
        assert_eq!(attrs.on_task_error(), Some(OnTaskError::None));
    }

    #[test]
    fn test_max_number_of_execution_rejects_non_positive() {
        let mut attrs = CommonAttributes::new();
        assert_eq!(
            attrs.set_max_number_of_execution(0),
            Err(JobError::InvalidMaxNumberOfExecution(0))
        );
        assert!(attrs.set_max_number_of_execution(-3).is_err());
        assert!(attrs.max_number_of_execution().is_none());

        attrs.set_max_number_of_execution(2).unwrap();
        assert_eq!(attrs.max_number_of_execution(), Some(2));
    }

    #[test]
    fn test_generic_information_key_length() {
        let mut attrs = CommonAttributes::new();
        attrs.add_generic_information("queue", "gpu").unwrap();

        let long_key = "k".repeat(256);
        assert!(attrs.add_generic_information(long_key.clone(), "v").is_err());

        let mut map = IndexMap::new();
        map.insert("other".to_string(), "x".to_string());
        map.insert(long_key, "v".to_string());
        assert!(attrs.set_generic_information(map).is_err());

        // Previous map is untouched
        assert_eq!(attrs.generic_information().len(), 1);
        assert_eq!(attrs.generic_information()["queue"], "gpu");
    }
}
