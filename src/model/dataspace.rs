//! File transfer selectors between task nodes and data spaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Include/exclude glob patterns.
///
/// Several patterns of each kind can be held, but the descriptor format
/// only carries the first include and the first exclude.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelector {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl FileSelector {
    pub fn new(include: impl Into<String>) -> Self {
        Self {
            includes: vec![include.into()],
            excludes: Vec::new(),
        }
    }

    pub fn with_exclude(mut self, exclude: impl Into<String>) -> Self {
        self.excludes.push(exclude.into());
        self
    }

    pub fn add_include(&mut self, pattern: impl Into<String>) {
        self.includes.push(pattern.into());
    }

    pub fn add_exclude(&mut self, pattern: impl Into<String>) {
        self.excludes.push(pattern.into());
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn first_include(&self) -> Option<&str> {
        self.includes.first().map(String::as_str)
    }

    pub fn first_exclude(&self) -> Option<&str> {
        self.excludes.first().map(String::as_str)
    }
}

/// How input files reach the task node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum InputAccessMode {
    TransferFromInputSpace,
    TransferFromOutputSpace,
    TransferFromGlobalSpace,
    TransferFromUserSpace,
    CacheFromInputSpace,
    CacheFromOutputSpace,
    CacheFromGlobalSpace,
    CacheFromUserSpace,
    None,
}

impl InputAccessMode {
    pub const ALL: [InputAccessMode; 9] = [
        Self::TransferFromInputSpace,
        Self::TransferFromOutputSpace,
        Self::TransferFromGlobalSpace,
        Self::TransferFromUserSpace,
        Self::CacheFromInputSpace,
        Self::CacheFromOutputSpace,
        Self::CacheFromGlobalSpace,
        Self::CacheFromUserSpace,
        Self::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransferFromInputSpace => "transferFromInputSpace",
            Self::TransferFromOutputSpace => "transferFromOutputSpace",
            Self::TransferFromGlobalSpace => "transferFromGlobalSpace",
            Self::TransferFromUserSpace => "transferFromUserSpace",
            Self::CacheFromInputSpace => "cacheFromInputSpace",
            Self::CacheFromOutputSpace => "cacheFromOutputSpace",
            Self::CacheFromGlobalSpace => "cacheFromGlobalSpace",
            Self::CacheFromUserSpace => "cacheFromUserSpace",
            Self::None => "none",
        }
    }
}

impl fmt::Display for InputAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputAccessMode {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JobError::unknown("input accessMode", s))
    }
}

/// Where output files are sent after the task ends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum OutputAccessMode {
    TransferToOutputSpace,
    TransferToGlobalSpace,
    TransferToUserSpace,
    None,
}

impl OutputAccessMode {
    pub const ALL: [OutputAccessMode; 4] = [
        Self::TransferToOutputSpace,
        Self::TransferToGlobalSpace,
        Self::TransferToUserSpace,
        Self::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TransferToOutputSpace => "transferToOutputSpace",
            Self::TransferToGlobalSpace => "transferToGlobalSpace",
            Self::TransferToUserSpace => "transferToUserSpace",
            Self::None => "none",
        }
    }
}

impl fmt::Display for OutputAccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputAccessMode {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JobError::unknown("output accessMode", s))
    }
}

/// Files copied to the node before the task starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSelector {
    pub files: FileSelector,
    pub mode: Option<InputAccessMode>,
}

impl InputSelector {
    pub fn new(files: FileSelector, mode: InputAccessMode) -> Self {
        Self {
            files,
            mode: Some(mode),
        }
    }
}

/// Files copied from the node after the task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSelector {
    pub files: FileSelector,
    pub mode: Option<OutputAccessMode>,
}

impl OutputSelector {
    pub fn new(files: FileSelector, mode: OutputAccessMode) -> Self {
        Self {
            files,
            mode: Some(mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_first_patterns() {
        let mut selector = FileSelector::new("*.csv").with_exclude("tmp_*");
        selector.add_include("*.json");
        selector.add_exclude("*.bak");

        assert_eq!(selector.includes().len(), 2);
        assert_eq!(selector.first_include(), Some("*.csv"));
        assert_eq!(selector.first_exclude(), Some("tmp_*"));
    }

    #[test]
    fn test_selector_without_exclude() {
        let selector = FileSelector::new("data/**");
        assert!(selector.first_exclude().is_none());
    }

    #[test]
    fn test_access_mode_strings() {
        assert_eq!(
            "transferfrominputspace".parse::<InputAccessMode>().unwrap(),
            InputAccessMode::TransferFromInputSpace
        );
        assert_eq!(
            OutputAccessMode::TransferToUserSpace.to_string(),
            "transferToUserSpace"
        );
        assert!("teleport".parse::<OutputAccessMode>().is_err());
    }

    #[test]
    fn test_access_mode_serde_names() {
        let mode: InputAccessMode = serde_yaml::from_str("cacheFromGlobalSpace").unwrap();
        assert_eq!(mode, InputAccessMode::CacheFromGlobalSpace);
    }
}
