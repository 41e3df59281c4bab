//! Flow-control declarations
//!
//! A [`FlowScript`] attached to a task declares what happens after the task
//! ends: continue normally, branch (`if`), loop back to an earlier task, or
//! fan out (`replicate`). The script is run by the scheduler; this module
//! only carries the declaration and the mapping from script results to a
//! [`FlowAction`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::script::{Script, ScriptCore, ScriptKind, SimpleScript};
use crate::error::JobError;

/// Binding holding the chosen branch of an `if` action (`"if"` or `"else"`).
pub const BRANCH_BINDING: &str = "branch";
/// Binding holding the decision of a `loop` action (boolean or cron expression).
pub const LOOP_BINDING: &str = "loop";
/// Binding holding the number of replicas of a `replicate` action.
pub const REPLICATE_BINDING: &str = "runs";

pub const IF_BRANCH: &str = "if";
pub const ELSE_BRANCH: &str = "else";

/// Kind of control-flow decision.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowActionType {
    #[default]
    Continue,
    If,
    Loop,
    Replicate,
}

impl FlowActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continue => "continue",
            Self::If => "if",
            Self::Loop => "loop",
            Self::Replicate => "replicate",
        }
    }

    /// Case-insensitive parse; anything unrecognised means `Continue`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "if" => Self::If,
            "loop" => Self::Loop,
            "replicate" => Self::Replicate,
            _ => Self::Continue,
        }
    }
}

impl fmt::Display for FlowActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FlowActionType {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Delimits the scope of `if` and `replicate` actions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowBlock {
    #[default]
    None,
    Start,
    End,
}

impl FlowBlock {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

impl fmt::Display for FlowBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlowBlock {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "start" => Ok(Self::Start),
            "end" => Ok(Self::End),
            _ => Err(JobError::unknown("block", s)),
        }
    }
}

/// Script deciding the control flow after its task ends.
///
/// The targets are task names; which ones are meaningful depends on the
/// action type (`target` for `loop`; `target`, `target_else` and
/// `target_continuation` for `if`; none for `replicate`).
#[derive(Debug, Clone)]
pub struct FlowScript {
    core: ScriptCore,
    action_type: FlowActionType,
    target: Option<String>,
    target_else: Option<String>,
    target_continuation: Option<String>,
    cron_expr: Option<String>,
}

impl FlowScript {
    fn from_script(script: SimpleScript, action_type: FlowActionType) -> Self {
        Self {
            core: script.into_core().with_kind(ScriptKind::Flow),
            action_type,
            target: None,
            target_else: None,
            target_continuation: None,
            cron_expr: None,
        }
    }

    pub fn continue_with(script: SimpleScript) -> Self {
        Self::from_script(script, FlowActionType::Continue)
    }

    pub fn if_branch(
        script: SimpleScript,
        target: impl Into<String>,
        target_else: impl Into<String>,
        target_continuation: Option<String>,
    ) -> Self {
        let mut flow = Self::from_script(script, FlowActionType::If);
        flow.target = Some(target.into());
        flow.target_else = Some(target_else.into());
        flow.target_continuation = target_continuation;
        flow
    }

    pub fn loop_to(script: SimpleScript, target: impl Into<String>) -> Self {
        let mut flow = Self::from_script(script, FlowActionType::Loop);
        flow.target = Some(target.into());
        flow
    }

    pub fn replicate(script: SimpleScript) -> Self {
        Self::from_script(script, FlowActionType::Replicate)
    }

    pub fn action_type(&self) -> FlowActionType {
        self.action_type
    }

    /// Sets the action from its string form; unknown values mean `continue`.
    pub fn set_action_type(&mut self, action: &str) {
        self.action_type = FlowActionType::parse(action);
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: Option<String>) {
        self.target = target;
    }

    pub fn target_else(&self) -> Option<&str> {
        self.target_else.as_deref()
    }

    pub fn set_target_else(&mut self, target: Option<String>) {
        self.target_else = target;
    }

    pub fn target_continuation(&self) -> Option<&str> {
        self.target_continuation.as_deref()
    }

    pub fn set_target_continuation(&mut self, target: Option<String>) {
        self.target_continuation = target;
    }

    pub fn cron_expr(&self) -> Option<&str> {
        self.cron_expr.as_deref()
    }

    pub fn set_cron_expr(&mut self, cron: Option<String>) {
        self.cron_expr = cron;
    }

    pub fn core_mut(&mut self) -> &mut ScriptCore {
        &mut self.core
    }

    /// Maps the bindings produced by running this script to an action.
    ///
    /// When the script could not run at all, use
    /// [`FlowAction::default_for`] instead.
    pub fn resolve_action(&self, bindings: &HashMap<String, Value>) -> Result<FlowAction, JobError> {
        let action = match self.action_type {
            FlowActionType::Continue => FlowAction::continue_action(),
            FlowActionType::If => self.resolve_if(bindings)?,
            FlowActionType::Loop => self.resolve_loop(bindings)?,
            FlowActionType::Replicate => resolve_replicate(bindings)?,
        };
        debug!(
            "Flow script '{}' resolved to {} action",
            self.script_name(),
            action.action_type
        );
        Ok(action)
    }

    fn resolve_if(&self, bindings: &HashMap<String, Value>) -> Result<FlowAction, JobError> {
        let (Some(target), Some(target_else)) = (&self.target, &self.target_else) else {
            return Err(JobError::InvalidFlowBinding(
                "if action declared without both targets".to_string(),
            ));
        };
        let branch = bindings.get(BRANCH_BINDING).and_then(Value::as_str);
        let (selected, rejected) = match branch.map(str::trim) {
            Some(b) if b.eq_ignore_ascii_case(IF_BRANCH) => (target, target_else),
            Some(b) if b.eq_ignore_ascii_case(ELSE_BRANCH) => (target_else, target),
            other => {
                return Err(JobError::InvalidFlowBinding(format!(
                    "'{}' must be '{}' or '{}', got {:?}",
                    BRANCH_BINDING, IF_BRANCH, ELSE_BRANCH, other
                )))
            }
        };
        Ok(FlowAction {
            action_type: FlowActionType::If,
            target: Some(selected.clone()),
            target_else: Some(rejected.clone()),
            target_continuation: self.target_continuation.clone(),
            ..FlowAction::continue_action()
        })
    }

    fn resolve_loop(&self, bindings: &HashMap<String, Value>) -> Result<FlowAction, JobError> {
        let looping = match bindings.get(LOOP_BINDING) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(text)) => match text.trim() {
                t if t.eq_ignore_ascii_case("true") => true,
                t if t.eq_ignore_ascii_case("false") => false,
                cron => {
                    return Ok(FlowAction {
                        action_type: FlowActionType::Loop,
                        target: self.target.clone(),
                        cron_expr: Some(cron.to_string()),
                        ..FlowAction::continue_action()
                    })
                }
            },
            other => {
                return Err(JobError::InvalidFlowBinding(format!(
                    "'{}' must be a boolean or a cron expression, got {:?}",
                    LOOP_BINDING, other
                )))
            }
        };
        if !looping {
            return Ok(FlowAction::continue_action());
        }
        Ok(FlowAction {
            action_type: FlowActionType::Loop,
            target: self.target.clone(),
            ..FlowAction::continue_action()
        })
    }
}

fn resolve_replicate(bindings: &HashMap<String, Value>) -> Result<FlowAction, JobError> {
    let runs = bindings.get(REPLICATE_BINDING).and_then(Value::as_i64);
    match runs {
        Some(n) if n >= 1 => Ok(FlowAction {
            action_type: FlowActionType::Replicate,
            dup_number: n.min(i64::from(u32::MAX)) as u32,
            ..FlowAction::continue_action()
        }),
        other => Err(JobError::InvalidFlowBinding(format!(
            "'{}' must be an integer of at least 1, got {:?}",
            REPLICATE_BINDING, other
        ))),
    }
}

impl Script for FlowScript {
    fn core(&self) -> &ScriptCore {
        &self.core
    }
}

/// Control-flow decision taken after a task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowAction {
    pub action_type: FlowActionType,
    /// Number of parallel replicas for `replicate`
    pub dup_number: u32,
    pub target: Option<String>,
    pub target_else: Option<String>,
    pub target_continuation: Option<String>,
    pub cron_expr: Option<String>,
}

impl FlowAction {
    pub fn continue_action() -> Self {
        Self {
            action_type: FlowActionType::Continue,
            dup_number: 1,
            target: None,
            target_else: None,
            target_continuation: None,
            cron_expr: None,
        }
    }

    /// Action applied when the flow script fails to run.
    ///
    /// `replicate` and `loop` degrade to `continue`; `if` behaves as if the
    /// `if` branch was chosen, so `target` runs and `target_else` does not.
    pub fn default_for(script: &FlowScript) -> Self {
        match script.action_type() {
            FlowActionType::If => Self {
                action_type: FlowActionType::If,
                target: script.target.clone(),
                target_else: script.target_else.clone(),
                target_continuation: script.target_continuation.clone(),
                ..Self::continue_action()
            },
            FlowActionType::Continue | FlowActionType::Loop | FlowActionType::Replicate => {
                Self::continue_action()
            }
        }
    }

    /// Task the flow moves to (`if` branch taken, or `loop` target).
    pub fn selected_target(&self) -> Option<&str> {
        match self.action_type {
            FlowActionType::If | FlowActionType::Loop => self.target.as_deref(),
            FlowActionType::Continue | FlowActionType::Replicate => None,
        }
    }

    /// Branch of an `if` that will not run.
    pub fn rejected_target(&self) -> Option<&str> {
        match self.action_type {
            FlowActionType::If => self.target_else.as_deref(),
            _ => None,
        }
    }
}

impl Default for FlowAction {
    fn default() -> Self {
        Self::continue_action()
    }
}
