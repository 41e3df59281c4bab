//! Script model
//!
//! A script is a snippet of code, or a reference to one, plus the name of
//! the engine that runs it. The same core is shared by task executables,
//! pre/post/cleaning scripts, selection scripts and flow scripts.
//!
//! # Example
//!
//! ```
//! use jobdesc::model::script::{Script, SelectionScript, SimpleScript};
//!
//! let hello = SimpleScript::inline("groovy", "println 'Hello World'");
//! assert_eq!(hello.engine_name(), "groovy");
//!
//! let a = SelectionScript::inline("groovy", "selected = true", false);
//! let b = SelectionScript::inline("groovy", "selected = true", false);
//! assert_eq!(a.hash(), b.hash());
//! ```

use std::hash::{Hash, Hasher};

use sha2::digest::Output;
use sha2::{Digest, Sha256};

/// Where the script text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSource {
    /// Script text held in memory
    Inline { code: String },
    /// Script referenced by URL.
    ///
    /// `fetched_code` holds the text once a collaborator has downloaded it;
    /// when present it takes precedence over the URL.
    Url {
        url: String,
        fetched_code: Option<String>,
    },
}

impl ScriptSource {
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Inline { code } => Some(code),
            Self::Url { fetched_code, .. } => fetched_code.as_deref(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Inline { .. } => None,
            Self::Url { url, .. } => Some(url),
        }
    }
}

/// Script families, each with its own default script name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    Simple,
    Selection,
    Flow,
}

impl ScriptKind {
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Simple => "SimpleScript",
            Self::Selection => "SelectionScript",
            Self::Flow => "FlowScript",
        }
    }
}

/// State shared by every script family.
#[derive(Debug, Clone)]
pub struct ScriptCore {
    engine_name: String,
    source: ScriptSource,
    parameters: Vec<String>,
    kind: ScriptKind,
    /// `None` while the name is still the family default
    script_name: Option<String>,
}

impl ScriptCore {
    pub fn new(kind: ScriptKind, engine_name: impl Into<String>, source: ScriptSource) -> Self {
        Self {
            engine_name: engine_name.into(),
            source,
            parameters: Vec::new(),
            kind,
            script_name: None,
        }
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn source(&self) -> &ScriptSource {
        &self.source
    }

    /// Inline text, or fetched text of a URL script.
    pub fn code(&self) -> Option<&str> {
        self.source.code()
    }

    pub fn url(&self) -> Option<&str> {
        self.source.url()
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn set_parameters(&mut self, parameters: Vec<String>) {
        self.parameters = parameters;
    }

    pub fn kind(&self) -> ScriptKind {
        self.kind
    }

    /// Identity of the script: its text when known, otherwise its URL.
    pub fn id(&self) -> &str {
        self.source
            .code()
            .or_else(|| self.source.url())
            .unwrap_or_default()
    }

    pub fn script_name(&self) -> &str {
        self.script_name
            .as_deref()
            .unwrap_or_else(|| self.kind.default_name())
    }

    pub fn set_script_name(&mut self, name: impl Into<String>) {
        self.script_name = Some(name.into());
    }

    /// Renames the script only while it still has its default name.
    pub fn override_default_script_name(&mut self, name: impl Into<String>) {
        if self.script_name.is_none() {
            self.script_name = Some(name.into());
        }
    }

    /// Same script, moved to another family; an explicit name is kept.
    pub(crate) fn with_kind(mut self, kind: ScriptKind) -> Self {
        self.kind = kind;
        self
    }

    /// Records the text downloaded for a URL script.
    pub fn set_fetched_code(&mut self, text: impl Into<String>) {
        match &mut self.source {
            ScriptSource::Url { fetched_code, .. } => *fetched_code = Some(text.into()),
            ScriptSource::Inline { code } => *code = text.into(),
        }
    }
}

/// Read access shared by all script families.
pub trait Script {
    fn core(&self) -> &ScriptCore;

    fn engine_name(&self) -> &str {
        self.core().engine_name()
    }

    fn code(&self) -> Option<&str> {
        self.core().code()
    }

    fn url(&self) -> Option<&str> {
        self.core().url()
    }

    fn parameters(&self) -> &[String] {
        self.core().parameters()
    }

    fn id(&self) -> &str {
        self.core().id()
    }

    fn script_name(&self) -> &str {
        self.core().script_name()
    }
}

/// Plain script used as executable, pre, post, cleaning or env script.
#[derive(Debug, Clone)]
pub struct SimpleScript {
    core: ScriptCore,
}

impl SimpleScript {
    pub fn inline(engine_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            core: ScriptCore::new(
                ScriptKind::Simple,
                engine_name,
                ScriptSource::Inline { code: code.into() },
            ),
        }
    }

    pub fn from_url(engine_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            core: ScriptCore::new(
                ScriptKind::Simple,
                engine_name,
                ScriptSource::Url {
                    url: url.into(),
                    fetched_code: None,
                },
            ),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.core.set_parameters(parameters);
        self
    }

    pub fn core_mut(&mut self) -> &mut ScriptCore {
        &mut self.core
    }

    pub fn into_core(self) -> ScriptCore {
        self.core
    }
}

impl Script for SimpleScript {
    fn core(&self) -> &ScriptCore {
        &self.core
    }
}

impl PartialEq for SimpleScript {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SimpleScript {}

/// Predicate deciding whether a node may run a task.
///
/// Static scripts are evaluated once per node and their answer may be
/// cached; dynamic scripts are evaluated every time. Two selection scripts
/// are equal when their [`hash`](SelectionScript::hash) is equal, which lets
/// a consumer share the cached result of identical static scripts.
#[derive(Debug, Clone)]
pub struct SelectionScript {
    core: ScriptCore,
    dynamic: bool,
}

impl SelectionScript {
    pub fn inline(engine_name: impl Into<String>, code: impl Into<String>, dynamic: bool) -> Self {
        Self {
            core: ScriptCore::new(
                ScriptKind::Selection,
                engine_name,
                ScriptSource::Inline { code: code.into() },
            ),
            dynamic,
        }
    }

    pub fn from_url(engine_name: impl Into<String>, url: impl Into<String>, dynamic: bool) -> Self {
        Self {
            core: ScriptCore::new(
                ScriptKind::Selection,
                engine_name,
                ScriptSource::Url {
                    url: url.into(),
                    fetched_code: None,
                },
            ),
            dynamic,
        }
    }

    /// Reuses the source and parameters of a plain script.
    pub fn from_script(script: SimpleScript, dynamic: bool) -> Self {
        Self {
            core: script.into_core().with_kind(ScriptKind::Selection),
            dynamic,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<String>) -> Self {
        self.core.set_parameters(parameters);
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Static scripts may have their result reused across evaluations.
    pub fn is_cacheable(&self) -> bool {
        !self.dynamic
    }

    pub fn core_mut(&mut self) -> &mut ScriptCore {
        &mut self.core
    }

    /// SHA-256 over the script id, the dynamic flag and every parameter.
    fn digest(&self) -> Output<Sha256> {
        let mut hasher = Sha256::new();
        hasher.update(self.core.id().as_bytes());
        hasher.update(self.dynamic.to_string().as_bytes());
        for parameter in &self.core.parameters {
            hasher.update(parameter.as_bytes());
        }
        hasher.finalize()
    }

    pub fn hash(&self) -> [u8; 32] {
        self.digest().into()
    }

    pub fn hash_hex(&self) -> String {
        format!("{:x}", self.digest())
    }
}

impl Script for SelectionScript {
    fn core(&self) -> &ScriptCore {
        &self.core
    }
}

impl PartialEq for SelectionScript {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl Eq for SelectionScript {}

impl Hash for SelectionScript {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let digest: [u8; 32] = SelectionScript::hash(self);
        state.write(&digest);
    }
}
