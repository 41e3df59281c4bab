//! Fork environment
//!
//! Launch configuration for running a task executable in a separate
//! process (optionally wrapped by a container command through
//! `pre_java_command`).

use indexmap::IndexMap;

use super::script::SimpleScript;

/// Configuration of the child process a task runs in.
///
/// Cloning copies every collection; the environment script is cloned too.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForkEnvironment {
    java_home: Option<String>,
    working_dir: Option<String>,
    system_environment: IndexMap<String, String>,
    jvm_arguments: Vec<String>,
    additional_classpath: Vec<String>,
    pre_java_command: Vec<String>,
    env_script: Option<SimpleScript>,
    docker_windows_to_linux: bool,
}

impl ForkEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_java_home(mut self, java_home: impl Into<String>) -> Self {
        self.java_home = Some(java_home.into());
        self
    }

    pub fn with_working_dir(mut self, working_dir: impl Into<String>) -> Self {
        self.working_dir = Some(working_dir.into());
        self
    }

    pub fn with_env_script(mut self, script: SimpleScript) -> Self {
        self.env_script = Some(script);
        self
    }

    pub fn java_home(&self) -> Option<&str> {
        self.java_home.as_deref()
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    pub fn system_environment(&self) -> &IndexMap<String, String> {
        &self.system_environment
    }

    /// Adds or replaces an environment variable of the forked process.
    pub fn add_system_environment_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.system_environment.insert(name.into(), value.into());
    }

    pub fn jvm_arguments(&self) -> &[String] {
        &self.jvm_arguments
    }

    pub fn add_jvm_argument(&mut self, argument: impl Into<String>) {
        self.jvm_arguments.push(argument.into());
    }

    pub fn additional_classpath(&self) -> &[String] {
        &self.additional_classpath
    }

    pub fn add_additional_classpath(&mut self, entry: impl Into<String>) {
        self.additional_classpath.push(entry.into());
    }

    /// Command prefix placed before the launch command, e.g. `docker run ...`.
    pub fn pre_java_command(&self) -> &[String] {
        &self.pre_java_command
    }

    pub fn set_pre_java_command(&mut self, command: Vec<String>) {
        self.pre_java_command = command;
    }

    pub fn env_script(&self) -> Option<&SimpleScript> {
        self.env_script.as_ref()
    }

    pub fn set_env_script(&mut self, script: Option<SimpleScript>) {
        self.env_script = script;
    }

    pub fn is_docker_windows_to_linux(&self) -> bool {
        self.docker_windows_to_linux
    }

    pub fn set_docker_windows_to_linux(&mut self, enabled: bool) {
        self.docker_windows_to_linux = enabled;
    }

    /// Rewrites a Windows path for a Linux container when enabled.
    ///
    /// `C:\data\in` becomes `/c/data/in`. Paths without a drive letter only
    /// get their separators flipped; nothing changes when the flag is off.
    pub fn translate_path(&self, path: &str) -> String {
        if !self.docker_windows_to_linux {
            return path.to_string();
        }
        let mut chars = path.chars();
        match (chars.next(), chars.next()) {
            (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
                let rest = chars.as_str().replace('\\', "/");
                let rest = rest.trim_start_matches('/');
                if rest.is_empty() {
                    format!("/{}", drive.to_ascii_lowercase())
                } else {
                    format!("/{}/{}", drive.to_ascii_lowercase(), rest)
                }
            }
            _ => path.replace('\\', "/"),
        }
    }
}
