// crates/recipe-core/src/config.rs
use crate::error::ConfigError;
use crate::types::DEFAULT_COMMAND_TIMEOUT_SECS;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable set by an agent session for its own children. A nested
/// agent that inherits it believes it is already nested.
pub const NESTED_SESSION_MARKER: &str = "CLAUDECODE";

/// Settings for both execution profiles.
///
/// Every field has a default, so an empty or partial TOML file is valid:
///
/// ```toml
/// [agent]
/// program = "claude"
/// args = ["-p", "--dangerously-skip-permissions"]
/// heartbeat_secs = 60
///
/// [command]
/// shell = "bash"
/// default_timeout_secs = 300
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    pub agent: AgentProfileConfig,
    pub command: CommandProfileConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AgentProfileConfig {
    pub program: String,
    /// Arguments placed before the prompt, which is always passed last.
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Directory for the temporary agent log. Defaults to the system temp dir.
    pub log_dir: Option<PathBuf>,
    /// Silence on the log file after which a heartbeat is emitted.
    pub heartbeat_secs: u64,
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for the log monitor after the agent exits.
    pub monitor_join_timeout_ms: u64,
    /// Variables removed from the inherited environment.
    pub stripped_env: Vec<String>,
}

impl Default for AgentProfileConfig {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: vec!["-p".to_string()],
            working_dir: None,
            log_dir: None,
            heartbeat_secs: 60,
            poll_interval_ms: 1000,
            monitor_join_timeout_ms: 5000,
            stripped_env: vec![NESTED_SESSION_MARKER.to_string()],
        }
    }
}

impl AgentProfileConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn monitor_join_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor_join_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CommandProfileConfig {
    pub shell: String,
    pub working_dir: Option<PathBuf>,
    pub default_timeout_secs: u64,
    pub stripped_env: Vec<String>,
}

impl Default for CommandProfileConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            working_dir: None,
            default_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            stripped_env: vec![NESTED_SESSION_MARKER.to_string()],
        }
    }
}

impl CommandProfileConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

impl RunnerConfig {
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading runner config from {}", path.display());
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |parameter: &str, reason: &str| ConfigError::InvalidValue {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        };
        if self.agent.program.trim().is_empty() {
            return Err(invalid("agent.program", "must not be empty"));
        }
        if self.agent.poll_interval_ms == 0 {
            return Err(invalid("agent.poll_interval_ms", "must be greater than zero"));
        }
        if self.agent.heartbeat_secs == 0 {
            return Err(invalid("agent.heartbeat_secs", "must be greater than zero"));
        }
        if self.command.shell.trim().is_empty() {
            return Err(invalid("command.shell", "must not be empty"));
        }
        if self.command.default_timeout_secs == 0 {
            return Err(invalid("command.default_timeout_secs", "must be greater than zero"));
        }
        Ok(())
    }
}
