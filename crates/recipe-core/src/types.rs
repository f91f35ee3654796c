// crates/recipe-core/src/types.rs
use crate::context::RecipeContext;
use crate::error::RecipeError;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Timeout applied to command steps that do not declare one.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Recipe {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub context: IndexMap<String, Value>,
}

impl Recipe {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps,
            context: IndexMap::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: Value) -> Self {
        self.context.insert(name.into(), value);
        self
    }

    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|step| step.id == id)
    }

    /// Structural checks that do not need the condition grammar.
    pub fn validate(&self) -> Result<(), RecipeError> {
        if self.name.trim().is_empty() {
            return Err(RecipeError::EmptyName);
        }
        if self.steps.is_empty() {
            return Err(RecipeError::NoSteps(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                return Err(RecipeError::EmptyStepId(index + 1));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(RecipeError::DuplicateStepId(step.id.clone()));
            }
            if step.template.trim().is_empty() {
                return Err(RecipeError::EmptyTemplate(step.id.clone()));
            }
            match (step.kind, step.timeout) {
                (StepKind::Agent, Some(_)) => return Err(RecipeError::AgentTimeout(step.id.clone())),
                (StepKind::Command, Some(0)) => return Err(RecipeError::ZeroTimeout(step.id.clone())),
                _ => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    /// Long-running AI agent subprocess, never subject to a hard timeout.
    Agent,
    /// Short shell command with a bounded wait.
    #[serde(alias = "bash", alias = "shell")]
    Command,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Agent => write!(f, "agent"),
            StepKind::Command => write!(f, "command"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: StepKind,
    /// Prompt for agent steps, shell command for command steps.
    #[serde(alias = "prompt", alias = "command")]
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default)]
    pub parse_json: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Seconds. Only meaningful for command steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Step {
    pub fn agent(id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(id, StepKind::Agent, prompt)
    }

    pub fn command(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(id, StepKind::Command, command)
    }

    fn new(id: impl Into<String>, kind: StepKind, template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            template: template.into(),
            output: None,
            parse_json: false,
            condition: None,
            timeout: None,
        }
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.output = Some(name.into());
        self
    }

    pub fn parse_json(mut self) -> Self {
        self.parse_json = true;
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Bounded wait for this step: `None` for agent steps, the declared
    /// timeout or `default` for command steps.
    pub fn effective_timeout(&self, default: Duration) -> Option<Duration> {
        match self.kind {
            StepKind::Agent => None,
            StepKind::Command => Some(self.timeout.map(Duration::from_secs).unwrap_or(default)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Completed => write!(f, "COMPLETED"),
            StepStatus::Failed => write!(f, "FAILED"),
            StepStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StepResult {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl StepResult {
    pub fn completed(step_id: &str, output: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self::finish(step_id, StepStatus::Completed, None, output, started_at)
    }

    pub fn skipped(step_id: &str, started_at: DateTime<Utc>) -> Self {
        Self::finish(step_id, StepStatus::Skipped, None, None, started_at)
    }

    pub fn failed(
        step_id: &str,
        error: String,
        output: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self::finish(step_id, StepStatus::Failed, Some(error), output, started_at)
    }

    fn finish(
        step_id: &str,
        status: StepStatus,
        error: Option<String>,
        output: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            step_id: step_id.to_string(),
            status,
            error,
            output,
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }
}

/// Outcome of one recipe run. Produced once, at the end of the run.
#[derive(Debug, Serialize, Clone)]
pub struct RecipeResult {
    pub recipe_name: String,
    pub success: bool,
    pub dry_run: bool,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub step_results: Vec<StepResult>,
    pub context: RecipeContext,
}

impl RecipeResult {
    pub fn new(
        recipe_name: &str,
        step_results: Vec<StepResult>,
        context: RecipeContext,
        duration: Duration,
        dry_run: bool,
    ) -> Self {
        let success = step_results
            .iter()
            .all(|result| result.status != StepStatus::Failed);
        Self {
            recipe_name: recipe_name.to_string(),
            success,
            dry_run,
            duration,
            step_results,
            context,
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.step_results.iter().find(|result| result.step_id == step_id)
    }

    pub fn failed_step(&self) -> Option<&StepResult> {
        self.step_results
            .iter()
            .find(|result| result.status == StepStatus::Failed)
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
