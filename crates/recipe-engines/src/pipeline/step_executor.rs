// crates/recipe-engines/src/pipeline/step_executor.rs
//! Step dispatch module
//!
//! Hands a step whose template has already been resolved to the execution
//! profile for its kind and returns the raw text it produced.

use super::agent_executor::AgentExecutor;
use super::command_executor::CommandExecutor;
use super::log_monitor::{LogProgressSink, ProgressSink};
use async_trait::async_trait;
use log::debug;
use recipe_core::{RunnerConfig, Step, StepError, StepKind};
use std::sync::Arc;

/// Runs a resolved step and returns its raw output.
#[async_trait]
pub trait StepDispatcher: Send + Sync {
    async fn dispatch(&self, step: &Step, rendered: &str) -> Result<String, StepError>;
}

/// Dispatches to real subprocesses through the agent and command profiles.
pub struct ProcessDispatcher {
    agent: AgentExecutor,
    command: CommandExecutor,
}

impl ProcessDispatcher {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_progress_sink(config, Arc::new(LogProgressSink))
    }

    pub fn with_progress_sink(config: RunnerConfig, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            agent: AgentExecutor::with_progress_sink(config.agent, sink),
            command: CommandExecutor::new(config.command),
        }
    }
}

#[async_trait]
impl StepDispatcher for ProcessDispatcher {
    async fn dispatch(&self, step: &Step, rendered: &str) -> Result<String, StepError> {
        debug!("Dispatching {} step {}", step.kind, step.id);
        match step.kind {
            StepKind::Agent => self.agent.run(&step.id, rendered).await,
            StepKind::Command => {
                let default = self.command.default_timeout();
                let limit = step.effective_timeout(default).unwrap_or(default);
                self.command.run(&step.id, rendered, limit).await
            }
        }
    }
}
