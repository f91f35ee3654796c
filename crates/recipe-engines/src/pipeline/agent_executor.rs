// crates/recipe-engines/src/pipeline/agent_executor.rs
//! Agent profile: a long-running AI agent subprocess.
//!
//! The prompt is passed as the final argument. Output goes to a temporary log
//! file instead of pipes, which keeps the agent from blocking on a full pipe
//! buffer and lets a monitor report progress while the agent works. There is
//! no time limit: the agent runs until it exits on its own.

use super::environment::ChildEnvironment;
use super::log_monitor::{AgentLog, LogMonitor, LogProgressSink, MonitorSettings, ProgressSink};
use super::process::{describe_status, isolate_process_group, tail_lines, ProcessGroupGuard};
use log::{debug, info};
use recipe_core::config::AgentProfileConfig;
use recipe_core::StepError;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// Lines of the log kept in a failure message.
const FAILURE_TAIL_LINES: usize = 20;

pub struct AgentExecutor {
    config: AgentProfileConfig,
    sink: Arc<dyn ProgressSink>,
}

impl AgentExecutor {
    pub fn new(config: AgentProfileConfig) -> Self {
        Self::with_progress_sink(config, Arc::new(LogProgressSink))
    }

    pub fn with_progress_sink(config: AgentProfileConfig, sink: Arc<dyn ProgressSink>) -> Self {
        Self { config, sink }
    }

    pub fn config(&self) -> &AgentProfileConfig {
        &self.config
    }

    /// Runs the agent with `prompt` and returns everything it wrote, trimmed.
    pub async fn run(&self, step_id: &str, prompt: &str) -> Result<String, StepError> {
        let program = &self.config.program;
        debug!(
            "Step {}: launching agent '{}' with {} byte prompt",
            step_id,
            program,
            prompt.len()
        );

        let log = AgentLog::create(self.config.log_dir.as_deref())?;
        let environment = ChildEnvironment::from_parent(&self.config.stripped_env);

        let mut std_cmd = std::process::Command::new(program);
        std_cmd
            .args(&self.config.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(log.writer()?)
            .stderr(log.writer()?);
        if let Some(dir) = &self.config.working_dir {
            std_cmd.current_dir(dir);
        }
        environment.apply(&mut std_cmd);
        isolate_process_group(&mut std_cmd);

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| StepError::SubprocessLaunch {
            program: program.clone(),
            source,
        })?;
        // The command holds the parent's copies of the log handles.
        drop(cmd);
        let mut group = ProcessGroupGuard::new(child.id());

        let monitor = LogMonitor::spawn(
            log.tail()?,
            step_id,
            Arc::clone(&self.sink),
            MonitorSettings {
                poll_interval: self.config.poll_interval(),
                heartbeat_interval: self.config.heartbeat_interval(),
            },
        );

        let status = child.wait().await;
        monitor.stop(self.config.monitor_join_timeout()).await;
        group.kill_now();
        let status = status?;

        let output = log.into_output().await?;
        if !status.success() {
            let detail = match tail_lines(&output, FAILURE_TAIL_LINES) {
                tail if tail.is_empty() => "no output".to_string(),
                tail => tail,
            };
            return Err(StepError::SubprocessExit {
                program: program.clone(),
                status: describe_status(&status),
                detail,
            });
        }

        info!("Step {}: agent finished ({} bytes of output)", step_id, output.len());
        Ok(output.trim().to_string())
    }
}
