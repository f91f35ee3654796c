// crates/recipe-engines/src/pipeline/command_executor.rs
//! Command profile: short shell commands with a bounded wait.
//!
//! The command runs as `<shell> -c <command>` in its own process group with
//! stdin closed and both output streams captured. When the time limit passes
//! the whole group is killed, so no descendant outlives the step.

use super::environment::ChildEnvironment;
use super::process::{
    collect_output, describe_status, isolate_process_group, spawn_reader, tail_lines,
    ProcessGroupGuard,
};
use log::{debug, info, warn};
use recipe_core::config::CommandProfileConfig;
use recipe_core::StepError;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Lines of stderr kept in a failure message.
const STDERR_TAIL_LINES: usize = 20;

pub struct CommandExecutor {
    config: CommandProfileConfig,
}

impl CommandExecutor {
    pub fn new(config: CommandProfileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CommandProfileConfig {
        &self.config
    }

    pub fn default_timeout(&self) -> Duration {
        self.config.default_timeout()
    }

    /// Runs `command` and returns its trimmed stdout.
    pub async fn run(
        &self,
        step_id: &str,
        command: &str,
        limit: Duration,
    ) -> Result<String, StepError> {
        debug!("Step {}: executing command: {}", step_id, command);

        let environment = ChildEnvironment::from_parent(&self.config.stripped_env);
        let mut std_cmd = std::process::Command::new(&self.config.shell);
        std_cmd
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.config.working_dir {
            std_cmd.current_dir(dir);
        }
        environment.apply(&mut std_cmd);
        isolate_process_group(&mut std_cmd);

        let mut cmd = Command::from(std_cmd);
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| StepError::SubprocessLaunch {
            program: self.config.shell.clone(),
            source,
        })?;
        let mut group = ProcessGroupGuard::new(child.id());

        let stdout_task = spawn_reader(child.stdout.take());
        let stderr_task = spawn_reader(child.stderr.take());

        let status = match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(
                    "Step {}: command exceeded {}s, killing process group",
                    step_id,
                    limit.as_secs()
                );
                group.kill_now();
                if let Err(e) = child.kill().await {
                    debug!("Step {}: kill after group kill: {}", step_id, e);
                }
                for task in [stdout_task, stderr_task].into_iter().flatten() {
                    task.abort();
                }
                return Err(StepError::SubprocessTimeout {
                    seconds: limit.as_secs(),
                });
            }
        };

        // Background descendants would otherwise hold the pipes open.
        group.kill_now();
        let stdout = collect_output(stdout_task, "stdout").await;
        let stderr = collect_output(stderr_task, "stderr").await;

        if !status.success() {
            let detail = match tail_lines(&stderr, STDERR_TAIL_LINES) {
                tail if tail.is_empty() => "no output on stderr".to_string(),
                tail => tail,
            };
            return Err(StepError::SubprocessExit {
                program: self.config.shell.clone(),
                status: describe_status(&status),
                detail,
            });
        }

        info!("Step {}: command finished ({} bytes of output)", step_id, stdout.len());
        Ok(stdout.trim().to_string())
    }
}
