// crates/recipe-engines/src/pipeline/log_monitor.rs
//! Temporary log file for agent output and the task that follows it.
//!
//! The agent writes stdout and stderr into an [`AgentLog`]. While it runs, a
//! [`LogMonitor`] reads new complete lines from a [`LogTail`] and forwards them
//! to a [`ProgressSink`], emitting a heartbeat when the file stays silent.

use log::{debug, info, warn};
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Receives live progress from a running agent step.
pub trait ProgressSink: Send + Sync {
    fn line(&self, step_id: &str, line: &str);

    /// Called after `quiet_for` without any new output.
    fn heartbeat(&self, step_id: &str, elapsed: Duration, quiet_for: Duration);
}

/// Forwards progress to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn line(&self, step_id: &str, line: &str) {
        info!("[{}] {}", step_id, line);
    }

    fn heartbeat(&self, step_id: &str, elapsed: Duration, quiet_for: Duration) {
        info!(
            "[{}] still running after {}s ({}s without output)",
            step_id,
            elapsed.as_secs(),
            quiet_for.as_secs()
        );
    }
}

/// Log file owned by one agent step. Removed from disk when dropped.
pub struct AgentLog {
    file: NamedTempFile,
}

impl AgentLog {
    pub fn create(dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("recipe-agent-").suffix(".log");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        debug!("Agent log at {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// A handle for the child's stdout or stderr. Handles share one file
    /// offset, so interleaved writes never overwrite each other.
    pub fn writer(&self) -> io::Result<Stdio> {
        Ok(Stdio::from(self.file.as_file().try_clone()?))
    }

    /// Independent read handle for the monitor.
    pub fn tail(&self) -> io::Result<LogTail> {
        let file = File::open(self.file.path())?;
        Ok(LogTail::new(tokio::fs::File::from_std(file)))
    }

    /// Reads the complete log, then deletes it.
    pub async fn into_output(self) -> io::Result<String> {
        let bytes = tokio::fs::read(self.file.path()).await?;
        if let Err(e) = self.file.close() {
            warn!("Failed to remove agent log: {}", e);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Incremental reader that yields complete lines only.
pub struct LogTail {
    file: tokio::fs::File,
    pending: Vec<u8>,
}

impl LogTail {
    fn new(file: tokio::fs::File) -> Self {
        Self {
            file,
            pending: Vec::new(),
        }
    }

    /// Returns the number of new bytes and the lines they completed.
    pub async fn read_new_lines(&mut self) -> io::Result<(usize, Vec<String>)> {
        let mut chunk = Vec::new();
        let read = self.file.read_to_end(&mut chunk).await?;
        self.pending.extend_from_slice(&chunk);

        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&raw);
            lines.push(line.trim_end_matches(['\n', '\r']).to_string());
        }
        Ok((read, lines))
    }

    /// Whatever trails the last newline.
    pub fn take_partial(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&raw).trim_end().to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct MonitorSettings {
    pub poll_interval: Duration,
    pub heartbeat_interval: Duration,
}

/// Handle to the background monitor task. Dropping it cancels the task.
pub(crate) struct LogMonitor {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    step_id: String,
}

impl LogMonitor {
    pub(crate) fn spawn(
        tail: LogTail,
        step_id: &str,
        sink: Arc<dyn ProgressSink>,
        settings: MonitorSettings,
    ) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(follow(
            tail,
            step_id.to_string(),
            sink,
            settings,
            token.clone(),
        ));
        Self {
            token,
            handle: Some(handle),
            step_id: step_id.to_string(),
        }
    }

    /// Signals the task to stop and waits at most `join_timeout` for it.
    pub(crate) async fn stop(mut self, join_timeout: Duration) {
        self.token.cancel();
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match tokio::time::timeout(join_timeout, &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Log monitor for step {} failed: {}", self.step_id, e),
            Err(_) => {
                warn!(
                    "Log monitor for step {} did not stop within {}ms, abandoning it",
                    self.step_id,
                    join_timeout.as_millis()
                );
                handle.abort();
            }
        }
    }
}

impl Drop for LogMonitor {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn follow(
    mut tail: LogTail,
    step_id: String,
    sink: Arc<dyn ProgressSink>,
    settings: MonitorSettings,
    token: CancellationToken,
) {
    let started = Instant::now();
    let mut last_output = started;
    let mut last_signal = started;

    loop {
        let cancelled = tokio::select! {
            _ = token.cancelled() => true,
            _ = tokio::time::sleep(settings.poll_interval) => false,
        };

        match tail.read_new_lines().await {
            Ok((read, lines)) => {
                if read > 0 {
                    last_output = Instant::now();
                    last_signal = last_output;
                }
                for line in &lines {
                    sink.line(&step_id, line);
                }
            }
            Err(e) => debug!("Step {}: failed to read agent log: {}", step_id, e),
        }

        if cancelled {
            if let Some(partial) = tail.take_partial() {
                sink.line(&step_id, &partial);
            }
            break;
        }

        if last_signal.elapsed() >= settings.heartbeat_interval {
            sink.heartbeat(&step_id, started.elapsed(), last_output.elapsed());
            last_signal = Instant::now();
        }
    }
}
