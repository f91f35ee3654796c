// crates/recipe-engines/src/pipeline/process.rs
//! Process plumbing shared by both execution profiles.

use log::{debug, warn};
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// How long captured pipes may keep draining once the child is gone.
pub(crate) const IO_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Kills the child's process group when dropped.
///
/// Children are spawned as group leaders, so this also reaches anything the
/// shell or agent started in the background.
pub(crate) struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    pub(crate) fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    pub(crate) fn kill_now(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill_now();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) => debug!("Sent SIGKILL to process group {}", pgid),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Puts the child in a new process group led by itself.
pub(crate) fn isolate_process_group(command: &mut std::process::Command) {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = command;
}

pub(crate) fn spawn_reader<R>(reader: Option<R>) -> Option<JoinHandle<io::Result<Vec<u8>>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    reader.map(|mut reader| {
        tokio::spawn(async move {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer).await?;
            Ok(buffer)
        })
    })
}

/// Waits a bounded time for a pipe reader and returns what it captured.
pub(crate) async fn collect_output(
    task: Option<JoinHandle<io::Result<Vec<u8>>>>,
    stream: &str,
) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(IO_CAPTURE_TIMEOUT, &mut task).await {
        Ok(Ok(Ok(bytes))) => String::from_utf8_lossy(&bytes).into_owned(),
        Ok(Ok(Err(e))) => {
            warn!("Failed to read {}: {}", stream, e);
            String::new()
        }
        Ok(Err(e)) => {
            warn!("{} reader task failed: {}", stream, e);
            String::new()
        }
        Err(_) => {
            warn!("Timed out draining {}", stream);
            task.abort();
            String::new()
        }
    }
}

pub(crate) fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {}", signal);
        }
    }
    status.to_string()
}

/// The last `max_lines` non-empty lines of `text`.
pub(crate) fn tail_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
