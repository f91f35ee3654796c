use owo_colors::OwoColorize;
use recipe_engines::ProgressSink;
use std::time::Duration;

/// Echoes agent progress to stderr so stdout stays machine readable.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrProgressSink;

impl ProgressSink for StderrProgressSink {
    fn line(&self, step_id: &str, line: &str) {
        eprintln!("{} {}", format!("[{}]", step_id).dimmed(), line);
    }

    fn heartbeat(&self, step_id: &str, elapsed: Duration, quiet_for: Duration) {
        eprintln!(
            "{} {}",
            format!("[{}]", step_id).dimmed(),
            format!(
                "still working ({}s elapsed, no output for {}s)",
                elapsed.as_secs(),
                quiet_for.as_secs()
            )
            .yellow()
        );
    }
}
