#![cfg(unix)]

use recipe_core::config::{AgentProfileConfig, CommandProfileConfig};
use recipe_core::{ContextValue, Recipe, RecipeContext, RunnerConfig, Step, StepStatus};
use recipe_engines::{ProgressSink, RecipeExecutor};
use serde_json::json;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// The prompt becomes a shell script, standing in for a real agent CLI.
fn config(log_dir: &Path) -> RunnerConfig {
    RunnerConfig {
        agent: AgentProfileConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string()],
            log_dir: Some(log_dir.to_path_buf()),
            poll_interval_ms: 50,
            monitor_join_timeout_ms: 1000,
            ..AgentProfileConfig::default()
        },
        command: CommandProfileConfig::default(),
    }
}

fn log_dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false)
}

#[derive(Default)]
struct CollectingSink {
    lines: Mutex<Vec<String>>,
    heartbeats: Mutex<usize>,
}

impl ProgressSink for CollectingSink {
    fn line(&self, _step_id: &str, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }

    fn heartbeat(&self, _step_id: &str, _elapsed: Duration, _quiet_for: Duration) {
        *self.heartbeats.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn test_agent_json_output_becomes_structured() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::new(
        "classify",
        vec![Step::agent("classify", r#"printf '{"is_qa": true}'"#)
            .with_output("classification")
            .parse_json()],
    );

    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert!(result.success, "{:?}", result.step_results);
    assert_eq!(
        result.context.get("classification"),
        Some(&ContextValue::Structured(json!({"is_qa": true})))
    );
    assert!(log_dir_is_empty(dir.path()));
}

#[tokio::test]
async fn test_agent_prose_fails_json_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::new(
        "prose",
        vec![Step::agent("ask", "echo 'Here is my answer: 42'")
            .with_output("answer")
            .parse_json()],
    );

    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    let step = &result.step_results[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().contains("parse_json failed"));
    assert!(!result.context.contains("answer"));
    assert!(log_dir_is_empty(dir.path()));
}

#[tokio::test]
async fn test_agent_fenced_block_is_extracted() {
    let dir = tempfile::tempdir().unwrap();
    let script = r#"printf '%s\n' 'All checks done.' '```json' '{"ok": true}' '```'"#;
    let recipe = Recipe::new(
        "fenced",
        vec![Step::agent("check", script).with_output("check").parse_json()],
    );

    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert!(result.success, "{:?}", result.step_results);
    assert_eq!(
        result.context.get("check"),
        Some(&ContextValue::Structured(json!({"ok": true})))
    );
}

#[tokio::test]
async fn test_command_timeout_fails_promptly() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::new(
        "slow",
        vec![
            Step::command("sleepy", "sleep 999").with_timeout(1),
            Step::command("after", "echo never"),
        ],
    );

    let started = Instant::now();
    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.step_results.len(), 1);
    let step = &result.step_results[0];
    assert_eq!(step.status, StepStatus::Failed);
    assert!(step.error.as_deref().unwrap().contains("timed out after 1 seconds"));
}

#[tokio::test]
async fn test_plain_output_field_access_stops_recipe() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::new(
        "strict",
        vec![
            Step::command("A", "echo hello").with_output("A"),
            Step::command("B", "echo b").with_condition("A.ok == true"),
            Step::command("C", "echo c"),
        ],
    );

    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert_eq!(result.step_results.len(), 2);
    assert_eq!(result.step_results[1].status, StepStatus::Failed);
    assert!(result.step_results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("Condition error"));
}

#[tokio::test]
async fn test_outputs_flow_between_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::new(
        "flow",
        vec![
            Step::command("files", r#"echo '{"count": 2, "names": ["a.rs", "b.rs"]}'"#)
                .with_output("files")
                .parse_json(),
            Step::agent("summarize", "echo reviewing {{files.names.1}}")
                .with_output("summary")
                .with_condition("files.count >= 2"),
        ],
    );

    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert!(result.success, "{:?}", result.step_results);
    assert_eq!(
        result.context.get("summary"),
        Some(&ContextValue::Text("reviewing b.rs".to_string()))
    );
}

#[tokio::test]
async fn test_nested_session_marker_is_stripped_for_children_only() {
    let marker = "RECIPE_ENGINES_TEST_NESTED_MARKER";
    std::env::set_var(marker, "1");

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.agent.stripped_env = vec![marker.to_string()];
    config.command.stripped_env = vec![marker.to_string()];

    let probe = format!("echo ${{{marker}:-absent}}");
    let recipe = Recipe::new(
        "env",
        vec![
            Step::agent("agent", probe.clone()).with_output("agent_env"),
            Step::command("command", probe).with_output("command_env"),
        ],
    );

    let result = RecipeExecutor::new(config)
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert!(result.success, "{:?}", result.step_results);
    assert_eq!(
        result.context.get("agent_env"),
        Some(&ContextValue::Text("absent".to_string()))
    );
    assert_eq!(
        result.context.get("command_env"),
        Some(&ContextValue::Text("absent".to_string()))
    );
    assert_eq!(std::env::var(marker).as_deref(), Ok("1"));
}

#[tokio::test]
async fn test_agent_progress_and_heartbeat() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.agent.heartbeat_secs = 1;
    let sink = Arc::new(CollectingSink::default());

    let recipe = Recipe::new(
        "quiet",
        vec![Step::agent("think", "echo starting; sleep 2; echo finished")],
    );

    let result = RecipeExecutor::with_progress_sink(config, sink.clone())
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    assert!(result.success, "{:?}", result.step_results);
    assert_eq!(
        *sink.lines.lock().unwrap(),
        vec!["starting".to_string(), "finished".to_string()]
    );
    assert!(*sink.heartbeats.lock().unwrap() >= 1);
    assert!(log_dir_is_empty(dir.path()));
}

#[tokio::test]
async fn test_agent_nonzero_exit_fails_step() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = Recipe::new(
        "crash",
        vec![Step::agent("agent", "echo 'partial work'; echo 'fatal: quota' >&2; exit 1")],
    );

    let result = RecipeExecutor::new(config(dir.path()))
        .execute(&recipe, RecipeContext::new(), false)
        .await;

    let step = &result.step_results[0];
    assert_eq!(step.status, StepStatus::Failed);
    let error = step.error.as_deref().unwrap();
    assert!(error.contains("exit code 1"));
    assert!(error.contains("fatal: quota"));
    assert!(log_dir_is_empty(dir.path()));
}
