use anyhow::Result;
use async_trait::async_trait;
use recipe_core::{ContextValue, Recipe, RecipeContext, Step, StepError, StepStatus};
use recipe_engines::{RecipeExecutor, StepDispatcher};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

/// Returns canned output per step id and records what it was asked to run.
#[derive(Default)]
struct ScriptedDispatcher {
    outputs: HashMap<String, String>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedDispatcher {
    fn output(mut self, step_id: &str, text: &str) -> Self {
        self.outputs.insert(step_id.to_string(), text.to_string());
        self
    }

    fn failure(mut self, step_id: &str, detail: &str) -> Self {
        self.failures.insert(step_id.to_string(), detail.to_string());
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StepDispatcher for ScriptedDispatcher {
    async fn dispatch(&self, step: &Step, rendered: &str) -> Result<String, StepError> {
        self.calls
            .lock()
            .unwrap()
            .push((step.id.clone(), rendered.to_string()));
        if let Some(detail) = self.failures.get(&step.id) {
            return Err(StepError::SubprocessExit {
                program: "scripted".to_string(),
                status: "exit code 1".to_string(),
                detail: detail.clone(),
            });
        }
        Ok(self.outputs.get(&step.id).cloned().unwrap_or_default())
    }
}

fn executor(dispatcher: ScriptedDispatcher) -> RecipeExecutor<ScriptedDispatcher> {
    RecipeExecutor::with_dispatcher(dispatcher)
}

#[tokio::test]
async fn test_structured_output_is_stored() {
    let recipe = Recipe::new(
        "classify",
        vec![Step::agent("classify", "Is this QA?").with_output("classification").parse_json()],
    );
    let runner = executor(ScriptedDispatcher::default().output("classify", r#"{"is_qa": true}"#));

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    assert!(result.success);
    assert_eq!(result.step_results[0].status, StepStatus::Completed);
    assert_eq!(
        result.context.get("classification"),
        Some(&ContextValue::Structured(json!({"is_qa": true})))
    );
}

#[tokio::test]
async fn test_fenced_json_output_is_extracted() {
    let recipe = Recipe::new(
        "fenced",
        vec![Step::agent("check", "Check it").with_output("check").parse_json()],
    );
    let runner = executor(
        ScriptedDispatcher::default().output("check", "Done!\n```json\n{\"ok\": true}\n```\n"),
    );

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    assert!(result.success);
    assert_eq!(
        result.context.get("check"),
        Some(&ContextValue::Structured(json!({"ok": true})))
    );
}

#[tokio::test]
async fn test_failed_extraction_fails_step_and_leaves_context_alone() {
    let recipe = Recipe::new(
        "answer",
        vec![
            Step::agent("ask", "What is it?").with_output("answer").parse_json(),
            Step::command("never", "echo unreachable"),
        ],
    );
    let dispatcher = ScriptedDispatcher::default().output("ask", "Here is my answer: 42");
    let runner = executor(dispatcher);

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    assert!(!result.success);
    assert_eq!(result.step_results.len(), 1);
    let failed = &result.step_results[0];
    assert_eq!(failed.status, StepStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("parse_json failed"));
    assert_eq!(failed.output.as_deref(), Some("Here is my answer: 42"));
    assert!(!result.context.contains("answer"));
}

#[tokio::test]
async fn test_condition_on_plain_string_fails_and_stops() {
    let recipe = Recipe::new(
        "strict",
        vec![
            Step::command("A", "echo hello").with_output("A"),
            Step::command("B", "echo b").with_condition("A.ok == true"),
            Step::command("C", "echo c"),
        ],
    );
    let dispatcher = ScriptedDispatcher::default().output("A", "hello");
    let runner = executor(dispatcher);

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    assert!(!result.success);
    assert_eq!(result.step_results.len(), 2);
    assert_eq!(result.step_results[0].status, StepStatus::Completed);
    assert_eq!(result.step_results[1].status, StepStatus::Failed);
    assert!(result.step_results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("Condition error"));
    assert_eq!(
        result.context.get("A"),
        Some(&ContextValue::Text("hello".to_string()))
    );
}

#[tokio::test]
async fn test_false_condition_skips_without_failing() {
    let recipe = Recipe::new(
        "skip",
        vec![
            Step::agent("classify", "classify").with_output("c").parse_json(),
            Step::command("qa", "run qa").with_condition("c.is_qa"),
            Step::command("report", "report {{c.label}}"),
        ],
    );
    let dispatcher =
        ScriptedDispatcher::default().output("classify", r#"{"is_qa": false, "label": "docs"}"#);
    let runner = executor(dispatcher);

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    assert!(result.success);
    let statuses: Vec<_> = result.step_results.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        vec![StepStatus::Completed, StepStatus::Skipped, StepStatus::Completed]
    );
}

#[tokio::test]
async fn test_first_failure_stops_the_run() {
    let steps: Vec<Step> = (0..5)
        .map(|i| Step::command(format!("s{i}"), format!("echo {i}")))
        .collect();
    let recipe = Recipe::new("stop", steps);
    let runner = executor(ScriptedDispatcher::default().failure("s2", "boom"));

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    let ids: Vec<_> = result.step_results.iter().map(|r| r.step_id.as_str()).collect();
    assert_eq!(ids, vec!["s0", "s1", "s2"]);
    assert_eq!(result.failed_step().map(|r| r.step_id.as_str()), Some("s2"));
    assert!(result.step_results[2].error.as_deref().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_templates_see_defaults_overrides_and_prior_outputs() {
    let recipe = Recipe::new(
        "thread",
        vec![
            Step::command("first", "echo {{ target }}").with_output("first"),
            Step::agent("second", "Fix {{first}} in {{repo}}"),
        ],
    )
    .with_default("target", json!("default-target"))
    .with_default("repo", json!("recipes"));

    let mut overrides = RecipeContext::new();
    overrides.set("target", "caller-target");
    let dispatcher = ScriptedDispatcher::default().output("first", "src/lib.rs");
    let runner = executor(dispatcher);

    let result = runner.execute(&recipe, overrides, false).await;

    assert!(result.success);
    let calls = runner_calls(&runner);
    assert_eq!(
        calls,
        vec![
            ("first".to_string(), "echo caller-target".to_string()),
            ("second".to_string(), "Fix src/lib.rs in recipes".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unresolved_template_fails_before_launch() {
    let recipe = Recipe::new("missing", vec![Step::command("a", "echo {{nothing}}")]);
    let runner = executor(ScriptedDispatcher::default());

    let result = runner.execute(&recipe, RecipeContext::new(), false).await;

    assert!(!result.success);
    assert!(result.step_results[0]
        .error
        .as_deref()
        .unwrap()
        .contains("{{nothing}}"));
    assert!(runner_calls(&runner).is_empty());
}

#[tokio::test]
async fn test_dry_run_never_fails_and_launches_nothing() -> Result<()> {
    let recipe = Recipe::new(
        "dry",
        vec![
            Step::agent("classify", "Classify {{task}}").with_output("c").parse_json(),
            Step::command("qa", "run {{c.suite}}").with_condition("c.is_qa == true"),
            Step::command("broken", "echo {{undefined.value}}").with_condition("undefined.flag"),
            Step::command("bad-syntax", "echo").with_condition("(((("),
        ],
    );
    let runner = executor(ScriptedDispatcher::default().failure("classify", "must not run"));

    let result = runner.execute(&recipe, RecipeContext::new(), true).await;

    assert!(result.success);
    assert!(result.dry_run);
    assert_eq!(result.step_results.len(), 4);
    assert!(result
        .step_results
        .iter()
        .all(|r| r.status == StepStatus::Completed));
    assert!(runner_calls(&runner).is_empty());
    assert!(matches!(
        result.context.get("c"),
        Some(ContextValue::Unparsed { .. })
    ));

    let json = serde_json::to_value(&result)?;
    assert_eq!(json["dry_run"], json!(true));
    Ok(())
}

#[tokio::test]
async fn test_independent_runs_do_not_share_context() {
    let recipe = Recipe::new(
        "isolated",
        vec![Step::command("a", "echo {{ who }}").with_output("out")],
    );
    let runner = executor(ScriptedDispatcher::default().output("a", "ok"));

    let mut first = RecipeContext::new();
    first.set("who", "first");
    let mut second = RecipeContext::new();
    second.set("who", "second");

    let (one, two) = tokio::join!(
        runner.execute(&recipe, first, false),
        runner.execute(&recipe, second, false)
    );

    assert_eq!(one.context.get("who"), Some(&ContextValue::Text("first".into())));
    assert_eq!(two.context.get("who"), Some(&ContextValue::Text("second".into())));
}

fn runner_calls(runner: &RecipeExecutor<ScriptedDispatcher>) -> Vec<(String, String)> {
    runner.dispatcher().calls()
}
