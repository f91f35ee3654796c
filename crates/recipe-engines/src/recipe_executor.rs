// crates/recipe-engines/src/recipe_executor.rs
use crate::pipeline::condition_executor::ConditionEvaluator;
use crate::pipeline::log_monitor::ProgressSink;
use crate::pipeline::step_executor::{ProcessDispatcher, StepDispatcher};
use crate::pipeline::variable_expander::VariableExpander;
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use recipe_core::output_interpreter::interpret_with_strategy;
use recipe_core::{
    ContextValue, Recipe, RecipeContext, RecipeError, RecipeResult, RunnerConfig, Step,
    StepError, StepResult, StepStatus,
};
use std::sync::Arc;
use std::time::Instant;

/// Full validation of a recipe: structure plus condition syntax.
pub fn validate_recipe(recipe: &Recipe) -> Result<(), RecipeError> {
    recipe.validate()?;
    for step in &recipe.steps {
        if let Some(condition) = &step.condition {
            ConditionEvaluator::parse(condition).map_err(|e| RecipeError::InvalidCondition {
                step: step.id.clone(),
                reason: e.to_string(),
            })?;
        }
    }
    Ok(())
}

/// What a step produced when it did not fail.
enum StepOutcome {
    Skipped,
    Completed { raw: String, value: ContextValue },
}

/// A step failure together with whatever raw output the step had produced.
struct StepFailure {
    error: StepError,
    output: Option<String>,
}

impl From<StepError> for StepFailure {
    fn from(error: StepError) -> Self {
        Self {
            error,
            output: None,
        }
    }
}

impl From<recipe_core::ConditionError> for StepFailure {
    fn from(error: recipe_core::ConditionError) -> Self {
        StepError::from(error).into()
    }
}

/// Runs recipes step by step, stopping at the first failure.
///
/// Each run owns its own [`RecipeContext`]; the executor itself holds no
/// per-run state, so one executor can drive concurrent runs.
pub struct RecipeExecutor<D = ProcessDispatcher> {
    dispatcher: D,
}

impl RecipeExecutor<ProcessDispatcher> {
    pub fn new(config: RunnerConfig) -> Self {
        Self::with_dispatcher(ProcessDispatcher::new(config))
    }

    pub fn with_progress_sink(config: RunnerConfig, sink: Arc<dyn ProgressSink>) -> Self {
        Self::with_dispatcher(ProcessDispatcher::with_progress_sink(config, sink))
    }
}

impl<D: StepDispatcher> RecipeExecutor<D> {
    pub fn with_dispatcher(dispatcher: D) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Executes `recipe`. Caller values in `initial_context` override the
    /// recipe's own defaults. In a dry run nothing is launched and conditions
    /// are not evaluated.
    pub async fn execute(
        &self,
        recipe: &Recipe,
        initial_context: RecipeContext,
        dry_run: bool,
    ) -> RecipeResult {
        let started = Instant::now();
        info!(
            "Executing recipe {} ({} steps{})",
            recipe.name,
            recipe.steps.len(),
            if dry_run { ", dry run" } else { "" }
        );

        let mut context = RecipeContext::seeded(&recipe.context, initial_context);
        let mut step_results = Vec::with_capacity(recipe.steps.len());

        for (index, step) in recipe.steps.iter().enumerate() {
            debug!("Processing step {} (index {})", step.id, index);
            let step_started = Utc::now();

            let result = if dry_run {
                preview_step(step, &mut context, step_started)
            } else {
                self.execute_step(step, &mut context, step_started).await
            };

            let failed = result.status == StepStatus::Failed;
            step_results.push(result);
            if failed {
                break;
            }
        }

        let result = RecipeResult::new(
            &recipe.name,
            step_results,
            context,
            started.elapsed(),
            dry_run,
        );
        if result.success {
            info!(
                "Recipe {} finished in {:.1}s",
                recipe.name,
                result.duration.as_secs_f64()
            );
        } else {
            error!("Recipe {} failed", recipe.name);
        }
        result
    }

    async fn execute_step(
        &self,
        step: &Step,
        context: &mut RecipeContext,
        started_at: DateTime<Utc>,
    ) -> StepResult {
        match self.run_step(step, context).await {
            Ok(StepOutcome::Skipped) => {
                info!("Step {} skipped: condition is false", step.id);
                StepResult::skipped(&step.id, started_at)
            }
            Ok(StepOutcome::Completed { raw, value }) => {
                if let Some(name) = &step.output {
                    debug!("Storing output of step {} as '{}'", step.id, name);
                    context.set(name.clone(), value);
                }
                info!("Step {} completed successfully", step.id);
                StepResult::completed(&step.id, Some(raw), started_at)
            }
            Err(failure) => {
                error!("Error executing step {}: {}", step.id, failure.error);
                StepResult::failed(
                    &step.id,
                    failure.error.to_string(),
                    failure.output,
                    started_at,
                )
            }
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        context: &RecipeContext,
    ) -> Result<StepOutcome, StepFailure> {
        if let Some(condition) = &step.condition {
            if !ConditionEvaluator::evaluate(condition, context)? {
                return Ok(StepOutcome::Skipped);
            }
        }

        let rendered = VariableExpander::resolve(&step.template, context)?;
        let raw = self.dispatcher.dispatch(step, &rendered).await?;

        if !step.parse_json {
            return Ok(StepOutcome::Completed {
                value: ContextValue::Text(raw.clone()),
                raw,
            });
        }

        match interpret_with_strategy(&raw) {
            Some((value, strategy)) => {
                debug!("Step {}: extracted JSON via {}", step.id, strategy);
                Ok(StepOutcome::Completed {
                    raw,
                    value: ContextValue::Structured(value),
                })
            }
            None => Err(StepFailure {
                error: StepError::JsonExtraction {
                    step_id: step.id.clone(),
                },
                output: Some(raw),
            }),
        }
    }
}

/// Dry-run handling of one step: render what would run, record a placeholder.
fn preview_step(step: &Step, context: &mut RecipeContext, started_at: DateTime<Utc>) -> StepResult {
    let preview = VariableExpander::render_lenient(&step.template, context);
    info!("[dry run] {} step {}: {}", step.kind, step.id, preview);
    if let Some(condition) = &step.condition {
        info!("[dry run] step {} condition not evaluated: {}", step.id, condition);
    }

    if let Some(name) = &step.output {
        context.set(
            name.clone(),
            ContextValue::unparsed(format!("[dry run] output of step '{}'", step.id)),
        );
    }
    StepResult::completed(&step.id, Some(format!("[dry run] {}", preview)), started_at)
}
