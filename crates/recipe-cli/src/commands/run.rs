use anyhow::Result;
use log::warn;
use recipe_core::{ContextValue, RecipeContext, RunnerConfig};
use recipe_engines::RecipeExecutor;
use serde_json::Value;
use std::sync::Arc;

use super::{CommandHandler, CommandResult};
use crate::args::RunArgs;
use crate::error::CliError;
use crate::loader::load_recipe;
use crate::progress::StderrProgressSink;
use crate::response_formatter::render_result;

/// `run` command handler
pub struct RunCommand {
    args: RunArgs,
}

impl RunCommand {
    pub fn new(args: RunArgs) -> Self {
        Self { args }
    }
}

impl CommandHandler for RunCommand {
    async fn execute(&self, config: &RunnerConfig) -> Result<CommandResult> {
        let recipe = load_recipe(&self.args.file)?;
        let overrides = parse_overrides(&self.args.set)?;
        let executor =
            RecipeExecutor::with_progress_sink(config.clone(), Arc::new(StderrProgressSink));

        // Dropping the run future kills any running child and removes its log.
        let result = tokio::select! {
            result = executor.execute(&recipe, overrides, self.args.dry_run) => result,
            _ = interrupted() => {
                warn!("Interrupted, abandoning recipe {}", recipe.name);
                return Err(CliError::Interrupted.into());
            }
        };

        println!("{}", render_result(&result, self.args.format)?);

        match result.failed_step() {
            None => Ok(CommandResult::success()),
            Some(failed) => Ok(CommandResult::error(format!(
                "Recipe '{}' failed at step '{}'",
                recipe.name, failed.step_id
            ))),
        }
    }
}

/// Resolves on Ctrl-C. Never resolves when the signal cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Parses `KEY=VALUE` pairs. Values that are valid JSON keep their type;
/// anything else is a plain string.
pub fn parse_overrides(pairs: &[String]) -> Result<RecipeContext, CliError> {
    pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| CliError::InvalidOverride(pair.clone()))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::InvalidOverride(pair.clone()));
            }
            let value = serde_json::from_str::<Value>(raw)
                .unwrap_or_else(|_| Value::String(raw.to_string()));
            Ok((key.to_string(), ContextValue::from_seed(value)))
        })
        .collect()
}
