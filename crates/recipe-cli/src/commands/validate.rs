use anyhow::Result;
use owo_colors::OwoColorize;
use recipe_core::RunnerConfig;

use super::{CommandHandler, CommandResult};
use crate::args::ValidateArgs;
use crate::loader::load_recipe;

pub struct ValidateCommand {
    args: ValidateArgs,
}

impl ValidateCommand {
    pub fn new(args: ValidateArgs) -> Self {
        Self { args }
    }
}

impl CommandHandler for ValidateCommand {
    async fn execute(&self, _config: &RunnerConfig) -> Result<CommandResult> {
        let recipe = load_recipe(&self.args.file)?;
        println!(
            "{} recipe '{}' is valid ({} steps)",
            "OK".green().bold(),
            recipe.name,
            recipe.steps.len()
        );
        Ok(CommandResult::success())
    }
}
