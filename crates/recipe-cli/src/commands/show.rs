use anyhow::Result;
use log::warn;
use recipe_core::RunnerConfig;
use recipe_engines::validate_recipe;

use super::{CommandHandler, CommandResult};
use crate::args::ShowArgs;
use crate::loader::read_recipe;
use crate::response_formatter::render_recipe;

pub struct ShowCommand {
    args: ShowArgs,
}

impl ShowCommand {
    pub fn new(args: ShowArgs) -> Self {
        Self { args }
    }
}

impl CommandHandler for ShowCommand {
    async fn execute(&self, _config: &RunnerConfig) -> Result<CommandResult> {
        let recipe = read_recipe(&self.args.file)?;
        if let Err(e) = validate_recipe(&recipe) {
            warn!("Recipe '{}' would not pass validation: {}", recipe.name, e);
        }
        println!("{}", render_recipe(&recipe, self.args.format)?);
        Ok(CommandResult::success())
    }
}
