use anyhow::{anyhow, Result};
use log::warn;
use owo_colors::OwoColorize;
use recipe_core::RunnerConfig;

use super::{CommandHandler, CommandResult};
use crate::args::ListArgs;
use crate::loader::{find_recipes, load_recipe};

pub struct ListCommand {
    args: ListArgs,
}

impl ListCommand {
    pub fn new(args: ListArgs) -> Self {
        Self { args }
    }
}

impl CommandHandler for ListCommand {
    async fn execute(&self, _config: &RunnerConfig) -> Result<CommandResult> {
        let dir = &self.args.dir;
        if !dir.is_dir() {
            return Err(anyhow!("'{}' is not a directory", dir.display()));
        }

        let paths = find_recipes(dir)?;
        if paths.is_empty() {
            println!("No recipes found in {}", dir.display());
            return Ok(CommandResult::success());
        }

        for path in paths {
            match load_recipe(&path) {
                Ok(recipe) => {
                    println!(
                        "{:<24} {:>3} steps  {}",
                        recipe.name.bold(),
                        recipe.steps.len(),
                        path.display()
                    );
                    if let Some(description) = &recipe.description {
                        println!("    {}", description.dimmed());
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    println!("{:<24} {}  {}", "(invalid)".red(), path.display(), e);
                }
            }
        }
        Ok(CommandResult::success())
    }
}
