//! Main CLI entry point and command routing

use anyhow::Result;
use clap::Parser;
use log::debug;
use owo_colors::OwoColorize;
use recipe_core::RunnerConfig;
use std::path::Path;

use crate::args::{Commands, RecipeArgs};
use crate::commands::{
    list::ListCommand, run::RunCommand, show::ShowCommand, validate::ValidateCommand,
    CommandHandler, CommandResult,
};
use crate::error::CliError;

/// Parses the command line, runs the command and returns the process exit code.
pub async fn run() -> i32 {
    let args = match RecipeArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };

    match run_with_args(args).await {
        Ok(result) => {
            if let Some(message) = result.message {
                eprintln!("{}", message);
            }
            if result.success {
                0
            } else {
                1
            }
        }
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            err.downcast_ref::<CliError>().map_or(1, CliError::exit_code)
        }
    }
}

pub async fn run_with_args(args: RecipeArgs) -> Result<CommandResult> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Commands::Run(run) => RunCommand::new(run).execute(&config).await,
        Commands::List(list) => ListCommand::new(list).execute(&config).await,
        Commands::Validate(validate) => ValidateCommand::new(validate).execute(&config).await,
        Commands::Show(show) => ShowCommand::new(show).execute(&config).await,
    }
}

/// Built-in defaults unless a config file is given.
pub fn load_config(path: Option<&Path>) -> Result<RunnerConfig, CliError> {
    match path {
        Some(path) => Ok(RunnerConfig::load(path)?),
        None => {
            debug!("No config file given, using defaults");
            Ok(RunnerConfig::default())
        }
    }
}
