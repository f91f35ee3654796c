/// CLI command modules, one per subcommand
pub mod list;
pub mod run;
pub mod show;
pub mod validate;

use anyhow::Result;
use recipe_core::RunnerConfig;

/// Trait for CLI command handlers
#[allow(async_fn_in_trait)]
pub trait CommandHandler {
    /// Execute the command with the given runner configuration
    async fn execute(&self, config: &RunnerConfig) -> Result<CommandResult>;
}

/// Command execution result
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
        }
    }
}
