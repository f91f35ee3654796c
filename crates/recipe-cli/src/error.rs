use recipe_core::{ConfigError, RecipeError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read recipe '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse recipe '{}': {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("invalid recipe '{}': {source}", .path.display())]
    Validation {
        path: PathBuf,
        #[source]
        source: RecipeError,
    },
    #[error("invalid --set value '{0}': expected KEY=VALUE")]
    InvalidOverride(String),
    #[error("interrupted")]
    Interrupted,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Interrupted => 130,
            _ => 1,
        }
    }
}
