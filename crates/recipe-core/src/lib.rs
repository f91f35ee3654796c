// crates/recipe-core/src/lib.rs
//! Core types shared by the recipe runner crates.
//!
//! - [`types`]: recipes, steps and the results a run produces
//! - [`context`]: the ordered variable store threaded through a run
//! - [`output_interpreter`]: best-effort JSON extraction from subprocess text
//! - [`config`]: runner configuration for the execution profiles
//! - [`error`]: the error taxonomy used across the workspace

pub mod config;
pub mod context;
pub mod error;
pub mod output_interpreter;
pub mod types;

pub use context::{ContextValue, RecipeContext};
pub use config::RunnerConfig;
pub use error::{ConditionError, ConfigError, ContextError, RecipeError, StepError};
pub use output_interpreter::interpret;
pub use types::{Recipe, RecipeResult, Step, StepKind, StepResult, StepStatus};
