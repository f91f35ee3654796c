// crates/recipe-engines/src/lib.rs
//! Execution side of the recipe runner.
//!
//! [`RecipeExecutor`] walks a recipe's steps in order, evaluates conditions,
//! resolves templates, dispatches each step to the agent or command profile and
//! threads outputs through the [`recipe_core::RecipeContext`].

pub mod pipeline;
pub mod recipe_executor;

pub use pipeline::agent_executor::AgentExecutor;
pub use pipeline::command_executor::CommandExecutor;
pub use pipeline::condition_executor::ConditionEvaluator;
pub use pipeline::environment::ChildEnvironment;
pub use pipeline::log_monitor::{LogProgressSink, ProgressSink};
pub use pipeline::step_executor::{ProcessDispatcher, StepDispatcher};
pub use pipeline::variable_expander::VariableExpander;
pub use recipe_executor::{validate_recipe, RecipeExecutor};
