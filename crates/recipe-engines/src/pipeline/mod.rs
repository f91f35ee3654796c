// crates/recipe-engines/src/pipeline/mod.rs
//! Building blocks used by the recipe executor.
//!
//! - `agent_executor`: long-running agent subprocesses with a monitored log file
//! - `command_executor`: bounded shell commands
//! - `condition_executor`: the `condition:` expression language
//! - `variable_expander`: `{{ path }}` template resolution
//! - `step_executor`: dispatch of a resolved step to its profile

pub mod agent_executor;
pub mod command_executor;
pub mod condition_executor;
pub mod environment;
pub mod log_monitor;
pub mod step_executor;
pub mod variable_expander;

mod process;
