// crates/recipe-cli/src/lib.rs
pub mod args;
pub mod cli;
pub mod commands;
pub mod error;
pub mod loader;
pub mod progress;
pub mod response_formatter;
