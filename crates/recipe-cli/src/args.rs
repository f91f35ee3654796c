use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recipe-runner", version, about = "Run multi-step agent and shell recipes")]
pub struct RecipeArgs {
    #[arg(
        short,
        long,
        global = true,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        env = "RECIPE_RUNNER_CONFIG",
        help = "TOML file with agent and command profile settings"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Execute a recipe")]
    Run(RunArgs),
    #[command(about = "List recipes in a directory")]
    List(ListArgs),
    #[command(about = "Check a recipe without running it")]
    Validate(ValidateArgs),
    #[command(about = "Print the steps of a recipe")]
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    #[arg(
        short = 's',
        long = "set",
        value_name = "KEY=VALUE",
        action = ArgAction::Append,
        help = "Context value overriding the recipe default; VALUE is parsed as JSON when possible"
    )]
    pub set: Vec<String>,

    #[arg(long, action = ArgAction::SetTrue, help = "Show what would run without launching anything")]
    pub dry_run: bool,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[arg(value_name = "DIR", default_value = ".", value_hint = ValueHint::DirPath)]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
