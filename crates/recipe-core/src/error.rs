// crates/recipe-core/src/error.rs
use std::io;
use thiserror::Error;

/// Errors raised while looking up a dotted path in the recipe context.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContextError {
    #[error("variable '{0}' is not defined")]
    MissingVariable(String),

    #[error("'{path}' has no field '{field}'")]
    MissingField { path: String, field: String },

    /// A dotted step traversed into a value that is not structured.
    #[error("cannot access '{field}' on '{path}': value is {found}, not structured data")]
    NotStructured {
        path: String,
        field: String,
        found: &'static str,
    },
}

/// Errors raised by the condition evaluator. Never coerced to `false`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("invalid expression '{expression}': {reason}")]
    Syntax { expression: String, reason: String },

    #[error(transparent)]
    Lookup(#[from] ContextError),

    #[error("cannot compare {left} {op} {right}")]
    TypeMismatch {
        left: String,
        op: &'static str,
        right: String,
    },
}

/// Failure of a single step. Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Template error: unresolved reference '{{{{{variable}}}}}': {reason}")]
    TemplateResolution { variable: String, reason: String },

    #[error("Condition error: {0}")]
    ConditionEvaluation(#[from] ConditionError),

    #[error("Command timed out after {seconds} seconds and was terminated")]
    SubprocessTimeout { seconds: u64 },

    #[error("Failed to launch '{program}': {source}")]
    SubprocessLaunch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}: {detail}")]
    SubprocessExit {
        program: String,
        status: String,
        detail: String,
    },

    #[error("parse_json failed for step '{step_id}': no JSON value could be extracted from the output")]
    JsonExtraction { step_id: String },

    #[error("I/O error during step execution: {0}")]
    Io(#[from] io::Error),
}

/// Problems found while validating a recipe definition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RecipeError {
    #[error("recipe name must not be empty")]
    EmptyName,

    #[error("recipe '{0}' has no steps")]
    NoSteps(String),

    #[error("step #{0} has an empty id")]
    EmptyStepId(usize),

    #[error("duplicate step id '{0}'")]
    DuplicateStepId(String),

    #[error("step '{0}' has an empty prompt/command")]
    EmptyTemplate(String),

    #[error("agent step '{0}' cannot declare a timeout")]
    AgentTimeout(String),

    #[error("command step '{0}' has a zero timeout")]
    ZeroTimeout(String),

    #[error("step '{step}' has an invalid condition: {reason}")]
    InvalidCondition { step: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration value for '{parameter}': {reason}")]
    InvalidValue { parameter: String, reason: String },
}
