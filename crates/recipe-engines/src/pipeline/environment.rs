// crates/recipe-engines/src/pipeline/environment.rs
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::process::Command;

/// Environment handed to a child process.
///
/// Built from a snapshot of the parent's variables with the configured markers
/// removed. The parent environment is never modified, so concurrent runs in the
/// same process cannot observe each other's changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl ChildEnvironment {
    pub fn from_parent(stripped: &[String]) -> Self {
        Self::from_vars(std::env::vars_os(), stripped)
    }

    pub fn from_vars<I>(vars: I, stripped: &[String]) -> Self
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let vars = vars
            .into_iter()
            .filter(|(key, _)| !stripped.iter().any(|name| OsStr::new(name) == key))
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(OsStr::new(key))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replaces the command's inherited environment with this one.
    pub fn apply(&self, command: &mut Command) {
        command.env_clear().envs(&self.vars);
    }
}
