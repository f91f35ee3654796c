//! Loading recipes from YAML files.

use crate::error::CliError;
use log::debug;
use recipe_core::Recipe;
use recipe_engines::validate_recipe;
use std::path::{Path, PathBuf};

/// Reads and parses a recipe without validating it.
pub fn read_recipe(path: &Path) -> Result<Recipe, CliError> {
    debug!("Loading recipe from {}", path.display());
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_recipe(&content, path)
}

pub fn parse_recipe(content: &str, origin: &Path) -> Result<Recipe, CliError> {
    if content.trim().is_empty() {
        return Err(CliError::Parse {
            path: origin.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }
    serde_yaml::from_str(content).map_err(|e| CliError::Parse {
        path: origin.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Reads, parses and validates a recipe, including condition syntax.
pub fn load_recipe(path: &Path) -> Result<Recipe, CliError> {
    let recipe = read_recipe(path)?;
    validate_recipe(&recipe).map_err(|source| CliError::Validation {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(recipe)
}

/// `*.yaml` and `*.yml` files directly inside `dir`, sorted by path.
pub fn find_recipes(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for extension in ["yaml", "yml"] {
        let pattern = dir.join(format!("*.{}", extension));
        for entry in glob::glob(&pattern.to_string_lossy())? {
            paths.push(entry?);
        }
    }
    paths.sort();
    Ok(paths)
}
