// crates/recipe-engines/src/pipeline/variable_expander.rs
//! Template resolution for step prompts and commands.
//!
//! A reference is `{{ path }}` where `path` is a dotted context path, with
//! optional whitespace inside the braces. Anything between `{{` and `}}` that
//! is not a valid path is left as literal text.

use log::debug;
use recipe_core::context::render_json;
use recipe_core::{RecipeContext, StepError};

/// A `{{ path }}` occurrence in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference<'a> {
    start: usize,
    end: usize,
    path: &'a str,
}

/// Resolves `{{ path }}` references against a [`RecipeContext`].
pub struct VariableExpander;

impl VariableExpander {
    /// Substitutes every reference. An unresolvable reference is an error; it
    /// is never replaced by an empty string.
    pub fn resolve(template: &str, context: &RecipeContext) -> Result<String, StepError> {
        debug!("Resolving template: {}", template);
        let mut result = String::with_capacity(template.len());
        let mut cursor = 0;

        for reference in references(template) {
            let value =
                context
                    .lookup(reference.path)
                    .map_err(|e| StepError::TemplateResolution {
                        variable: reference.path.to_string(),
                        reason: e.to_string(),
                    })?;
            result.push_str(&template[cursor..reference.start]);
            result.push_str(&render_json(&value));
            cursor = reference.end;
        }

        result.push_str(&template[cursor..]);
        Ok(result)
    }

    /// Like [`resolve`](Self::resolve) but leaves unresolvable references in
    /// place. Used for dry-run previews.
    pub fn render_lenient(template: &str, context: &RecipeContext) -> String {
        let mut result = String::with_capacity(template.len());
        let mut cursor = 0;

        for reference in references(template) {
            result.push_str(&template[cursor..reference.start]);
            match context.lookup(reference.path) {
                Ok(value) => result.push_str(&render_json(&value)),
                Err(_) => result.push_str(&template[reference.start..reference.end]),
            }
            cursor = reference.end;
        }

        result.push_str(&template[cursor..]);
        result
    }

    /// Distinct referenced paths, in order of first appearance.
    pub fn referenced_paths(template: &str) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for reference in references(template) {
            if !paths.iter().any(|p| p == reference.path) {
                paths.push(reference.path.to_string());
            }
        }
        paths
    }
}

fn references(template: &str) -> Vec<Reference<'_>> {
    let mut found = Vec::new();
    let mut search_from = 0;

    while let Some(open) = template[search_from..].find("{{") {
        let start = search_from + open;
        let Some(close) = template[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + close + 2;
        let path = template[start + 2..end - 2].trim();

        if is_valid_path(path) {
            found.push(Reference { start, end, path });
            search_from = end;
        } else {
            search_from = start + 1;
        }
    }

    found
}

fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        })
}
