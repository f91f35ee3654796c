//! Rendering of recipes and run results for the terminal.

use crate::args::OutputFormat;
use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;
use recipe_core::{Recipe, RecipeResult, StepKind, StepResult, StepStatus};
use recipe_engines::VariableExpander;
use std::fmt::Write;
use std::time::Duration;

const DETAIL_WIDTH: usize = 72;

pub fn render_result(result: &RecipeResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)
            .map_err(|e| anyhow!("Failed to serialize result: {}", e)),
        OutputFormat::Yaml => serde_yaml::to_string(result)
            .map_err(|e| anyhow!("Failed to serialize result: {}", e)),
        OutputFormat::Table => Ok(result_table(result)),
    }
}

pub fn render_recipe(recipe: &Recipe, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(recipe)
            .map_err(|e| anyhow!("Failed to serialize recipe: {}", e)),
        OutputFormat::Yaml => serde_yaml::to_string(recipe)
            .map_err(|e| anyhow!("Failed to serialize recipe: {}", e)),
        OutputFormat::Table => Ok(recipe_table(recipe)),
    }
}

fn result_table(result: &RecipeResult) -> String {
    let mut out = String::new();
    let id_width = column_width(result.step_results.iter().map(|r| r.step_id.as_str()));
    let mode = if result.dry_run { ", dry run" } else { "" };

    let _ = writeln!(
        out,
        "Recipe: {} ({} steps{}, {})",
        result.recipe_name.bold(),
        result.step_results.len(),
        mode,
        format_duration(result.duration)
    );
    for step in &result.step_results {
        let _ = writeln!(
            out,
            "  {}  {:<id_width$}  {:>7}  {}",
            status_cell(step.status),
            step.step_id,
            format_duration(step.elapsed()),
            step_detail(step),
        );
    }

    match result.failed_step() {
        Some(failed) => {
            let _ = write!(out, "{} at step '{}'", "FAILED".red().bold(), failed.step_id);
        }
        None => {
            let _ = write!(out, "{}", "SUCCESS".green().bold());
        }
    }
    out
}

fn recipe_table(recipe: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Recipe: {}", recipe.name.bold());
    if let Some(description) = &recipe.description {
        let _ = writeln!(out, "Description: {}", description);
    }
    if !recipe.context.is_empty() {
        let names: Vec<&str> = recipe.context.keys().map(String::as_str).collect();
        let _ = writeln!(out, "Defaults: {}", names.join(", "));
    }

    for (index, step) in recipe.steps.iter().enumerate() {
        let _ = writeln!(out);
        let kind = match step.kind {
            StepKind::Agent => "agent".magenta().to_string(),
            StepKind::Command => "command".cyan().to_string(),
        };
        let _ = writeln!(out, "{}. {} [{}]", index + 1, step.id.bold(), kind);
        let _ = writeln!(out, "   run:       {}", truncate(first_line(&step.template), DETAIL_WIDTH));
        if let Some(output) = &step.output {
            let parsing = if step.parse_json { " (parsed as JSON)" } else { "" };
            let _ = writeln!(out, "   output:    {}{}", output, parsing);
        }
        if let Some(condition) = &step.condition {
            let _ = writeln!(out, "   condition: {}", condition);
        }
        if let Some(timeout) = step.timeout {
            let _ = writeln!(out, "   timeout:   {}s", timeout);
        }
        let references = VariableExpander::referenced_paths(&step.template);
        if !references.is_empty() {
            let _ = writeln!(out, "   uses:      {}", references.join(", "));
        }
    }
    out.trim_end().to_string()
}

fn status_cell(status: StepStatus) -> String {
    let label = format!("{:<9}", status.to_string());
    match status {
        StepStatus::Completed => label.green().to_string(),
        StepStatus::Skipped => label.yellow().to_string(),
        StepStatus::Failed => label.red().to_string(),
    }
}

fn step_detail(step: &StepResult) -> String {
    match step.status {
        StepStatus::Failed => truncate(
            first_line(step.error.as_deref().unwrap_or_default()),
            DETAIL_WIDTH,
        ),
        StepStatus::Skipped => "condition is false".to_string(),
        StepStatus::Completed => step
            .output
            .as_deref()
            .map(|output| truncate(first_line(output), DETAIL_WIDTH))
            .unwrap_or_default(),
    }
}

fn column_width<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    values.map(|v| v.chars().count()).max().unwrap_or(0).max(4)
}

fn first_line(text: &str) -> &str {
    text.lines().find(|line| !line.trim().is_empty()).unwrap_or("").trim()
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let short: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", short)
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{}m{:02}s", duration.as_secs() / 60, duration.as_secs() % 60)
    }
}
