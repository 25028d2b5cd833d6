//! Score command implementation.

use anyhow::{Context, Result};
use colored::Colorize;
use graphwright_core::{GraphSchema, evaluate};
use std::path::Path;

/// Execute the score command.
pub fn execute(predicted: &Path, expected: &Path, json: bool) -> Result<()> {
    let predicted_graph = read_graph(predicted)?;
    let expected_graph = read_graph(expected)?;
    let report = evaluate(&predicted_graph, &expected_graph);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Evaluation".bold());
    println!("{report}");

    let issues = predicted_graph.validate();
    if !issues.is_empty() {
        eprintln!();
        for issue in issues {
            eprintln!("{} {issue}", "Warning:".yellow());
        }
    }
    Ok(())
}

fn read_graph(path: &Path) -> Result<GraphSchema> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    GraphSchema::from_json_str(&raw).with_context(|| format!("{} is not a valid graph", path.display()))
}
