//! Predict command implementation.
//!
//! Each input becomes one JSON line: `{"input": .., "schema": ..}` on
//! success or `{"input": .., "error": ..}` on failure.

use anyhow::{Context, Result, bail};
use colored::Colorize;
use graphwright_core::{GraphPredictor, GraphSchema, GraphwrightConfig, PredictError, PredictionInput};
use serde_json::{Value, json};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{image_data_url, is_image};
use crate::config;

/// Execute the predict command.
pub async fn execute(
    config: &GraphwrightConfig,
    inputs: &[PathBuf],
    output: Option<&Path>,
    concurrency: Option<usize>,
) -> Result<()> {
    let items = inputs.iter().map(|path| load_input(path)).collect::<Result<Vec<_>>>()?;

    let model = config::create_model(config, config.vision_model())?;
    let predictor = GraphPredictor::new(model, config.model_parameters(), config.predict.attempts);
    let results = predictor.predict_batch(&items, concurrency.unwrap_or(config.predict.concurrency)).await;

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let mut body = String::new();
    for (item, result) in items.iter().zip(results) {
        body.push_str(&result_line(&item.label, result)?);
        body.push('\n');
    }

    match output {
        Some(path) => {
            std::fs::write(path, &body).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        None => {
            std::io::stdout().write_all(body.as_bytes())?;
        }
    }

    let summary = format!("{succeeded}/{} graphs predicted", items.len());
    if succeeded == items.len() {
        eprintln!("{} {summary}", "✓".green());
    } else {
        eprintln!("{} {summary}", "!".yellow());
    }
    Ok(())
}

/// Reads one input file: images become data URLs, notebooks are flattened
/// to their cell sources and anything else is read as text.
fn load_input(path: &Path) -> Result<PredictionInput> {
    let label = path.display().to_string();
    if is_image(path) {
        return Ok(PredictionInput::image(label, image_data_url(path)?));
    }

    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("ipynb")) {
        notebook_text(&raw).with_context(|| format!("Failed to parse notebook {}", path.display()))?
    } else {
        raw
    };
    Ok(PredictionInput::text(label, text))
}

/// Joins the sources of every notebook cell.
fn notebook_text(raw: &str) -> Result<String> {
    let notebook: Value = serde_json::from_str(raw)?;
    let Some(cells) = notebook.get("cells").and_then(Value::as_array) else {
        bail!("notebook has no cells");
    };

    let sources: Vec<String> = cells
        .iter()
        .filter_map(|cell| match cell.get("source")? {
            Value::String(source) => Some(source.clone()),
            Value::Array(lines) => Some(lines.iter().filter_map(Value::as_str).collect()),
            _ => None,
        })
        .filter(|source| !source.trim().is_empty())
        .collect();
    Ok(sources.join("\n\n"))
}

fn result_line(label: &str, result: Result<GraphSchema, PredictError>) -> Result<String> {
    let line = match result {
        Ok(schema) => json!({ "input": label, "schema": schema }),
        Err(e) => json!({ "input": label, "error": e.to_string() }),
    };
    Ok(serde_json::to_string(&line)?)
}
