//! Create command implementation.
//!
//! Runs the code-generation workflow for a description and an optional
//! diagram, streaming step names to stderr.

use anyhow::{Context, Result};
use colored::Colorize;
use graphwright_core::{
    CodegenModels, CodegenSettings, CommandLinter, GraphwrightConfig, build_codegen_graph, user_request,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::image_data_url;
use crate::config;

/// Options collected from the `create` subcommand.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub description: String,
    pub diagram: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub engine: Option<String>,
    pub model: Option<String>,
    pub max_tries: Option<usize>,
}

/// Execute the create command.
pub async fn execute(mut config: GraphwrightConfig, options: CreateOptions) -> Result<()> {
    apply_overrides(&mut config, &options);

    let code = config::create_model(&config, &config.model.model)?;
    let vision =
        if config.vision_model() == config.model.model { code.clone() } else { config::create_model(&config, config.vision_model())? };

    let docs = Arc::new(config::docs_cache(&config)?);
    let linter = Arc::new(CommandLinter::new(config.lint.command.clone(), config.lint.args.clone()));
    let settings = CodegenSettings::from_config(&config);
    debug!(max_tries = settings.max_tries, termination = %settings.termination, "Building workflow");

    let graph = build_codegen_graph(CodegenModels { vision, code }, docs, linter, &settings)?;

    let image = options.diagram.as_deref().map(image_data_url).transpose()?;
    let request = user_request(&options.description, image);

    let run = graph
        .run_with_observer(request, |event| {
            eprintln!("{} {}...", "Running step".cyan(), event.node.bold());
        })
        .await
        .context("Workflow failed")?;

    let code = run.final_output().unwrap_or_default();
    match options.output {
        Some(path) => {
            write_code(&path, &code)?;
            eprintln!("{} {}", "✓ Wrote".green(), path.display());
        }
        None => println!("{code}"),
    }

    Ok(())
}

/// Writes the final artifact exactly as produced.
fn write_code(path: &Path, code: &str) -> Result<()> {
    std::fs::write(path, code).with_context(|| format!("Failed to write {}", path.display()))
}

fn apply_overrides(config: &mut GraphwrightConfig, options: &CreateOptions) {
    if let Some(ref engine) = options.engine {
        config.model.engine.clone_from(engine);
    }
    if let Some(ref model) = options.model {
        config.model.model.clone_from(model);
    }
    if let Some(max_tries) = options.max_tries {
        config.workflow.max_tries = max_tries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags_override_config() {
        let mut config = GraphwrightConfig::default();
        let options = CreateOptions {
            description: "graph".to_string(),
            engine: Some("mock".to_string()),
            model: Some("gpt-4o-mini".to_string()),
            max_tries: Some(5),
            ..CreateOptions::default()
        };

        apply_overrides(&mut config, &options);

        assert_eq!(config.model.engine, "mock");
        assert_eq!(config.model.model, "gpt-4o-mini");
        assert_eq!(config.workflow.max_tries, 5);
    }

    #[test]
    fn test_output_file_holds_artifact_verbatim() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("graph.py");
        let code = "\"\"\"\nCounts\n\"\"\"\n\n\n\ndef count(): pass";

        write_code(&path, code).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), code);
    }

    #[test]
    fn test_missing_flags_keep_config() {
        let mut config = GraphwrightConfig::default();
        apply_overrides(&mut config, &CreateOptions::default());
        assert_eq!(config.model.engine, "openai");
        assert_eq!(config.workflow.max_tries, 3);
    }
}
