//! Graphwright Core - code-generation workflow and graph IR tooling.
//!
//! This crate provides:
//! - The conversation model threaded through a workflow run
//! - The code-generation graph (route, generate, format, lint, fix)
//! - The reference documentation cache and crawler
//! - Graph IR prediction, validation and evaluation
//! - Layered configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use graphwright_core::{
//!     CodegenModels, CodegenSettings, CommandLinter, DocsCache, build_codegen_graph, user_request,
//! };
//! use graphwright_models::OpenAIModel;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = Arc::new(OpenAIModel::new("gpt-4o".to_string())?);
//!     let graph = build_codegen_graph(
//!         CodegenModels::single(model),
//!         Arc::new(DocsCache::offline("docs.json".into())),
//!         Arc::new(CommandLinter::ruff()),
//!         &CodegenSettings::default(),
//!     )?;
//!     let run = graph.run(user_request("write a counter graph", None)).await?;
//!     println!("{}", run.final_output().unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod config;
pub mod conversation;
pub mod docs;
pub mod extract;
pub mod lint;
pub mod prompts;
pub mod schema;
pub mod structured;
pub mod workflow;

pub use artifact::CodeArtifact;
pub use config::{ConfigError, GraphwrightConfig};
pub use conversation::{Author, Conversation, Message};
pub use docs::{DocsCache, DocsError, DocsIngestor, Document};
pub use extract::{JsonObjectExtractor, extract_json_objects, find_json_objects};
pub use lint::{CommandLinter, LintError, LintOutput, Linter};
pub use schema::{
    EvaluationReport, GraphEdge, GraphNode, GraphPredictor, GraphSchema, PredictError, PredictionInput,
    SchemaIssue, evaluate,
};
pub use structured::{StructuredError, StructuredRequest};
pub use workflow::{
    CodegenModels, CodegenSettings, TerminationMode, WorkflowError, WorkflowGraph, WorkflowRun,
    build_codegen_graph, user_request,
};
