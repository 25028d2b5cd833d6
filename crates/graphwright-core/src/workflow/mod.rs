//! Code-generation workflow.
//!
//! The workflow is an explicit directed graph of named nodes. Each node reads
//! the conversation and returns messages to append; edges decide which node
//! runs next. [`build_codegen_graph`] assembles the route, generate, format,
//! lint and fix graph used by `graphwright create`.

pub mod codegen;
pub mod graph;
pub mod nodes;
pub mod termination;

pub use codegen::{build_codegen_graph, required_steps, user_request, CodegenModels, CodegenSettings};
pub use graph::{Edge, GraphBuilder, StepEvent, Transition, WorkflowGraph, WorkflowNode, WorkflowRun};
pub use termination::{pick_route, should_regenerate, TerminationMode};

use crate::docs::DocsError;
use crate::lint::LintError;
use crate::structured::StructuredError;
use graphwright_abstraction::ModelError;
use thiserror::Error;

/// Entry node; routes on input modality.
pub const ENTER: &str = "enter";
/// Describes a diagram in free text.
pub const INTERPRET_IMAGE: &str = "interpret_image";
/// Generates code from a text request.
pub const GENERATE_CODE: &str = "generate_code";
/// Coerces free text into a code artifact.
pub const FORMAT_CODE: &str = "format_code";
/// Runs the linter over the latest code.
pub const LINT_CODE: &str = "lint_code";
/// Revises code after a lint failure.
pub const FIX_CODE: &str = "fix_code";

/// Errors that abort a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A model call failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// A structured model reply could not be obtained.
    #[error("Structured output error: {0}")]
    Structured(#[from] StructuredError),

    /// The linter could not be run.
    #[error("Lint error: {0}")]
    Lint(#[from] LintError),

    /// Reference documentation could not be loaded.
    #[error("Docs error: {0}")]
    Docs(#[from] DocsError),

    /// The graph failed validation when it was built.
    #[error("Invalid workflow graph: {0}")]
    InvalidGraph(String),

    /// An edge selected a node that does not exist.
    #[error("Unknown node: {0}")]
    UnknownNode(String),

    /// The run executed more nodes than allowed.
    #[error("Step limit of {limit} reached before node '{node}'")]
    StepLimit {
        /// Configured limit.
        limit: usize,
        /// Node that would have run next.
        node: String,
    },

    /// A node that reads the tail ran on an empty conversation.
    #[error("Node '{0}' received an empty conversation")]
    EmptyConversation(String),
}
