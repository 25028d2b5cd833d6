//! Assembly of the code-generation graph.

use super::graph::{GraphBuilder, WorkflowGraph, DEFAULT_MAX_STEPS};
use super::nodes::{CodeFixerNode, CodeFormatterNode, CodeGeneratorNode, EnterNode, ImageInterpreterNode, LintNode};
use super::termination::{pick_route, should_regenerate, TerminationMode};
use super::{WorkflowError, ENTER, FIX_CODE, FORMAT_CODE, GENERATE_CODE, INTERPRET_IMAGE, LINT_CODE};
use crate::config::GraphwrightConfig;
use crate::conversation::Conversation;
use crate::docs::DocsCache;
use crate::lint::Linter;
use graphwright_abstraction::{ContentPart, Model, ModelParameters};
use std::sync::Arc;
use tracing::debug;

/// Maximum tokens requested from the diagram interpreter.
pub const INTERPRETER_MAX_TOKENS: u32 = 1028;

/// Node executions a run needs to reach the lint/fix cap on the image path:
/// enter, interpret, format, then one lint per try and one fix between tries.
#[must_use]
pub const fn required_steps(max_tries: usize) -> usize {
    2 * max_tries + 2
}

/// Loop and generation settings of the code-generation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CodegenSettings {
    /// Reviewer messages after which the loop stops.
    pub max_tries: usize,
    /// Stop rule of the lint/fix loop.
    pub termination: TerminationMode,
    /// Node executions allowed per run; raised to [`required_steps`] when
    /// lower so a capped loop always finishes.
    pub max_steps: usize,
    /// Parameters for every model call.
    pub parameters: ModelParameters,
}

impl Default for CodegenSettings {
    fn default() -> Self {
        Self {
            max_tries: 3,
            termination: TerminationMode::default(),
            max_steps: DEFAULT_MAX_STEPS,
            parameters: ModelParameters::deterministic(),
        }
    }
}

impl CodegenSettings {
    /// Settings taken from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &GraphwrightConfig) -> Self {
        Self {
            max_tries: config.workflow.max_tries,
            termination: config.workflow.termination,
            max_steps: config.workflow.max_steps,
            parameters: config.model_parameters(),
        }
    }
}

/// Models used by the graph.
#[derive(Clone)]
pub struct CodegenModels {
    /// Multimodal model that reads diagrams.
    pub vision: Arc<dyn Model>,
    /// Model that writes, formats and fixes code.
    pub code: Arc<dyn Model>,
}

impl CodegenModels {
    /// Uses the same model for every node.
    #[must_use]
    pub fn single(model: Arc<dyn Model>) -> Self {
        Self { vision: model.clone(), code: model }
    }
}

/// Builds the route, generate, format, lint and fix graph.
///
/// # Errors
/// Returns `WorkflowError::InvalidGraph` if `settings.max_steps` is zero.
pub fn build_codegen_graph(
    models: CodegenModels,
    docs: Arc<DocsCache>,
    linter: Arc<dyn Linter>,
    settings: &CodegenSettings,
) -> Result<WorkflowGraph, WorkflowError> {
    if settings.max_steps == 0 {
        return Err(WorkflowError::InvalidGraph("step limit must be at least 1".to_string()));
    }
    let max_steps = settings.max_steps.max(required_steps(settings.max_tries));
    if max_steps > settings.max_steps {
        debug!(configured = settings.max_steps, max_steps, max_tries = settings.max_tries, "Raising step limit");
    }

    let interpreter_parameters = ModelParameters {
        max_tokens: Some(settings.parameters.max_tokens.unwrap_or(INTERPRETER_MAX_TOKENS)),
        ..settings.parameters.clone()
    };
    let max_tries = settings.max_tries;
    let termination = settings.termination;

    GraphBuilder::new()
        .add_node(ENTER, Arc::new(EnterNode))
        .add_node(
            INTERPRET_IMAGE,
            Arc::new(ImageInterpreterNode::new(models.vision, docs.clone(), interpreter_parameters)),
        )
        .add_node(
            GENERATE_CODE,
            Arc::new(CodeGeneratorNode::new(models.code.clone(), docs.clone(), settings.parameters.clone())),
        )
        .add_node(FORMAT_CODE, Arc::new(CodeFormatterNode::new(models.code.clone(), settings.parameters.clone())))
        .add_node(LINT_CODE, Arc::new(LintNode::new(linter)))
        .add_node(FIX_CODE, Arc::new(CodeFixerNode::new(models.code, docs, settings.parameters.clone())))
        .add_branch(ENTER, pick_route)
        .add_edge(INTERPRET_IMAGE, FORMAT_CODE)
        .add_edge(GENERATE_CODE, LINT_CODE)
        .add_edge(FORMAT_CODE, LINT_CODE)
        .add_edge(FIX_CODE, LINT_CODE)
        .add_branch(LINT_CODE, move |conversation| should_regenerate(conversation, max_tries, termination))
        .set_entry(ENTER)
        .with_max_steps(max_steps)
        .build()
}

/// Initial conversation for a request, with an optional diagram as an image
/// data URL placed before the description.
#[must_use]
pub fn user_request(description: &str, image_url: Option<String>) -> Conversation {
    match image_url {
        Some(url) => Conversation::from_user(vec![ContentPart::image_url(url), ContentPart::text(description)]),
        None => Conversation::from_user(description),
    }
}
