//! System prompts for the workflow nodes and the graph predictor.

/// Wraps the reference corpus for inclusion in a system prompt.
#[must_use]
pub fn with_docs(instructions: &str, docs: &str) -> String {
    format!("{instructions}\n\nReference documentation:\n<docs>\n{docs}\n</docs>")
}

/// Image interpreter instructions.
pub const IMAGE_INTERPRETER: &str = "You convert graph diagrams into LangGraph applications. \
The image shows nodes as circles and edges as squares, each with a label. \
Using the reference documentation, write: (1) a placeholder state type, \
(2) a placeholder function for every node and edge, and (3) the graph that wires them together. \
Start with a short description of the solution, then list the imports, then the code.";

/// Code generator instructions.
pub const CODE_GENERATOR: &str = "You are an expert Python developer. \
Build an application for the user's problem with LangGraph, following the reference documentation. \
Answer with a description of the approach, the import statements, and the code without imports.";

/// Code formatter instructions.
pub const CODE_FORMATTER: &str = "You format code solutions. \
Split the solution into a description of the problem, the import statements, and the functioning code block.";

/// Trailing instruction sent after the message being formatted.
pub const FORMAT_LAST_MESSAGE: &str = "Extract the code from the last message and format it.";

/// Code fixer instructions.
pub const CODE_FIXER: &str = "You are an expert Python developer who knows LangGraph. \
Fix the draft code so the linter reports no errors, consulting the reference documentation.";

/// Graph extraction instructions.
pub const GRAPH_EXTRACTOR: &str = r#"You extract graph-structured workflows from diagrams and notebooks.
Reply with a single JSON object and nothing else, in this format:
{
  "state": { JSON Schema of the shared state; may carry "annotations": {"description": "...", "constraints": "..."} },
  "nodes": [ {"id": "node name", "is_start": true, "is_end": false, "description": "what the node does"} ],
  "edges": [ {"sources": ["node"], "targets": ["node"], "condition": "when the edge is taken"} ]
}
Mark exactly the entry node with "is_start" and every terminal node with "is_end".
Omit "condition" for unconditional edges."#;

/// User instruction accompanying the inputs of a prediction.
pub const GRAPH_REQUEST: &str = "Extract the graph described by the following input.";
