//! The three-field code artifact a model response is coerced into.

use graphwright_abstraction::ResponseFormat;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Name under which the artifact schema is sent to providers.
pub const ARTIFACT_SCHEMA_NAME: &str = "code";

/// Structured code output: a module docstring, an import block and a body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Description of the problem and approach.
    #[serde(rename = "module_docstring", alias = "docstring")]
    pub docstring: String,
    /// Import statements.
    pub imports: String,
    /// Code block not including import statements.
    pub code: String,
}

impl CodeArtifact {
    /// Creates an artifact from its three fields.
    #[must_use]
    pub fn new(docstring: impl Into<String>, imports: impl Into<String>, code: impl Into<String>) -> Self {
        Self { docstring: docstring.into(), imports: imports.into(), code: code.into() }
    }

    /// Renders the artifact as a Python module.
    #[must_use]
    pub fn render(&self) -> String {
        format!("\"\"\"\n{}\n\"\"\"\n\n{}\n\n{}", self.docstring, self.imports, self.code)
    }

    /// Parses text produced by [`CodeArtifact::render`].
    ///
    /// Returns `None` when the text does not have the rendered shape. Imports
    /// containing a blank line are split at that line; re-rendering still
    /// reproduces the input exactly.
    #[must_use]
    pub fn from_rendered(text: &str) -> Option<Self> {
        let rest = text.strip_prefix("\"\"\"\n")?;
        let (docstring, rest) = rest.split_once("\n\"\"\"\n\n")?;
        let (imports, code) = rest.split_once("\n\n")?;
        Some(Self::new(docstring, imports, code))
    }

    /// JSON schema of the artifact, strict-mode compatible.
    #[must_use]
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "module_docstring": {
                    "type": "string",
                    "description": "Description of the problem and approach"
                },
                "imports": {
                    "type": "string",
                    "description": "Code block import statements"
                },
                "code": {
                    "type": "string",
                    "description": "Code block not including import statements"
                }
            },
            "required": ["module_docstring", "imports", "code"],
            "additionalProperties": false
        })
    }

    /// Response format requesting this artifact from a model.
    #[must_use]
    pub fn response_format() -> ResponseFormat {
        ResponseFormat::JsonSchema { name: ARTIFACT_SCHEMA_NAME.to_string(), schema: Self::json_schema() }
    }
}

impl fmt::Display for CodeArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_with_empty_imports() {
        let artifact = CodeArtifact::new("Counts", "", "def count(): pass");
        assert_eq!(artifact.render(), "\"\"\"\nCounts\n\"\"\"\n\n\n\ndef count(): pass");
    }

    #[test]
    fn test_from_rendered_recovers_fields() {
        let artifact = CodeArtifact::new(
            "Build a two node graph.\nUses a typed state.",
            "import operator\nfrom typing import TypedDict",
            "class State(TypedDict):\n    count: int\n\n\ndef step(state):\n    return state",
        );

        let parsed = CodeArtifact::from_rendered(&artifact.render()).unwrap();
        assert_eq!(parsed, artifact);
    }

    #[test]
    fn test_from_rendered_empty_imports() {
        let parsed = CodeArtifact::from_rendered("\"\"\"\nCounts\n\"\"\"\n\n\n\ndef count(): pass").unwrap();
        assert_eq!(parsed.imports, "");
        assert_eq!(parsed.code, "def count(): pass");
    }

    #[test]
    fn test_from_rendered_rejects_free_text() {
        assert!(CodeArtifact::from_rendered("Here is a graph with three nodes").is_none());
        assert!(CodeArtifact::from_rendered("\"\"\"\nunterminated docstring").is_none());
    }

    #[test]
    fn test_deserializes_docstring_alias() {
        let a: CodeArtifact =
            serde_json::from_str(r#"{"module_docstring": "d", "imports": "i", "code": "c"}"#).unwrap();
        let b: CodeArtifact = serde_json::from_str(r#"{"docstring": "d", "imports": "i", "code": "c"}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = CodeArtifact::json_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 3);
        assert_eq!(schema["additionalProperties"], false);
    }
}
