//! Structured output requests with parse-error feedback.
//!
//! A request asks the model for JSON, extracts the first object from the
//! reply and deserializes it. When the reply does not parse, the parse error
//! is sent back to the model and the request is repeated, up to a fixed
//! number of attempts. Model errors are never retried.

use crate::extract::find_json_objects;
use graphwright_abstraction::{ChatMessage, Model, ModelError, ModelParameters};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder sent in place of a reply that failed to parse.
const OMITTED_REPLY: &str = "... Response omitted ...";

/// Errors raised by a structured request.
#[derive(Debug, Error)]
pub enum StructuredError {
    /// The model call failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Every attempt produced output that did not parse.
    #[error("No valid {label} after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// What was being requested.
        label: String,
        /// Number of attempts made.
        attempts: usize,
        /// Parse error of the final attempt.
        last_error: String,
    },
}

/// A reusable structured-output request.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    label: String,
    parameters: ModelParameters,
    attempts: usize,
}

impl StructuredRequest {
    /// Creates a single-attempt request for the value described by `label`.
    #[must_use]
    pub fn new(label: impl Into<String>, parameters: ModelParameters) -> Self {
        Self { label: label.into(), parameters, attempts: 1 }
    }

    /// Sets the number of attempts; values below one are treated as one.
    #[must_use]
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Number of attempts this request will make.
    #[must_use]
    pub const fn attempts(&self) -> usize {
        self.attempts
    }

    /// Sends `messages` and parses the reply into `T`.
    ///
    /// # Errors
    /// Returns `StructuredError::Model` on the first model failure and
    /// `StructuredError::Exhausted` when no attempt produced a valid value.
    pub async fn send<T: DeserializeOwned>(
        &self,
        model: &dyn Model,
        mut messages: Vec<ChatMessage>,
    ) -> Result<T, StructuredError> {
        let mut last_error = String::new();

        for attempt in 1..=self.attempts {
            let response = model.generate_chat_completion(&messages, Some(self.parameters.clone())).await?;

            match parse_structured::<T>(&response.content) {
                Ok(value) => {
                    debug!(label = %self.label, attempt, "Structured output parsed");
                    return Ok(value);
                }
                Err(error) => {
                    warn!(label = %self.label, attempt, error = %error, "Structured output did not parse");
                    messages.push(ChatMessage::assistant(OMITTED_REPLY));
                    messages.push(ChatMessage::user(format!(
                        "You returned an invalid {}. Error: {}\n\nStrictly adhere to the format described in the prompt.",
                        self.label, error
                    )));
                    last_error = error;
                }
            }
        }

        Err(StructuredError::Exhausted { label: self.label.clone(), attempts: self.attempts, last_error })
    }
}

/// Parses `text` into `T`, accepting either a bare JSON document or the first
/// JSON object embedded in surrounding text that deserializes into `T`.
///
/// # Errors
/// Returns a description of why no candidate could be used.
pub fn parse_structured<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let direct = match serde_json::from_str::<T>(text.trim()) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let candidates = find_json_objects(text);
    if candidates.is_empty() {
        return Err(format!("no JSON object found ({direct})"));
    }

    let mut last = direct.to_string();
    for candidate in candidates {
        match serde_json::from_value::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last = e.to_string(),
        }
    }
    Err(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::CodeArtifact;
    use graphwright_abstraction::Role;
    use graphwright_models::MockModel;

    const VALID: &str = r#"{"module_docstring": "Counts", "imports": "", "code": "def count(): pass"}"#;

    #[test]
    fn test_parse_bare_and_embedded() {
        let bare: CodeArtifact = parse_structured(VALID).unwrap();
        let embedded: CodeArtifact = parse_structured(&format!("Sure!\n```json\n{VALID}\n```")).unwrap();
        assert_eq!(bare, embedded);
        assert_eq!(bare.code, "def count(): pass");
    }

    #[test]
    fn test_parse_wrong_shape() {
        let err = parse_structured::<CodeArtifact>(r#"{"imports": ""}"#).unwrap_err();
        assert!(err.contains("missing field"));
        assert!(parse_structured::<CodeArtifact>("no json here").unwrap_err().contains("no JSON object"));
    }

    #[tokio::test]
    async fn test_retry_feeds_back_parse_error() {
        let model = MockModel::with_responses("mock".to_string(), ["not json", VALID]);
        let request = StructuredRequest::new("code artifact", ModelParameters::deterministic()).with_attempts(3);

        let artifact: CodeArtifact = request.send(&model, vec![ChatMessage::user("write")]).await.unwrap();
        assert_eq!(artifact.docstring, "Counts");

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        let retry = &requests[1].messages;
        assert_eq!(retry.len(), 3);
        assert_eq!(retry[1].role, Role::Assistant);
        assert_eq!(retry[1].content.text(), OMITTED_REPLY);
        assert!(retry[2].content.text().contains("You returned an invalid code artifact"));
    }

    #[tokio::test]
    async fn test_exhausted_after_attempts() {
        let model = MockModel::with_responses("mock".to_string(), ["nope", "still nope"]);
        let request = StructuredRequest::new("graph", ModelParameters::default()).with_attempts(2);

        let err = request.send::<CodeArtifact>(&model, vec![ChatMessage::user("x")]).await.unwrap_err();
        match err {
            StructuredError::Exhausted { attempts, label, .. } => {
                assert_eq!(attempts, 2);
                assert_eq!(label, "graph");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_model_error_not_retried() {
        let model = MockModel::new("mock".to_string());
        model.push_error(ModelError::RequestError("down".to_string()));
        let request = StructuredRequest::new("code", ModelParameters::default()).with_attempts(3);

        let err = request.send::<CodeArtifact>(&model, vec![ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, StructuredError::Model(_)));
        assert_eq!(model.request_count(), 1);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let request = StructuredRequest::new("code", ModelParameters::default()).with_attempts(0);
        assert_eq!(request.attempts(), 1);
    }
}
