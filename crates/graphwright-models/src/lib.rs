//! Model implementations for Graphwright.
//!
//! This crate provides concrete implementations of the `Model` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Testing and development, with scripted replies
//! - **OpenAI**: OpenAI's GPT models (API key required)
//! - **Universal**: Any OpenAI-compatible server (vLLM, LM Studio, Ollama `/v1`)

pub mod factory;
pub mod openai;

use async_trait::async_trait;
use graphwright_abstraction::{
    ChatMessage, Model, ModelError, ModelParameters, ModelResponse, ModelUsage,
};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

pub use factory::{ModelConfig, ModelFactory, ModelType};
pub use openai::OpenAIModel;

/// A chat completion request as seen by a [`MockModel`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Messages passed to the model.
    pub messages: Vec<ChatMessage>,
    /// Parameters passed to the model.
    pub parameters: Option<ModelParameters>,
}

/// A mock implementation of the `Model` trait for testing and demonstration.
///
/// Scripted replies are returned in order; once the script runs out the model
/// falls back to echoing a summary of the conversation. Every request is
/// recorded so tests can inspect what a workflow sent.
#[derive(Debug, Default)]
pub struct MockModel {
    id: String,
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockModel {
    /// Creates a new `MockModel` with the given ID.
    #[must_use]
    pub fn new(id: String) -> Self {
        Self { id, ..Self::default() }
    }

    /// Creates a `MockModel` that replies with `responses` in order.
    #[must_use]
    pub fn with_responses<I, S>(id: String, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new(id);
        for response in responses {
            model.push_response(response);
        }
        model
    }

    /// Queues a successful reply.
    pub fn push_response(&self, response: impl Into<String>) {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(Ok(response.into()));
    }

    /// Queues a failing reply.
    pub fn push_error(&self, error: ModelError) {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).push_back(Err(error));
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn echo(&self, messages: &[ChatMessage], parameters: Option<&ModelParameters>) -> String {
        use std::fmt::Write;

        let mut conversation_summary = String::from("Conversation Summary:\n");
        for message in messages {
            let _ = writeln!(conversation_summary, "  {}: {}", message.role, message.content.text());
        }

        format!(
            "Mock chat response from {}\n{conversation_summary}\nParameters: {parameters:?}",
            self.id
        )
    }
}

#[async_trait]
impl Model for MockModel {
    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.id,
            message_count = messages.len(),
            parameters = ?parameters,
            "MockModel generating chat completion"
        );

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRequest { messages: messages.to_vec(), parameters: parameters.clone() });

        let scripted = self.script.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
        let response_content = match scripted {
            Some(reply) => reply?,
            None => self.echo(messages, parameters.as_ref()),
        };

        let prompt_tokens = messages.iter().map(|m| count_tokens(&m.content.text())).sum::<u32>();
        let completion_tokens = count_tokens(&response_content);
        let total_tokens = prompt_tokens + completion_tokens;

        Ok(ModelResponse {
            content: response_content,
            model_id: Some(self.id.clone()),
            usage: Some(ModelUsage { prompt_tokens, completion_tokens, total_tokens }),
        })
    }

    fn model_id(&self) -> &str {
        &self.id
    }
}

/// Count tokens in a string (simplified: word count).
#[allow(clippy::cast_possible_truncation)]
fn count_tokens(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let model = MockModel::with_responses("mock".to_string(), ["first", "second"]);

        let a = model.generate_text("one", None).await.unwrap();
        let b = model.generate_text("two", None).await.unwrap();

        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_error_is_returned() {
        let model = MockModel::new("mock".to_string());
        model.push_error(ModelError::RequestError("offline".to_string()));

        let err = model.generate_text("hello", None).await.unwrap_err();
        assert_eq!(err, ModelError::RequestError("offline".to_string()));
    }

    #[tokio::test]
    async fn test_echo_when_script_exhausted() {
        let model = MockModel::new("echo".to_string());
        let response = model.generate_text("ping", None).await.unwrap();

        assert!(response.content.contains("Mock chat response from echo"));
        assert!(response.content.contains("user: ping"));
        assert!(response.usage.is_some());
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let model = MockModel::new("mock".to_string());
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hi")];
        model.generate_chat_completion(&messages, None).await.unwrap();

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].messages, messages);
        assert!(requests[0].parameters.is_none());
    }
}
