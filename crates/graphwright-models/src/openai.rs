//! OpenAI model implementation.
//!
//! This module provides an implementation of the `Model` trait for OpenAI's
//! chat completions API and any server that speaks the same protocol
//! (vLLM, LM Studio, Ollama's `/v1` endpoint). Multi-part messages are sent
//! as content arrays so image references reach vision-capable models.

use async_trait::async_trait;
use graphwright_abstraction::{
    ChatMessage, ContentPart, MessageContent, Model, ModelError, ModelParameters, ModelResponse,
    ModelUsage, ResponseFormat,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{debug, error};

/// Default endpoint for the hosted OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI model implementation.
#[derive(Debug, Clone)]
pub struct OpenAIModel {
    /// The model ID (e.g., "gpt-4o", "gpt-4-turbo").
    model_id: String,
    /// The API key for authentication; `None` for local servers without auth.
    api_key: Option<String>,
    /// The base URL of the API, without a trailing slash.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl OpenAIModel {
    /// Creates a new `OpenAIModel`, reading the API key from `OPENAI_API_KEY`.
    ///
    /// # Errors
    /// Returns a `ModelError` if the API key is not found in environment variables.
    pub fn new(model_id: String) -> Result<Self, ModelError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ModelError::UnsupportedModelProvider(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })?;

        Ok(Self::with_api_key(model_id, api_key))
    }

    /// Creates a new `OpenAIModel` with an explicit API key.
    #[must_use]
    pub fn with_api_key(model_id: String, api_key: String) -> Self {
        Self {
            model_id,
            api_key: Some(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Creates a model for an OpenAI-compatible server that needs no API key.
    #[must_use]
    pub fn without_auth(model_id: String, base_url: String) -> Self {
        Self { model_id, api_key: None, base_url: normalize_base_url(&base_url), client: Client::new() }
    }

    /// Points the model at a different OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = normalize_base_url(&base_url);
        self
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Converts a response format into the wire value OpenAI expects.
    ///
    /// `ResponseFormat::Text` maps to `None` so the provider default applies.
    #[must_use]
    pub fn convert_response_format(format: Option<&ResponseFormat>) -> Option<OpenAIResponseFormat> {
        match format? {
            ResponseFormat::Text => None,
            ResponseFormat::Json => Some(OpenAIResponseFormat::JsonObject),
            ResponseFormat::JsonSchema { name, schema } => {
                Some(OpenAIResponseFormat::JsonSchema {
                    json_schema: OpenAIJsonSchema {
                        name: name.clone(),
                        schema: schema.clone(),
                        strict: true,
                    },
                })
            }
        }
    }

    fn convert_message(message: &ChatMessage) -> OpenAIMessage {
        let content = match &message.content {
            MessageContent::Text(text) => OpenAIContent::Text(text.clone()),
            MessageContent::Parts(parts) => OpenAIContent::Parts(
                parts
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text { text } => OpenAIPart::Text { text: text.clone() },
                        ContentPart::ImageUrl { url } => {
                            OpenAIPart::ImageUrl { image_url: OpenAIImageUrl { url: url.clone() } }
                        }
                    })
                    .collect(),
            ),
        };

        OpenAIMessage { role: message.role.as_str().to_string(), content }
    }

    fn build_request(&self, messages: &[ChatMessage], parameters: Option<ModelParameters>) -> OpenAIRequest {
        let mut request = OpenAIRequest {
            model: self.model_id.clone(),
            messages: messages.iter().map(Self::convert_message).collect(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
            response_format: None,
        };

        if let Some(params) = parameters {
            request.response_format = Self::convert_response_format(params.response_format.as_ref());
            request.temperature = params.temperature;
            request.top_p = params.top_p;
            request.max_tokens = params.max_tokens;
            request.stop = params.stop_sequences;
        }

        request
    }

    fn map_error_status(status: StatusCode, body: String) -> ModelError {
        match status.as_u16() {
            401 | 403 => ModelError::UnsupportedModelProvider(format!(
                "Authentication failed ({}): {}",
                status, body
            )),
            402 | 429 => ModelError::QuotaExceeded { provider: "openai".to_string(), message: Some(body) },
            _ => ModelError::ModelResponseError(format!("API error ({}): {}", status, body)),
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[async_trait]
impl Model for OpenAIModel {
    async fn generate_chat_completion(
        &self,
        messages: &[ChatMessage],
        parameters: Option<ModelParameters>,
    ) -> Result<ModelResponse, ModelError> {
        debug!(
            model_id = %self.model_id,
            message_count = messages.len(),
            parameters = ?parameters,
            "OpenAIModel generating chat completion"
        );

        let url = format!("{}/chat/completions", self.base_url);
        let request_body = self.build_request(messages, parameters);

        let mut request = self.client.post(&url).json(&request_body);
        if let Some(ref api_key) = self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to send request to OpenAI API");
            ModelError::RequestError(format!("Network error: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "OpenAI API returned error status");
            return Err(Self::map_error_status(status, error_text));
        }

        let openai_response: OpenAIResponse = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse OpenAI API response");
            ModelError::SerializationError(format!("Failed to parse response: {}", e))
        })?;

        let content = openai_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                error!("No content in OpenAI API response");
                ModelError::ModelResponseError("No content in API response".to_string())
            })?;

        let usage = openai_response.usage.map(|u| ModelUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ModelResponse { content, model_id: Some(self.model_id.clone()), usage })
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// OpenAI API request/response structures

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: OpenAIContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Debug, Serialize)]
struct OpenAIImageUrl {
    url: String,
}

/// Wire form of the `response_format` request field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpenAIResponseFormat {
    /// `{"type": "json_object"}`
    JsonObject,
    /// `{"type": "json_schema", "json_schema": {...}}`
    JsonSchema {
        /// Named schema definition.
        json_schema: OpenAIJsonSchema,
    },
}

/// Named schema definition for structured outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenAIJsonSchema {
    /// Schema name.
    pub name: String,
    /// The JSON schema.
    pub schema: serde_json::Value,
    /// Whether the provider must follow the schema exactly.
    pub strict: bool,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(clippy::struct_field_names)] // Matches API naming
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
