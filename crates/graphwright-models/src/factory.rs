//! Model factory for creating model instances from configuration.
//!
//! This module provides functionality to create model instances based on configuration,
//! handling API key loading from environment variables.

use crate::{MockModel, OpenAIModel};
use graphwright_abstraction::{Model, ModelError};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// Model type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    /// Mock model for testing.
    Mock,
    /// OpenAI hosted model.
    OpenAI,
    /// Universal OpenAI-compatible model (vLLM, LocalAI, LM Studio, Ollama, etc.).
    Universal,
}

impl FromStr for ModelType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "openai" => Ok(Self::OpenAI),
            "universal" | "openai-compatible" | "local" | "ollama" => Ok(Self::Universal),
            _ => Err(()),
        }
    }
}

/// Model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// The type of model to create.
    pub model_type: ModelType,
    /// The model ID (e.g., "gpt-4o").
    pub model_id: String,
    /// Optional API key (if not provided, will be loaded from environment).
    pub api_key: Option<String>,
    /// Optional base URL (required for Universal models).
    pub base_url: Option<String>,
}

impl ModelConfig {
    /// Creates a new `ModelConfig` with the given type and model ID.
    #[must_use]
    pub fn new(model_type: ModelType, model_id: String) -> Self {
        Self { model_type, model_id, api_key: None, base_url: None }
    }

    /// Sets the API key for this configuration.
    #[must_use]
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    /// Sets the base URL for this configuration.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }
}

/// Factory for creating model instances.
pub struct ModelFactory;

impl ModelFactory {
    /// Creates a model instance from the given configuration.
    ///
    /// # Errors
    /// Returns a `ModelError` if model creation fails (e.g., missing API key).
    pub fn create(config: ModelConfig) -> Result<Arc<dyn Model + Send + Sync>, ModelError> {
        debug!(
            model_type = ?config.model_type,
            model_id = %config.model_id,
            "Creating model instance"
        );

        match config.model_type {
            ModelType::Mock => Ok(Arc::new(MockModel::new(config.model_id))),
            ModelType::OpenAI => {
                let model = if let Some(api_key) = config.api_key {
                    OpenAIModel::with_api_key(config.model_id, api_key)
                } else {
                    OpenAIModel::new(config.model_id)?
                };
                let model = match config.base_url {
                    Some(base_url) => model.with_base_url(base_url),
                    None => model,
                };
                Ok(Arc::new(model))
            }
            ModelType::Universal => {
                let base_url = config.base_url.ok_or_else(|| {
                    ModelError::UnsupportedModelProvider(
                        "base_url is required for Universal model type".to_string(),
                    )
                })?;

                let model = if let Some(api_key) = config.api_key {
                    OpenAIModel::with_api_key(config.model_id, api_key).with_base_url(base_url)
                } else {
                    OpenAIModel::without_auth(config.model_id, base_url)
                };
                Ok(Arc::new(model))
            }
        }
    }

    /// Creates a model instance from a model type string and model ID.
    ///
    /// # Errors
    /// Returns a `ModelError` if the model type is unrecognized or creation fails.
    pub fn create_from_str(
        model_type_str: &str,
        model_id: String,
    ) -> Result<Arc<dyn Model + Send + Sync>, ModelError> {
        let model_type = Self::parse_type(model_type_str)?;
        Self::create(ModelConfig::new(model_type, model_id))
    }

    /// Parses a model type name.
    ///
    /// # Errors
    /// Returns `ModelError::UnsupportedModelProvider` for unknown names.
    pub fn parse_type(model_type_str: &str) -> Result<ModelType, ModelError> {
        ModelType::from_str(model_type_str).map_err(|()| {
            error!(model_type = %model_type_str, "Unrecognized model type");
            ModelError::UnsupportedModelProvider(format!("Unrecognized model type: {}", model_type_str))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_type_from_str() {
        assert_eq!(ModelType::from_str("mock"), Ok(ModelType::Mock));
        assert_eq!(ModelType::from_str("OpenAI"), Ok(ModelType::OpenAI));
        assert_eq!(ModelType::from_str("ollama"), Ok(ModelType::Universal));
        assert!(ModelType::from_str("unknown").is_err());
    }

    #[test]
    fn test_create_mock_model() {
        let model = ModelFactory::create_from_str("mock", "test-mock".to_string()).unwrap();
        assert_eq!(model.model_id(), "test-mock");
    }

    #[test]
    fn test_create_openai_with_key() {
        let config = ModelConfig::new(ModelType::OpenAI, "gpt-4o".to_string())
            .with_api_key("test-key".to_string());
        let model = ModelFactory::create(config).unwrap();
        assert_eq!(model.model_id(), "gpt-4o");
    }

    #[test]
    fn test_universal_requires_base_url() {
        let config = ModelConfig::new(ModelType::Universal, "llama3".to_string());
        let err = ModelFactory::create(config).err().unwrap();
        assert!(matches!(err, ModelError::UnsupportedModelProvider(_)));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = ModelFactory::create_from_str("nope", "x".to_string()).err().unwrap();
        assert!(err.to_string().contains("Unrecognized model type"));
    }
}
