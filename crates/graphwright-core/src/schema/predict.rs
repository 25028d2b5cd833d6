//! Diagram and notebook to graph IR prediction.

use super::GraphSchema;
use crate::prompts;
use crate::structured::{StructuredError, StructuredRequest};
use futures::stream::{self, StreamExt};
use graphwright_abstraction::{ChatMessage, ContentPart, Model, ModelParameters, ResponseFormat};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Structured-output attempts used when none are configured.
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Errors raised while predicting one graph.
#[derive(Debug, Error)]
pub enum PredictError {
    /// The model failed or never produced a valid graph.
    #[error(transparent)]
    Structured(#[from] StructuredError),

    /// The input carries neither images nor text.
    #[error("Input '{0}' has no images or text")]
    EmptyInput(String),
}

/// One item to predict: any number of diagram images plus optional text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Name reported with the result, usually the file path.
    pub label: String,
    /// Image URLs, typically `data:` URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Notebook or description text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl PredictionInput {
    /// An input holding a single image.
    #[must_use]
    pub fn image(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self { label: label.into(), images: vec![url.into()], text: None }
    }

    /// An input holding text only.
    #[must_use]
    pub fn text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self { label: label.into(), images: Vec::new(), text: Some(text.into()) }
    }

    /// Adds another image.
    #[must_use]
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.images.push(url.into());
        self
    }

    /// Returns `true` if there is nothing to predict from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.text.as_deref().is_none_or(|t| t.trim().is_empty())
    }

    fn to_message(&self) -> ChatMessage {
        let mut parts = vec![ContentPart::text(prompts::GRAPH_REQUEST)];
        parts.extend(self.images.iter().map(ContentPart::image_url));
        if let Some(ref text) = self.text {
            parts.push(ContentPart::text(text.as_str()));
        }
        ChatMessage::user(parts)
    }
}

/// Predicts graph IR documents with a structured-output retry loop.
#[derive(Clone)]
pub struct GraphPredictor {
    model: Arc<dyn Model>,
    request: StructuredRequest,
}

impl GraphPredictor {
    /// Creates a predictor making up to `attempts` tries per input.
    pub fn new(model: Arc<dyn Model>, parameters: ModelParameters, attempts: usize) -> Self {
        let parameters = parameters.with_response_format(ResponseFormat::Json);
        Self { model, request: StructuredRequest::new("graph", parameters).with_attempts(attempts) }
    }

    /// Predicts the graph of one input. Each call uses its own conversation.
    ///
    /// # Errors
    /// Returns `PredictError::EmptyInput` for an empty input and
    /// `PredictError::Structured` when the model fails or every attempt
    /// produced an invalid graph.
    pub async fn predict(&self, input: &PredictionInput) -> Result<GraphSchema, PredictError> {
        if input.is_empty() {
            return Err(PredictError::EmptyInput(input.label.clone()));
        }

        let messages = vec![ChatMessage::system(prompts::GRAPH_EXTRACTOR), input.to_message()];
        let graph: GraphSchema = self.request.send(self.model.as_ref(), messages).await?;

        let issues = graph.validate();
        if issues.is_empty() {
            debug!(input = %input.label, nodes = graph.nodes.len(), edges = graph.edges.len(), "Predicted graph");
        } else {
            let summary = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            warn!(input = %input.label, issues = %summary, "Predicted graph has structural issues");
        }
        Ok(graph)
    }

    /// Predicts every input with at most `concurrency` requests in flight.
    ///
    /// Results are returned in input order; a failed item does not stop the
    /// others.
    pub async fn predict_batch(
        &self,
        inputs: &[PredictionInput],
        concurrency: usize,
    ) -> Vec<Result<GraphSchema, PredictError>> {
        info!(inputs = inputs.len(), concurrency, model_id = %self.model.model_id(), "Predicting graphs");

        let mut results: Vec<(usize, Result<GraphSchema, PredictError>)> = stream::iter(inputs.iter().enumerate())
            .map(|(index, input)| async move { (index, self.predict(input).await) })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphwright_models::MockModel;

    const GRAPH: &str = r#"{"state": {}, "nodes": [{"id": "start", "is_start": true}, {"id": "end", "is_end": true}], "edges": [{"sources": ["start"], "targets": ["end"]}]}"#;

    #[tokio::test]
    async fn test_predict_from_fenced_reply() {
        let model = Arc::new(MockModel::with_responses("mock".to_string(), [format!("```json\n{GRAPH}\n```")]));
        let predictor = GraphPredictor::new(model.clone(), ModelParameters::deterministic(), DEFAULT_ATTEMPTS);

        let graph = predictor.predict(&PredictionInput::image("a.png", "data:image/png;base64,AAAA")).await.unwrap();
        assert_eq!(graph.nodes.len(), 2);

        let requests = model.requests();
        let user = &requests[0].messages[1];
        assert!(user.content.has_image());
        assert_eq!(requests[0].parameters.as_ref().and_then(|p| p.response_format.clone()), Some(ResponseFormat::Json));
    }

    #[tokio::test]
    async fn test_predict_retries_invalid_graph() {
        let model = Arc::new(MockModel::with_responses("mock".to_string(), [r#"{"nodes": "many"}"#, GRAPH]));
        let predictor = GraphPredictor::new(model.clone(), ModelParameters::default(), 3);

        let graph = predictor.predict(&PredictionInput::text("nb.ipynb", "graph.add_node(...)")).await.unwrap();
        assert!(graph.validate().is_empty());
        assert_eq!(model.request_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let predictor = GraphPredictor::new(Arc::new(MockModel::new("mock".to_string())), ModelParameters::default(), 3);
        let err = predictor.predict(&PredictionInput::text("blank.txt", "   ")).await.unwrap_err();
        assert!(matches!(err, PredictError::EmptyInput(label) if label == "blank.txt"));
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_isolates_failures() {
        let model = Arc::new(MockModel::with_responses("mock".to_string(), [GRAPH, GRAPH]));
        let predictor = GraphPredictor::new(model, ModelParameters::default(), 1);

        let inputs = vec![
            PredictionInput::text("first", "one"),
            PredictionInput::text("empty", ""),
            PredictionInput::text("third", "three"),
        ];
        let results = predictor.predict_batch(&inputs, 2).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(PredictError::EmptyInput(_))));
        assert!(results[2].is_ok());
    }
}
