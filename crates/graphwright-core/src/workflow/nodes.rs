//! Nodes of the code-generation graph.

use super::graph::WorkflowNode;
use super::{WorkflowError, FORMAT_CODE, LINT_CODE};
use crate::artifact::CodeArtifact;
use crate::conversation::{Author, Conversation, Message};
use crate::docs::DocsCache;
use crate::lint::Linter;
use crate::prompts;
use crate::structured::StructuredRequest;
use async_trait::async_trait;
use graphwright_abstraction::{ChatMessage, Model, ModelParameters};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ARTIFACT_LABEL: &str = "code solution";

fn artifact_request(parameters: &ModelParameters) -> StructuredRequest {
    StructuredRequest::new(ARTIFACT_LABEL, parameters.clone().with_response_format(CodeArtifact::response_format()))
}

async fn system_with_docs(instructions: &str, docs: &DocsCache) -> Result<ChatMessage, WorkflowError> {
    Ok(ChatMessage::system(prompts::with_docs(instructions, docs.text().await?)))
}

/// Routing-only entry node.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnterNode;

#[async_trait]
impl WorkflowNode for EnterNode {
    async fn run(&self, _conversation: &Conversation) -> Result<Vec<Message>, WorkflowError> {
        Ok(Vec::new())
    }
}

/// Describes a diagram with a multimodal model.
pub struct ImageInterpreterNode {
    model: Arc<dyn Model>,
    docs: Arc<DocsCache>,
    parameters: ModelParameters,
}

impl ImageInterpreterNode {
    /// Creates the node.
    pub fn new(model: Arc<dyn Model>, docs: Arc<DocsCache>, parameters: ModelParameters) -> Self {
        Self { model, docs, parameters }
    }
}

#[async_trait]
impl WorkflowNode for ImageInterpreterNode {
    async fn run(&self, conversation: &Conversation) -> Result<Vec<Message>, WorkflowError> {
        let mut messages = vec![system_with_docs(prompts::IMAGE_INTERPRETER, &self.docs).await?];
        messages.extend(conversation.to_chat_messages());

        let response = self.model.generate_chat_completion(&messages, Some(self.parameters.clone())).await?;
        debug!(model_id = %self.model.model_id(), chars = response.content.len(), "Interpreted diagram");

        Ok(vec![Message::new(Author::ImageInterpreter, response.content)])
    }
}

/// Generates a code artifact from the conversation.
pub struct CodeGeneratorNode {
    model: Arc<dyn Model>,
    docs: Arc<DocsCache>,
    parameters: ModelParameters,
}

impl CodeGeneratorNode {
    /// Creates the node.
    pub fn new(model: Arc<dyn Model>, docs: Arc<DocsCache>, parameters: ModelParameters) -> Self {
        Self { model, docs, parameters }
    }
}

#[async_trait]
impl WorkflowNode for CodeGeneratorNode {
    async fn run(&self, conversation: &Conversation) -> Result<Vec<Message>, WorkflowError> {
        let mut messages = vec![system_with_docs(prompts::CODE_GENERATOR, &self.docs).await?];
        messages.extend(conversation.to_chat_messages());

        let artifact: CodeArtifact = artifact_request(&self.parameters).send(self.model.as_ref(), messages).await?;
        debug!(model_id = %self.model.model_id(), "Generated code artifact");

        Ok(vec![Message::new(Author::JuniorDeveloper, artifact.render())])
    }
}

/// Coerces the latest message into a rendered code artifact.
///
/// A tail that is already a rendered artifact is re-rendered without calling
/// the model.
pub struct CodeFormatterNode {
    model: Arc<dyn Model>,
    parameters: ModelParameters,
}

impl CodeFormatterNode {
    /// Creates the node.
    pub fn new(model: Arc<dyn Model>, parameters: ModelParameters) -> Self {
        Self { model, parameters }
    }
}

#[async_trait]
impl WorkflowNode for CodeFormatterNode {
    async fn run(&self, conversation: &Conversation) -> Result<Vec<Message>, WorkflowError> {
        let last = conversation.last().ok_or_else(|| WorkflowError::EmptyConversation(FORMAT_CODE.to_string()))?;

        if let Some(artifact) = CodeArtifact::from_rendered(&last.text()) {
            debug!("Tail is already formatted");
            return Ok(vec![Message::new(Author::JuniorDeveloper, artifact.render())]);
        }

        let messages = vec![
            ChatMessage::system(prompts::CODE_FORMATTER),
            last.to_chat_without_images(),
            ChatMessage::system(prompts::FORMAT_LAST_MESSAGE),
        ];
        let artifact: CodeArtifact = artifact_request(&self.parameters).send(self.model.as_ref(), messages).await?;

        Ok(vec![Message::new(Author::JuniorDeveloper, artifact.render())])
    }
}

/// Lints the latest code and appends a review when it fails.
pub struct LintNode {
    linter: Arc<dyn Linter>,
}

impl LintNode {
    /// Creates the node.
    pub fn new(linter: Arc<dyn Linter>) -> Self {
        Self { linter }
    }
}

#[async_trait]
impl WorkflowNode for LintNode {
    async fn run(&self, conversation: &Conversation) -> Result<Vec<Message>, WorkflowError> {
        let last = conversation.last().ok_or_else(|| WorkflowError::EmptyConversation(LINT_CODE.to_string()))?;
        let output = self.linter.lint(&last.text()).await?;

        if output.has_errors() {
            warn!(attempt = conversation.reviewer_count() + 1, "Lint reported errors");
            Ok(vec![Message::new(Author::CodeReviewer, output.report())])
        } else {
            info!("Lint passed");
            Ok(Vec::new())
        }
    }
}

/// Revises the code with the lint findings, without images.
pub struct CodeFixerNode {
    model: Arc<dyn Model>,
    docs: Arc<DocsCache>,
    parameters: ModelParameters,
}

impl CodeFixerNode {
    /// Creates the node.
    pub fn new(model: Arc<dyn Model>, docs: Arc<DocsCache>, parameters: ModelParameters) -> Self {
        Self { model, docs, parameters }
    }
}

#[async_trait]
impl WorkflowNode for CodeFixerNode {
    async fn run(&self, conversation: &Conversation) -> Result<Vec<Message>, WorkflowError> {
        let mut messages = vec![system_with_docs(prompts::CODE_FIXER, &self.docs).await?];
        messages.extend(conversation.to_chat_messages_without_images());

        let artifact: CodeArtifact = artifact_request(&self.parameters).send(self.model.as_ref(), messages).await?;
        debug!(model_id = %self.model.model_id(), attempt = conversation.reviewer_count(), "Fixed code artifact");

        Ok(vec![Message::new(Author::SeniorDeveloper, artifact.render())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::{LintError, LintOutput};
    use graphwright_abstraction::{ContentPart, ResponseFormat, Role};
    use graphwright_models::MockModel;

    const ARTIFACT: &str = r#"{"module_docstring": "Counts", "imports": "import os", "code": "def count(): pass"}"#;

    struct FixedLinter(LintOutput);

    #[async_trait]
    impl Linter for FixedLinter {
        async fn lint(&self, _code: &str) -> Result<LintOutput, LintError> {
            Ok(self.0.clone())
        }
    }

    fn docs() -> Arc<DocsCache> {
        Arc::new(DocsCache::from_text("# LangGraph"))
    }

    #[tokio::test]
    async fn test_generator_requests_schema_and_renders() {
        let model = Arc::new(MockModel::with_responses("mock".to_string(), [ARTIFACT]));
        let node = CodeGeneratorNode::new(model.clone(), docs(), ModelParameters::deterministic());

        let appended = node.run(&Conversation::from_user("write a counter")).await.unwrap();
        assert_eq!(appended[0].author, Author::JuniorDeveloper);
        assert_eq!(appended[0].text(), "\"\"\"\nCounts\n\"\"\"\n\nimport os\n\ndef count(): pass");

        let requests = model.requests();
        let request = &requests[0];
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.text().contains("# LangGraph"));
        let format = request.parameters.as_ref().and_then(|p| p.response_format.clone());
        assert!(matches!(format, Some(ResponseFormat::JsonSchema { ref name, .. }) if name == "code"));
    }

    #[tokio::test]
    async fn test_formatter_skips_model_for_rendered_tail() {
        let model = Arc::new(MockModel::new("mock".to_string()));
        let node = CodeFormatterNode::new(model.clone(), ModelParameters::default());

        let rendered = CodeArtifact::new("Counts", "import os", "def count(): pass").render();
        let mut conversation = Conversation::from_user("task");
        conversation.push(Message::new(Author::SeniorDeveloper, rendered.clone()));

        let appended = node.run(&conversation).await.unwrap();
        assert_eq!(appended[0].text(), rendered);
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_formatter_sends_only_the_tail() {
        let model = Arc::new(MockModel::with_responses("mock".to_string(), [ARTIFACT]));
        let node = CodeFormatterNode::new(model.clone(), ModelParameters::default());

        let mut conversation = Conversation::from_user(vec![
            ContentPart::image_url("data:image/png;base64,AAAA"),
            ContentPart::text("diagram"),
        ]);
        conversation.push(Message::new(Author::ImageInterpreter, "Here is a graph: def count(): pass"));

        node.run(&conversation).await.unwrap();
        let requests = model.requests();
        let request = &requests[0];
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[1].content.text(), "Here is a graph: def count(): pass");
        assert_eq!(request.messages[2].content.text(), prompts::FORMAT_LAST_MESSAGE);
    }

    #[tokio::test]
    async fn test_formatter_empty_conversation() {
        let node = CodeFormatterNode::new(Arc::new(MockModel::new("mock".to_string())), ModelParameters::default());
        let err = node.run(&Conversation::new()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyConversation(_)));
    }

    #[tokio::test]
    async fn test_lint_node_appends_review_only_on_errors() {
        let mut conversation = Conversation::from_user("task");
        conversation.push(Message::new(Author::JuniorDeveloper, "x = 1"));

        let clean = LintNode::new(Arc::new(FixedLinter(LintOutput::clean())));
        assert!(clean.run(&conversation).await.unwrap().is_empty());

        let failing = LintNode::new(Arc::new(FixedLinter(LintOutput::failed("E999", "Found 1 error."))));
        let appended = failing.run(&conversation).await.unwrap();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].author, Author::CodeReviewer);
        assert_eq!(appended[0].text(), "E999\n\nOutput:\nFound 1 error.");
    }

    #[tokio::test]
    async fn test_fixer_strips_images() {
        let model = Arc::new(MockModel::with_responses("mock".to_string(), [ARTIFACT]));
        let node = CodeFixerNode::new(model.clone(), docs(), ModelParameters::default());

        let mut conversation = Conversation::from_user(vec![
            ContentPart::image_url("data:image/png;base64,AAAA"),
            ContentPart::text("diagram"),
        ]);
        conversation.push(Message::new(Author::JuniorDeveloper, "broken"));
        conversation.push(Message::new(Author::CodeReviewer, "E999"));

        let appended = node.run(&conversation).await.unwrap();
        assert_eq!(appended[0].author, Author::SeniorDeveloper);

        let requests = model.requests();
        let request = &requests[0];
        assert!(request.messages.iter().all(|m| !m.content.has_image()));
        assert_eq!(request.messages[1].content.text(), "diagram");
    }

    #[tokio::test]
    async fn test_interpreter_passes_images() {
        let model = Arc::new(MockModel::with_responses("vision".to_string(), ["A graph with two nodes"]));
        let node = ImageInterpreterNode::new(model.clone(), docs(), ModelParameters::default());

        let conversation = Conversation::from_user(vec![
            ContentPart::image_url("data:image/png;base64,AAAA"),
            ContentPart::text("diagram"),
        ]);
        let appended = node.run(&conversation).await.unwrap();

        assert_eq!(appended[0].author, Author::ImageInterpreter);
        assert_eq!(appended[0].text(), "A graph with two nodes");
        assert!(model.requests()[0].messages[1].content.has_image());
    }
}
