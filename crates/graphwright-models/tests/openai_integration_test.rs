//! Integration tests for the OpenAI provider against a mocked HTTP server.

use graphwright_abstraction::{ChatMessage, ContentPart, Model, ModelParameters, ResponseFormat};
use graphwright_models::{ModelConfig, ModelFactory, ModelType, OpenAIModel};
use mockito::Matcher;
use serde_json::json;

fn completion_body(content: &str) -> String {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
    })
    .to_string()
}

#[tokio::test]
async fn test_image_parts_sent_as_content_array() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                {"role": "system", "content": "You read diagrams."},
                {"role": "user", "content": [
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBORw0"}},
                    {"type": "text", "text": "what is this?"}
                ]}
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("a graph"))
        .create_async()
        .await;

    let model = OpenAIModel::without_auth("gpt-4o".to_string(), format!("{}/v1", server.url()));
    let messages = vec![
        ChatMessage::system("You read diagrams."),
        ChatMessage::user(vec![
            ContentPart::image_url("data:image/png;base64,iVBORw0"),
            ContentPart::text("what is this?"),
        ]),
    ];

    let response = model.generate_chat_completion(&messages, None).await.unwrap();
    assert_eq!(response.content, "a graph");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_json_schema_response_format_is_strict() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "code", "strict": true}
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body(r#"{"imports": ""}"#))
        .create_async()
        .await;

    let model = OpenAIModel::without_auth("gpt-4o".to_string(), format!("{}/v1", server.url()));
    let params = ModelParameters::deterministic().with_response_format(ResponseFormat::JsonSchema {
        name: "code".to_string(),
        schema: json!({"type": "object", "properties": {"imports": {"type": "string"}}}),
    });

    let response = model.generate_chat_completion(&[ChatMessage::user("format")], Some(params)).await.unwrap();
    assert_eq!(response.content, r#"{"imports": ""}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_maps_to_model_response_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let model = OpenAIModel::without_auth("gpt-4o".to_string(), format!("{}/v1", server.url()));
    let err = model.generate_text("hi", None).await.unwrap_err();

    assert!(err.to_string().contains("API error (500"));
}

#[tokio::test]
async fn test_factory_universal_uses_base_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion_body("local reply"))
        .create_async()
        .await;

    let config = ModelConfig::new(ModelType::Universal, "llama3".to_string())
        .with_base_url(format!("{}/v1/", server.url()));
    let model = ModelFactory::create(config).unwrap();

    let response = model.generate_text("hi", None).await.unwrap();
    assert_eq!(response.content, "local reply");
    assert_eq!(response.model_id.as_deref(), Some("llama3"));
    mock.assert_async().await;
}
