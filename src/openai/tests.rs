use super::*;
use crate::generation::GENERATION_TEMPERATURE;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn client_for(server: &MockServer, batch_size: u32) -> OpenAiClient {
    let config = OpenAiConfig {
        base_url: format!("{}/v1/", server.uri()),
        batch_size,
        retry_attempts: 1,
        timeout_seconds: 5,
        ..OpenAiConfig::default()
    };
    OpenAiClient::new(&config, "sk-test")
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_sends_model_and_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["list files"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let vector = client_for(&server, 32).embed("list files").unwrap();
    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_batch_is_chunked_and_ordered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [2.0]},
                {"index": 0, "embedding": [1.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [3.0]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = client_for(&server, 2).embed_batch(&texts).unwrap();
    assert_eq!(vectors, vec![vec![1.0], vec![2.0], vec![3.0]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embedding_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0]}]
        })))
        .mount(&server)
        .await;

    let texts = vec!["a".to_string(), "b".to_string()];
    let err = client_for(&server, 8).embed_batch(&texts).unwrap_err();
    assert!(matches!(err, RagError::Model(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_uses_zero_temperature_and_returns_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "temperature": 0.0,
            "messages": [{"role": "user", "content": "how to list files"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "```bash\nls -la\n```"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let answer = client_for(&server, 32)
        .complete(&[ChatMessage::user("how to list files")], GENERATION_TEMPERATURE)
        .unwrap();
    assert_eq!(answer, "```bash\nls -la\n```");
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_without_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client_for(&server, 32)
        .complete(&[ChatMessage::user("q")], 0.0)
        .unwrap_err();
    assert!(matches!(err, RagError::Model(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_key_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server, 32).ping().unwrap_err();
    assert!(matches!(err, RagError::HttpStatus { status: 401, .. }));
}
