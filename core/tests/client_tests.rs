use agrigrok_core::config::ResolvedEndpoint;
use agrigrok_core::{
    AgriError, ChatCompletionClient, CompletionRequest, ConversationTurn, GenerationParams,
    LanguageModel,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer, timeout: Duration) -> ResolvedEndpoint {
    ResolvedEndpoint {
        url: format!("{}/openai/v1/chat/completions", server.uri()),
        api_key: "test-key".to_string(),
        model: "llama-test".to_string(),
        timeout,
    }
}

fn request() -> CompletionRequest {
    CompletionRequest {
        messages: vec![
            ConversationTurn::system("You are a farming assistant."),
            ConversationTurn::user("How often should I water tomatoes?"),
        ],
        params: GenerationParams::ANSWER,
    }
}

#[tokio::test]
async fn test_completion_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "llama-test",
            "max_tokens": 600,
            "stream": false,
            "messages": [
                {"role": "system", "content": "You are a farming assistant."},
                {"role": "user", "content": "How often should I water tomatoes?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "  Water deeply every 2-3 days.  "},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 30, "completion_tokens": 8, "total_tokens": 38}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&endpoint(&server, Duration::from_secs(5))).unwrap();
    let text = client.complete(request()).await.unwrap();
    assert_eq!(text, "Water deeply every 2-3 days.");
    assert_eq!(client.model_name(), "llama-test");
}

#[tokio::test]
async fn test_api_error_keeps_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&endpoint(&server, Duration::from_secs(5))).unwrap();
    match client.complete(request()).await {
        Err(AgriError::HttpError {
            status_code,
            message,
        }) => {
            assert_eq!(status_code, 401);
            assert!(message.contains("Invalid API Key"));
        }
        other => panic!("expected HttpError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&endpoint(&server, Duration::from_secs(5))).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(err.user_message().contains("API Error 502: bad gateway"));
}

#[tokio::test]
async fn test_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&endpoint(&server, Duration::from_secs(5))).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, AgriError::ParsingError(_)));
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ChatCompletionClient::new(&endpoint(&server, Duration::from_secs(5))).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, AgriError::ParsingError(_)));
}

#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(800))
                .set_body_json(json!({"choices": []})),
        )
        .mount(&server)
        .await;

    let client =
        ChatCompletionClient::new(&endpoint(&server, Duration::from_millis(100))).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, AgriError::Timeout));
}

#[tokio::test]
async fn test_connection_refused() {
    let endpoint = ResolvedEndpoint {
        url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
        api_key: "test-key".to_string(),
        model: "llama-test".to_string(),
        timeout: Duration::from_secs(2),
    };
    let client = ChatCompletionClient::new(&endpoint).unwrap();
    let err = client.complete(request()).await.unwrap_err();
    assert!(matches!(err, AgriError::Connection(_)));
}

#[test]
fn test_empty_key_rejected() {
    let endpoint = ResolvedEndpoint {
        url: "http://localhost/v1/chat/completions".to_string(),
        api_key: String::new(),
        model: "m".to_string(),
        timeout: Duration::from_secs(1),
    };
    assert!(matches!(
        ChatCompletionClient::new(&endpoint),
        Err(AgriError::ConfigError(_))
    ));
}
