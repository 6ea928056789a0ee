use super::*;
use crate::config::{Config, GenerationConfig, OllamaConfig};
use crate::embeddings::chunking::ChunkingConfig;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> Config {
    let address = server.address();
    Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            batch_size: 16,
            ..OllamaConfig::default()
        },
        generation: GenerationConfig::default(),
        chunking: ChunkingConfig::default(),
        base_dir: std::path::PathBuf::new(),
    }
}

fn client_for(server: &MockServer) -> OllamaClient {
    OllamaClient::new(&mock_config(server))
        .expect("should create client")
        .with_retry_attempts(1)
}

#[test]
fn client_configuration() {
    let config = Config {
        ollama: OllamaConfig {
            host: "test-host".to_string(),
            port: 1234,
            model: "test-model".to_string(),
            batch_size: 128,
            ..OllamaConfig::default()
        },
        generation: GenerationConfig::default(),
        chunking: ChunkingConfig::default(),
        base_dir: std::path::PathBuf::new(),
    };
    let client = OllamaClient::new(&config).expect("Failed to create client");

    assert_eq!(client.model, "test-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(client.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
}

#[test]
fn normalize_produces_unit_vectors() {
    let mut vector = vec![3.0, 4.0];
    normalize(&mut vector);
    assert!((vector[0] - 0.6).abs() < 1e-6);
    assert!((vector[1] - 0.8).abs() < 1e-6);

    let mut zero = vec![0.0, 0.0];
    normalize(&mut zero);
    assert_eq!(zero, vec![0.0, 0.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn embed_parses_and_normalizes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[3.0, 4.0]] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let vector = tokio::task::spawn_blocking(move || client.embed("income limit"))
        .await
        .expect("task should not panic")
        .expect("embed should succeed");

    assert!((vector[0] - 0.6).abs() < 1e-6);
    assert!((vector[1] - 0.8).abs() < 1e-6);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_preserves_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "embeddings": [[1.0, 0.0], [0.0, 1.0]] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["first".to_string(), "second".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should not panic")
        .expect("embed_batch should succeed");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![1.0, 0.0]);
    assert_eq!(vectors[1], vec![0.0, 1.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_size_splits_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0, 0.0]] })),
        )
        .expect(3)
        .mount(&server)
        .await;

    let mut config = mock_config(&server);
    config.ollama.batch_size = 1;
    let client = OllamaClient::new(&config)
        .expect("should create client")
        .with_retry_attempts(1);

    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should not panic")
        .expect("embed_batch should succeed");

    assert_eq!(vectors.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn count_mismatch_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0, 0.0]] })),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["first".to_string(), "second".to_string()];
    let result = tokio::task::spawn_blocking(move || client.embed_batch(&texts))
        .await
        .expect("task should not panic");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = mock_config(&server);
    config.ollama.batch_size = 16;
    let client = OllamaClient::new(&config)
        .expect("should create client")
        .with_retry_attempts(3);

    let result = tokio::task::spawn_blocking(move || client.embed("query"))
        .await
        .expect("task should not panic");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn truncation_applies_before_request() {
    let server = MockServer::start().await;

    // A request still carrying the tail marker means truncation never ran.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_string_contains("TAILMARKER"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0, 0.0]] })),
        )
        .mount(&server)
        .await;

    let mut config = mock_config(&server);
    config.ollama.max_input_chars = 256;
    let client = OllamaClient::new(&config)
        .expect("should create client")
        .with_retry_attempts(1);

    let input = format!("{}TAILMARKER", "x".repeat(256));
    let result = tokio::task::spawn_blocking(move || client.embed(&input))
        .await
        .expect("task should not panic");

    assert!(result.is_ok());
}

#[test]
fn truncate_is_deterministic_and_char_safe() {
    let server_free_config = Config {
        ollama: OllamaConfig {
            max_input_chars: 256,
            ..OllamaConfig::default()
        },
        generation: GenerationConfig::default(),
        chunking: ChunkingConfig::default(),
        base_dir: std::path::PathBuf::new(),
    };
    let client = OllamaClient::new(&server_free_config).expect("should create client");

    let multibyte = "తెలంగాణ".repeat(100);
    let cut_once = client.truncate_input(&multibyte);
    let cut_twice = client.truncate_input(&multibyte);

    assert_eq!(cut_once, cut_twice);
    assert_eq!(cut_once.chars().count(), 256);

    let short = "short input";
    assert_eq!(client.truncate_input(short), short);
}
