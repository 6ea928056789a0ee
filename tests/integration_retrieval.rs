#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use scheme_advisor::SchemeError;
use scheme_advisor::config::{Config, GenerationConfig, OllamaConfig};
use scheme_advisor::database::lancedb::{VectorRecord, VectorStore};
use scheme_advisor::database::sqlite::Database;
use scheme_advisor::database::sqlite::models::{
    ChunkRow, DocumentStatus, NewDocumentRecord, NewIndexManifest,
};
use scheme_advisor::embeddings::chunking::{ChunkingConfig, chunk_page};
use scheme_advisor::embeddings::ollama::OllamaClient;
use scheme_advisor::extractor::PageText;
use scheme_advisor::retriever::RetrievalSession;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SCHOLARSHIP_TEXT: &str = "Applicants must have family income below Rs. 2,00,000 per year \
     to qualify for the Post-Matric Scholarship";

fn test_config(base_dir: &std::path::Path, server: &MockServer) -> Config {
    let address = server.address();
    Config {
        ollama: OllamaConfig {
            host: address.ip().to_string(),
            port: address.port(),
            embedding_dimension: 4,
            ..OllamaConfig::default()
        },
        generation: GenerationConfig::default(),
        chunking: ChunkingConfig::default(),
        base_dir: base_dir.to_path_buf(),
    }
}

/// Mount an embedding endpoint that answers every request with one fixed
/// vector per call.
async fn mount_embedding_backend(server: &MockServer, vector: Vec<f32>) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [vector] })),
        )
        .mount(server)
        .await;
}

/// Persist a one-document index the way a build run would: chunk the text,
/// embed it, then write vectors, metadata and manifest.
async fn index_single_document(config: &Config, doc_id: &str, text: &str) -> usize {
    let page = PageText {
        page_number: 1,
        text: text.to_string(),
    };
    let chunks = chunk_page(doc_id, &format!("{}.pdf", doc_id), &page, &config.chunking);

    let client = OllamaClient::new(config).expect("client should initialize");
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let client_for_task = client.clone();
    let vectors = tokio::task::spawn_blocking(move || client_for_task.embed_batch(&texts))
        .await
        .expect("task should not panic")
        .expect("embedding should succeed");

    let database = Database::new(config.database_path())
        .await
        .expect("database should initialize");
    let mut vector_store = VectorStore::new(config)
        .await
        .expect("vector store should initialize");

    let documents = vec![NewDocumentRecord {
        doc_id: doc_id.to_string(),
        file_name: format!("{}.pdf", doc_id),
        page_count: 1,
        chunk_count: chunks.len() as i64,
        status: DocumentStatus::Indexed,
        error_message: None,
    }];
    let chunk_rows: Vec<ChunkRow> = chunks
        .iter()
        .enumerate()
        .map(|(pos, chunk)| ChunkRow {
            chunk_pos: pos as i64,
            doc_id: chunk.doc_id.clone(),
            file_name: chunk.file_name.clone(),
            page_number: chunk.page_number as i64,
            chunk_no: chunk.chunk_no as i64,
            content: chunk.text.clone(),
        })
        .collect();

    database
        .reset_index(&documents, &chunk_rows)
        .await
        .expect("metadata reset should succeed");

    let dimension = vectors.first().map(Vec::len).unwrap_or(4);
    vector_store
        .rebuild(dimension)
        .await
        .expect("rebuild should succeed");
    let records: Vec<VectorRecord> = vectors
        .into_iter()
        .enumerate()
        .map(|(pos, vector)| VectorRecord {
            id: format!("row-{}", pos),
            chunk_pos: pos as u64,
            vector,
        })
        .collect();
    vector_store
        .store_batch(records)
        .await
        .expect("vector store write should succeed");

    database
        .write_manifest(&NewIndexManifest {
            build_id: "integration-build".to_string(),
            embedding_model: config.ollama.model.clone(),
            embedding_dimension: dimension as i64,
            distance_metric: "cosine".to_string(),
            row_count: chunk_rows.len() as i64,
        })
        .await
        .expect("manifest write should succeed");

    chunk_rows.len()
}

#[tokio::test(flavor = "multi_thread")]
async fn scholarship_question_retrieves_the_scholarship_chunk() {
    let temp_dir = TempDir::new().expect("temp dir");
    let server = MockServer::start().await;
    let config = test_config(temp_dir.path(), &server);

    mount_embedding_backend(&server, vec![0.6, 0.8, 0.0, 0.0]).await;

    let row_count = index_single_document(&config, "post-matric-scholarship", SCHOLARSHIP_TEXT).await;
    assert_eq!(row_count, 1, "the text should fit in a single chunk");

    let session = RetrievalSession::open(&config)
        .await
        .expect("session should open against a coherent pair");
    assert_eq!(session.row_count(), 1);

    let passages = session
        .search("income limit for Post-Matric Scholarship eligibility", 6)
        .await
        .expect("search should succeed");

    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].doc_id, "post-matric-scholarship");
    assert_eq!(passages[0].text, SCHOLARSHIP_TEXT);
    assert!(
        passages[0].score > 0.99,
        "identical embeddings should score ~1.0, got {}",
        passages[0].score
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn mismatched_model_never_serves_results() {
    let temp_dir = TempDir::new().expect("temp dir");
    let server = MockServer::start().await;
    let config = test_config(temp_dir.path(), &server);

    mount_embedding_backend(&server, vec![1.0, 0.0, 0.0, 0.0]).await;
    index_single_document(&config, "pension-go", "Aasara pension details.").await;

    let mut reconfigured = config.clone();
    reconfigured.ollama.model = "all-minilm:latest".to_string();

    let result = RetrievalSession::open(&reconfigured).await;
    assert!(matches!(result, Err(SchemeError::IndexMismatch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_query_never_reaches_the_backend() {
    let temp_dir = TempDir::new().expect("temp dir");
    let server = MockServer::start().await;
    let config = test_config(temp_dir.path(), &server);

    mount_embedding_backend(&server, vec![1.0, 0.0, 0.0, 0.0]).await;
    index_single_document(&config, "pension-go", "Aasara pension details.").await;

    // Drop the catch-all mock and replace it with one that must never fire.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[1.0]] })))
        .expect(0)
        .mount(&server)
        .await;

    let session = RetrievalSession::open(&config).await.expect("open");
    let result = session.search("", 6).await;

    assert!(matches!(result, Err(SchemeError::InvalidQuery(_))));
    server.verify().await;
}
