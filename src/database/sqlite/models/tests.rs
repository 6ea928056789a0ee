use super::*;

#[test]
fn document_status_display() {
    assert_eq!(DocumentStatus::Indexed.to_string(), "Indexed");
    assert_eq!(DocumentStatus::Failed.to_string(), "Failed");
}

#[test]
fn document_record_status_helpers() {
    let record = DocumentRecord {
        id: 1,
        doc_id: "pension-go-43".to_string(),
        file_name: "pension-go-43.pdf".to_string(),
        page_count: 4,
        chunk_count: 12,
        status: DocumentStatus::Indexed,
        error_message: None,
        ingested_date: chrono::Utc::now().naive_utc(),
    };

    assert!(record.is_indexed());
    assert!(!record.is_failed());
}

#[test]
fn manifest_serializes_round_trip() {
    let manifest = IndexManifest {
        build_id: "b-1".to_string(),
        embedding_model: "nomic-embed-text:latest".to_string(),
        embedding_dimension: 768,
        distance_metric: "cosine".to_string(),
        row_count: 42,
        built_date: chrono::Utc::now().naive_utc(),
    };

    let json = serde_json::to_string(&manifest).expect("should serialize");
    let back: IndexManifest = serde_json::from_str(&json).expect("should deserialize");
    assert_eq!(back, manifest);
}
