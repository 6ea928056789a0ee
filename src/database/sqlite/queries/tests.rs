use super::*;
use crate::database::sqlite::Database;
use tempfile::TempDir;

async fn test_pool() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let database = Database::new(temp_dir.path().join("metadata.db"))
        .await
        .expect("should create database");
    (database, temp_dir)
}

#[tokio::test]
async fn chunk_insert_and_get_by_pos() {
    let (database, _dir) = test_pool().await;

    let row = ChunkRow {
        chunk_pos: 0,
        doc_id: "pension".to_string(),
        file_name: "pension.pdf".to_string(),
        page_number: 3,
        chunk_no: 2,
        content: "Aasara pension for widows".to_string(),
    };

    let mut tx = database.pool().begin().await.expect("begin");
    ChunkQueries::insert(&mut tx, &row).await.expect("insert");
    tx.commit().await.expect("commit");

    let loaded = ChunkQueries::get_by_pos(database.pool(), 0)
        .await
        .expect("query")
        .expect("row should exist");
    assert_eq!(loaded, row);

    let missing = ChunkQueries::get_by_pos(database.pool(), 7)
        .await
        .expect("query");
    assert!(missing.is_none());
}

#[tokio::test]
async fn duplicate_chunk_pos_is_rejected() {
    let (database, _dir) = test_pool().await;

    let row = ChunkRow {
        chunk_pos: 0,
        doc_id: "a".to_string(),
        file_name: "a.pdf".to_string(),
        page_number: 1,
        chunk_no: 1,
        content: "first".to_string(),
    };

    let mut tx = database.pool().begin().await.expect("begin");
    ChunkQueries::insert(&mut tx, &row).await.expect("insert");
    let duplicate = ChunkQueries::insert(&mut tx, &row).await;
    assert!(duplicate.is_err(), "positions must never be reused");
}

#[tokio::test]
async fn manifest_is_single_row() {
    let (database, _dir) = test_pool().await;

    for build in ["build-1", "build-2"] {
        ManifestQueries::write(
            database.pool(),
            &NewIndexManifest {
                build_id: build.to_string(),
                embedding_model: "m".to_string(),
                embedding_dimension: 768,
                distance_metric: "cosine".to_string(),
                row_count: 1,
            },
        )
        .await
        .expect("write");
    }

    let manifest = ManifestQueries::get(database.pool())
        .await
        .expect("query")
        .expect("manifest should exist");
    assert_eq!(manifest.build_id, "build-2");
}
