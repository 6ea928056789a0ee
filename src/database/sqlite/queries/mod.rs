#[cfg(test)]
mod tests;

use super::models::{
    ChunkRow, DocumentRecord, DocumentStatus, IndexManifest, NewDocumentRecord, NewIndexManifest,
};
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

pub struct DocumentQueries;

impl DocumentQueries {
    #[inline]
    pub async fn insert(
        tx: &mut Transaction<'_, Sqlite>,
        record: &NewDocumentRecord,
    ) -> Result<()> {
        let status = match record.status {
            DocumentStatus::Indexed => "indexed",
            DocumentStatus::Failed => "failed",
        };
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT INTO documents (doc_id, file_name, page_count, chunk_count, status, error_message, ingested_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.doc_id)
        .bind(&record.file_name)
        .bind(record.page_count)
        .bind(record.chunk_count)
        .bind(status)
        .bind(&record.error_message)
        .bind(now)
        .execute(&mut **tx)
        .await
        .context("Failed to insert document record")?;

        Ok(())
    }

    #[inline]
    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<DocumentRecord>> {
        let documents = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, doc_id, file_name, page_count, chunk_count, status, error_message, ingested_date
             FROM documents ORDER BY doc_id",
        )
        .fetch_all(pool)
        .await
        .context("Failed to list documents")?;

        Ok(documents)
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    #[inline]
    pub async fn insert(tx: &mut Transaction<'_, Sqlite>, chunk: &ChunkRow) -> Result<()> {
        sqlx::query(
            "INSERT INTO chunks (chunk_pos, doc_id, file_name, page_number, chunk_no, content)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(chunk.chunk_pos)
        .bind(&chunk.doc_id)
        .bind(&chunk.file_name)
        .bind(chunk.page_number)
        .bind(chunk.chunk_no)
        .bind(&chunk.content)
        .execute(&mut **tx)
        .await
        .context("Failed to insert chunk row")?;

        Ok(())
    }

    #[inline]
    pub async fn get_by_pos(pool: &SqlitePool, chunk_pos: i64) -> Result<Option<ChunkRow>> {
        let row = sqlx::query_as::<_, ChunkRow>(
            "SELECT chunk_pos, doc_id, file_name, page_number, chunk_no, content
             FROM chunks WHERE chunk_pos = ?",
        )
        .bind(chunk_pos)
        .fetch_optional(pool)
        .await
        .context("Failed to get chunk by position")?;

        Ok(row)
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(pool)
            .await
            .context("Failed to count chunks")?;

        Ok(count)
    }
}

pub struct ManifestQueries;

impl ManifestQueries {
    #[inline]
    pub async fn write(pool: &SqlitePool, manifest: &NewIndexManifest) -> Result<()> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            "INSERT OR REPLACE INTO index_manifest
             (id, build_id, embedding_model, embedding_dimension, distance_metric, row_count, built_date)
             VALUES (1, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&manifest.build_id)
        .bind(&manifest.embedding_model)
        .bind(manifest.embedding_dimension)
        .bind(&manifest.distance_metric)
        .bind(manifest.row_count)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to write index manifest")?;

        Ok(())
    }

    #[inline]
    pub async fn get(pool: &SqlitePool) -> Result<Option<IndexManifest>> {
        let manifest = sqlx::query_as::<_, IndexManifest>(
            "SELECT build_id, embedding_model, embedding_dimension, distance_metric, row_count, built_date
             FROM index_manifest WHERE id = 1",
        )
        .fetch_optional(pool)
        .await
        .context("Failed to read index manifest")?;

        Ok(manifest)
    }

    #[inline]
    pub async fn clear(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
        sqlx::query("DELETE FROM index_manifest")
            .execute(&mut **tx)
            .await
            .context("Failed to clear index manifest")?;
        Ok(())
    }
}
