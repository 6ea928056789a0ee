use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::sqlite::models::{
    ChunkRow, DocumentRecord, IndexManifest, NewDocumentRecord, NewIndexManifest,
};
use crate::database::sqlite::queries::{ChunkQueries, DocumentQueries, ManifestQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// The metadata store: documents, chunk rows and the index manifest.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    pub async fn new<P: AsRef<Path>>(database_url: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_url)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    /// Replace all metadata with the rows of a fresh build.
    ///
    /// Runs in one transaction: the previous manifest is cleared first, so a
    /// crash mid-replacement leaves a store that fails pairing validation
    /// instead of serving stale rows.
    pub async fn reset_index(
        &self,
        documents: &[NewDocumentRecord],
        chunks: &[ChunkRow],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;

        ManifestQueries::clear(&mut tx).await?;
        sqlx::query("DELETE FROM chunks")
            .execute(&mut *tx)
            .await
            .context("Failed to clear chunks")?;
        sqlx::query("DELETE FROM documents")
            .execute(&mut *tx)
            .await
            .context("Failed to clear documents")?;

        for document in documents {
            DocumentQueries::insert(&mut tx, document).await?;
        }
        for chunk in chunks {
            ChunkQueries::insert(&mut tx, chunk).await?;
        }

        tx.commit().await.context("Failed to commit index reset")?;

        debug!(
            "Metadata store reset with {} documents and {} chunks",
            documents.len(),
            chunks.len()
        );
        Ok(())
    }

    /// Write the pairing manifest. Called last during a build.
    pub async fn write_manifest(&self, manifest: &NewIndexManifest) -> Result<()> {
        ManifestQueries::write(&self.pool, manifest).await
    }

    pub async fn manifest(&self) -> Result<Option<IndexManifest>> {
        ManifestQueries::get(&self.pool).await
    }

    pub async fn count_chunks(&self) -> Result<i64> {
        ChunkQueries::count(&self.pool).await
    }

    /// Random-access lookup by chunk position.
    ///
    /// Positions outside `[0, row_count)` are an error, never a silent miss.
    pub async fn chunk_at(&self, chunk_pos: i64) -> Result<ChunkRow> {
        if chunk_pos < 0 {
            anyhow::bail!("chunk position {} is negative", chunk_pos);
        }

        ChunkQueries::get_by_pos(&self.pool, chunk_pos)
            .await?
            .ok_or_else(|| anyhow::anyhow!("chunk position {} is out of range", chunk_pos))
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        DocumentQueries::list_all(&self.pool).await
    }

    /// Optimize database performance by running VACUUM and ANALYZE
    pub async fn optimize(&self) -> Result<()> {
        info!("Optimizing database performance");

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .context("Failed to vacuum database")?;

        sqlx::query("ANALYZE")
            .execute(&self.pool)
            .await
            .context("Failed to analyze database")?;

        debug!("Database optimization completed");
        Ok(())
    }
}
