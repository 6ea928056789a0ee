// Retriever module
// An immutable retrieval session over the paired index artifacts


use tracing::{debug, info};

use crate::config::Config;
use crate::database::lancedb::VectorStore;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::IndexManifest;
use crate::embeddings::ollama::OllamaClient;
use crate::{Result, SchemeError};

/// A read-only view over a built index, validated at open time.
///
/// Opening a session is the only way to query: it loads both stores, checks
/// the manifest pairing and refuses to serve a misaligned index. Once open it
/// holds no mutable state and is safe to share across readers.
pub struct RetrievalSession {
    database: Database,
    vector_store: VectorStore,
    ollama_client: OllamaClient,
    manifest: IndexManifest,
}

/// One ranked passage, ready for prompt assembly or display.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedPassage {
    pub chunk_pos: u64,
    pub doc_id: String,
    pub file_name: String,
    pub page_number: u32,
    pub text: String,
    /// Cosine similarity against the query, in `[-1, 1]`, higher is better.
    pub score: f32,
}

impl RetrievalSession {
    /// Open the persisted index pair and validate that it is coherent.
    #[inline]
    pub async fn open(config: &Config) -> Result<Self> {
        let database = Database::new(config.database_path())
            .await
            .map_err(|e| SchemeError::Database(e.to_string()))?;

        let vector_store = VectorStore::new(config).await?;

        let manifest = database
            .manifest()
            .await
            .map_err(|e| SchemeError::Database(e.to_string()))?
            .ok_or_else(|| {
                SchemeError::IndexMismatch(
                    "no index manifest found; run `scheme-advisor build` first".to_string(),
                )
            })?;

        let chunk_count = database
            .count_chunks()
            .await
            .map_err(|e| SchemeError::Database(e.to_string()))?;
        let vector_count = vector_store.count().await?;

        if chunk_count != manifest.row_count || vector_count as i64 != manifest.row_count {
            return Err(SchemeError::IndexMismatch(format!(
                "row counts disagree: manifest {}, metadata store {}, vector index {}",
                manifest.row_count, chunk_count, vector_count
            )));
        }

        if manifest.embedding_model != config.ollama.model {
            return Err(SchemeError::IndexMismatch(format!(
                "index was built with embedding model '{}' but '{}' is configured",
                manifest.embedding_model, config.ollama.model
            )));
        }

        let ollama_client = OllamaClient::new(config)
            .map_err(|e| SchemeError::Embedding(e.to_string()))?;

        info!(
            "Retrieval session open: {} chunks, model {}, metric {}",
            manifest.row_count, manifest.embedding_model, manifest.distance_metric
        );

        Ok(Self {
            database,
            vector_store,
            ollama_client,
            manifest,
        })
    }

    #[inline]
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    #[inline]
    pub fn row_count(&self) -> u64 {
        self.manifest.row_count as u64
    }

    /// Retrieve the `top_k` passages most similar to `query`.
    ///
    /// Results are ordered by descending score; ties break toward the lower
    /// chunk position. `top_k` is clamped to the index size, and an empty
    /// index yields an empty list. Empty or whitespace queries are rejected
    /// before any embedding work happens.
    #[inline]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        if query.trim().is_empty() {
            return Err(SchemeError::InvalidQuery(
                "query text is empty".to_string(),
            ));
        }

        let limit = top_k.min(self.row_count() as usize);
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .ollama_client
            .embed(query)
            .map_err(|e| SchemeError::Embedding(e.to_string()))?;

        let hits = self.vector_store.search(&query_vector, limit).await?;
        debug!("Vector search returned {} hits", hits.len());

        let mut passages = Vec::with_capacity(hits.len());
        for hit in hits {
            let row = self
                .database
                .chunk_at(hit.chunk_pos as i64)
                .await
                .map_err(|e| {
                    SchemeError::IndexMismatch(format!(
                        "vector row {} has no metadata row: {}",
                        hit.chunk_pos, e
                    ))
                })?;

            passages.push(RetrievedPassage {
                chunk_pos: hit.chunk_pos,
                doc_id: row.doc_id,
                file_name: row.file_name,
                page_number: row.page_number as u32,
                text: row.content,
                score: hit.similarity_score,
            });
        }

        // The backend's ordering is close but not contractual; make the
        // score-then-position ordering explicit and deterministic.
        passages.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.chunk_pos.cmp(&b.chunk_pos))
        });
        passages.truncate(limit);

        Ok(passages)
    }
}
