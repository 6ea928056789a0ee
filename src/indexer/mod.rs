// Indexer module
// One-shot batch build: corpus directory in, paired index artifacts out


use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::SchemeError;
use crate::config::Config;
use crate::database::lancedb::{VectorRecord, VectorStore};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{
    ChunkRow, DocumentStatus, NewDocumentRecord, NewIndexManifest,
};
use crate::embeddings::chunking::{DocumentChunk, chunk_document};
use crate::embeddings::ollama::OllamaClient;
use crate::extractor::extract_document;

/// Similarity metric fixed at build time and recorded in the manifest.
pub const DISTANCE_METRIC: &str = "cosine";

const PERSIST_BATCH_SIZE: usize = 256;

/// Builds the paired vector index and metadata store from a PDF corpus.
///
/// A build replaces the persisted index wholesale; nothing is persisted when
/// the embedding backend fails partway.
pub struct IndexBuilder {
    config: Config,
    database: Database,
    vector_store: VectorStore,
    ollama_client: OllamaClient,
}

/// Summary of one completed ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub build_id: String,
    pub documents_indexed: usize,
    pub documents_failed: usize,
    pub chunks_created: usize,
    pub embedding_dimension: usize,
}

impl IndexBuilder {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(config.get_base_dir()).with_context(|| {
            format!(
                "Failed to create base directory: {}",
                config.get_base_dir().display()
            )
        })?;

        let database = Database::new(config.database_path())
            .await
            .context("Failed to initialize SQLite metadata store")?;

        let vector_store = VectorStore::new(&config)
            .await
            .context("Failed to initialize LanceDB vector store")?;

        let ollama_client =
            OllamaClient::new(&config).context("Failed to initialize Ollama client")?;

        Ok(Self {
            config,
            database,
            vector_store,
            ollama_client,
        })
    }

    /// Run a full build over `corpus_dir`.
    ///
    /// Unreadable documents are skipped and recorded; an embedding backend
    /// failure aborts the build before anything is persisted.
    #[inline]
    pub async fn build(&mut self, corpus_dir: &Path) -> crate::Result<BuildReport> {
        let pdf_paths = scan_corpus(corpus_dir)?;
        info!(
            "Building index from {} PDFs in {}",
            pdf_paths.len(),
            corpus_dir.display()
        );

        // Phase 1: extract and chunk everything up front. Failures here are
        // per-document and recoverable.
        let mut documents = Vec::new();
        let mut chunks: Vec<DocumentChunk> = Vec::new();

        for path in &pdf_paths {
            match extract_document(path) {
                Ok(extracted) => {
                    let document_chunks = chunk_document(&extracted, &self.config.chunking);
                    documents.push(NewDocumentRecord {
                        doc_id: extracted.doc_id.clone(),
                        file_name: extracted.file_name.clone(),
                        page_count: extracted.page_count as i64,
                        chunk_count: document_chunks.len() as i64,
                        status: DocumentStatus::Indexed,
                        error_message: if extracted.warnings.is_empty() {
                            None
                        } else {
                            Some(extracted.warnings.join("; "))
                        },
                    });
                    chunks.extend(document_chunks);
                }
                Err(SchemeError::Extraction { document, reason }) => {
                    warn!("Skipping unreadable document '{}': {}", document, reason);
                    documents.push(NewDocumentRecord {
                        doc_id: document,
                        file_name: path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        page_count: 0,
                        chunk_count: 0,
                        status: DocumentStatus::Failed,
                        error_message: Some(reason),
                    });
                }
                Err(other) => return Err(other),
            }
        }

        // Phase 2: embed every chunk. Fatal on failure; the previous index
        // stays untouched because nothing has been persisted yet.
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embed_all(&texts)?;

        let embedding_dimension = vectors
            .first()
            .map(Vec::len)
            .unwrap_or(self.config.ollama.embedding_dimension as usize);

        // Phase 3: persist the pair. The metadata reset clears the manifest
        // first and the new manifest is written last, so a crash in between
        // leaves a store that fails pairing validation instead of silently
        // serving a misaligned index.
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

        self.database
            .reset_index(&documents, &chunk_rows)
            .await
            .map_err(|e| SchemeError::Database(e.to_string()))?;

        self.vector_store.rebuild(embedding_dimension).await?;

        let records: Vec<VectorRecord> = vectors
            .into_iter()
            .enumerate()
            .map(|(pos, vector)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                chunk_pos: pos as u64,
                vector,
            })
            .collect();

        for batch in records.chunks(PERSIST_BATCH_SIZE) {
            self.vector_store.store_batch(batch.to_vec()).await?;
        }

        let build_id = Uuid::new_v4().to_string();
        self.database
            .write_manifest(&NewIndexManifest {
                build_id: build_id.clone(),
                embedding_model: self.ollama_client.model().to_string(),
                embedding_dimension: embedding_dimension as i64,
                distance_metric: DISTANCE_METRIC.to_string(),
                row_count: chunk_rows.len() as i64,
            })
            .await
            .map_err(|e| SchemeError::Database(e.to_string()))?;

        if !chunk_rows.is_empty() {
            if let Err(e) = self.vector_store.optimize().await {
                warn!("Failed to optimize vector index: {}", e);
            }
        }

        let report = BuildReport {
            build_id,
            documents_indexed: documents
                .iter()
                .filter(|d| d.status == DocumentStatus::Indexed)
                .count(),
            documents_failed: documents
                .iter()
                .filter(|d| d.status == DocumentStatus::Failed)
                .count(),
            chunks_created: chunk_rows.len(),
            embedding_dimension,
        };

        info!(
            "Index build complete: {} documents, {} chunks, {} dimensions",
            report.documents_indexed, report.chunks_created, report.embedding_dimension
        );

        Ok(report)
    }

    fn embed_all(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let progress = ProgressBar::new(texts.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message("Embedding chunks");

        let batch_size = self.config.ollama.batch_size as usize;
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(batch_size) {
            let batch_vectors = self
                .ollama_client
                .embed_batch(batch)
                .map_err(|e| SchemeError::Embedding(e.to_string()))?;
            vectors.extend(batch_vectors);
            progress.inc(batch.len() as u64);
        }

        progress.finish_and_clear();
        debug!("Embedded {} chunks", vectors.len());
        Ok(vectors)
    }
}

/// List the PDF files of the corpus directory in a stable order.
pub(crate) fn scan_corpus(corpus_dir: &Path) -> crate::Result<Vec<PathBuf>> {
    if !corpus_dir.is_dir() {
        return Err(SchemeError::Config(format!(
            "Corpus directory does not exist: {}",
            corpus_dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(corpus_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();

    // Sorted by file name so repeated builds assign identical positions.
    paths.sort();
    Ok(paths)
}
