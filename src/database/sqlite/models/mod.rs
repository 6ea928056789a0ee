#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Ingestion record for one source PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentRecord {
    pub id: i64,
    pub doc_id: String,
    pub file_name: String,
    pub page_count: i64,
    pub chunk_count: i64,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
    pub ingested_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum DocumentStatus {
    Indexed,
    Failed,
}

impl std::fmt::Display for DocumentStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DocumentStatus::Indexed => write!(f, "Indexed"),
            DocumentStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocumentRecord {
    pub doc_id: String,
    pub file_name: String,
    pub page_count: i64,
    pub chunk_count: i64,
    pub status: DocumentStatus,
    pub error_message: Option<String>,
}

/// One metadata row, keyed by the dense chunk position shared with the
/// vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ChunkRow {
    pub chunk_pos: i64,
    pub doc_id: String,
    pub file_name: String,
    pub page_number: i64,
    pub chunk_no: i64,
    pub content: String,
}

/// The pairing tag between the vector index and the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IndexManifest {
    pub build_id: String,
    pub embedding_model: String,
    pub embedding_dimension: i64,
    pub distance_metric: String,
    pub row_count: i64,
    pub built_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIndexManifest {
    pub build_id: String,
    pub embedding_model: String,
    pub embedding_dimension: i64,
    pub distance_metric: String,
    pub row_count: i64,
}

impl DocumentRecord {
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.status == DocumentStatus::Indexed
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        self.status == DocumentStatus::Failed
    }
}
