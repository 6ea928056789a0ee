use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemeError>;

#[derive(Error, Debug)]
pub enum SchemeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Extraction error for document '{document}': {reason}")]
    Extraction { document: String, reason: String },

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod extractor;
pub mod generation;
pub mod indexer;
pub mod retriever;
pub mod sources;
