// Embeddings module
// Chunking of extracted text and the Ollama embedding client

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, DocumentChunk, chunk_document, chunk_page};
pub use ollama::OllamaClient;
