// LanceDB vector index module
// Stores one embedding row per chunk, keyed by the dense chunk position

pub mod vector_store;

pub use vector_store::{VectorHit, VectorRecord, VectorStore};
