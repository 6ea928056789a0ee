// Storage layer
// LanceDB holds the vectors, SQLite holds the passage metadata; the two are
// paired row-for-row through the dense chunk position and the index manifest.

pub mod lancedb;
pub mod sqlite;
