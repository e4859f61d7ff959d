//! PromoLens Store: append-only SQLite vector index with full-scan
//! cosine similarity search.

pub mod embedding;
pub mod schema;
pub mod sqlite;
pub mod types;

pub use embedding::cosine_similarity;
pub use sqlite::VectorStore;
pub use types::*;
