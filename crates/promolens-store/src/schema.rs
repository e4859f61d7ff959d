//! Database schema SQL.

/// One row per stored record. Rows are never updated or deleted.
///
/// `vector` holds little-endian f32 components; `metadata_json` is the
/// serialized `RecordMetadata`; `created_at` is Unix milliseconds.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vector_records (
    id TEXT PRIMARY KEY,
    platform_id TEXT NOT NULL,
    text TEXT NOT NULL,
    vector BLOB NOT NULL,
    dimension INTEGER NOT NULL,
    metadata_json TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vector_records_platform ON vector_records(platform_id);
CREATE INDEX IF NOT EXISTS idx_vector_records_created ON vector_records(created_at);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Key in `index_meta` pinning the vector dimension of the whole index.
pub const DIMENSION_KEY: &str = "dimension";
