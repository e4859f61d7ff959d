//! Types stored in and returned by the vector index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use promolens_core::{EmbeddingSource, ExtractedFields, PlatformMatch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Platform or account identifier supplied with the submission.
    pub platform_id: String,
    pub image_paths: Vec<String>,
    pub extracted_data: ExtractedFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_platform: Option<PlatformMatch>,
    pub embedding_source: EmbeddingSource,
    pub created_at: DateTime<Utc>,
}

/// One persisted record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl VectorRecord {
    /// New record with a fresh UUID v4 id.
    pub fn new(text: String, vector: Vec<f32>, metadata: RecordMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text,
            vector,
            metadata,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A record with its similarity to the query, in -1..=1.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRecord {
    pub record: VectorRecord,
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub records: i64,
    pub platforms: i64,
    pub dimension: usize,
    pub db_path: String,
    pub db_size_mb: f64,
}
