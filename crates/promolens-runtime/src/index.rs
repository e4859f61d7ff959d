//! Embedding index: embeds merged results and persists them as vector records.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use promolens_core::{MergedOcrResult, Result};
use promolens_infer::Embedder;
use promolens_store::{IndexStats, RecordMetadata, SimilarRecord, VectorRecord, VectorStore};

pub struct EmbeddingIndex {
    embedder: Arc<Embedder>,
    store: VectorStore,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<Embedder>, store: VectorStore) -> Self {
        Self { embedder, store }
    }

    pub fn embedder(&self) -> &Arc<Embedder> {
        &self.embedder
    }

    pub fn dimension(&self) -> usize {
        self.store.dimension()
    }

    /// Embed a merged result and append it to the index.
    pub async fn store(
        &self,
        merged: &MergedOcrResult,
        platform_id: &str,
        image_paths: &[PathBuf],
    ) -> Result<VectorRecord> {
        let text = merged.embedding_text();
        let embedding = self.embedder.embed(&text).await;

        let metadata = RecordMetadata {
            platform_id: platform_id.to_string(),
            image_paths: image_paths
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            extracted_data: merged.extracted_data.clone(),
            detected_platform: merged.detected_platform.clone(),
            embedding_source: embedding.source,
            created_at: Utc::now(),
        };
        let record = VectorRecord::new(text, embedding.vector.to_vec(), metadata);
        self.store.insert(&record)?;

        info!(
            "Indexed record {} for {} ({} embedding, {} images)",
            record.id,
            platform_id,
            embedding.source,
            image_paths.len()
        );
        Ok(record)
    }

    /// Records most similar to `query` across the whole index.
    pub async fn find_similar(&self, query: &str, limit: usize) -> Result<Vec<SimilarRecord>> {
        self.search(query, limit, None).await
    }

    /// Like `find_similar`, restricted to one platform id.
    pub async fn find_similar_for_platform(
        &self,
        platform_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SimilarRecord>> {
        self.search(query, limit, Some(platform_id)).await
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        platform_id: Option<&str>,
    ) -> Result<Vec<SimilarRecord>> {
        let embedding = self.embedder.embed(query).await;
        debug!(
            "Similarity query via {} embedding (cached={})",
            embedding.source, embedding.cached
        );
        self.store
            .find_similar(embedding.vector.view(), limit, platform_id)
    }

    pub fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        self.store.get(id)
    }

    pub fn count(&self) -> Result<i64> {
        self.store.count()
    }

    pub fn list_for_platform(&self, platform_id: &str) -> Result<Vec<VectorRecord>> {
        self.store.list_for_platform(platform_id)
    }

    pub fn stats(&self) -> Result<IndexStats> {
        self.store.stats()
    }
}
