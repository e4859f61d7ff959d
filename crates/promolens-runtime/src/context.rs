//! Process-wide pipeline context.
//!
//! Built once at startup and shared by reference. Holds the OCR engine,
//! the active platform catalog, the embedder and the vector index.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::aggregator::MultiImageAggregator;
use crate::index::EmbeddingIndex;
use promolens_core::{PromoLensConfig, Result};
use promolens_extract::{FieldExtractor, PlatformCatalog, PlatformClassifier};
use promolens_infer::Embedder;
use promolens_ocr::{create_engine, OcrEngine, TextExtractor};
use promolens_store::VectorStore;

pub struct PipelineContext {
    pub config: PromoLensConfig,
    classifier: RwLock<Arc<PlatformClassifier>>,
    text_extractor: Arc<TextExtractor>,
    field_extractor: FieldExtractor,
    index: EmbeddingIndex,
    today: Option<NaiveDate>,
}

impl PipelineContext {
    /// Build every component from configuration.
    ///
    /// A catalog file that fails to load is logged and replaced by the
    /// built-in catalog. A vector index that cannot be opened is fatal.
    pub fn build(config: PromoLensConfig) -> Result<Self> {
        let catalog = load_catalog(&config.catalog_file());
        let engine = create_engine(&config.ocr);
        let embedder = Arc::new(Embedder::from_config(
            &config.embedding,
            config.model_dir(),
        ));
        let store = VectorStore::open(config.data_paths().vectordb, config.embedding.dimension)?;
        Self::from_parts(config, catalog, engine, embedder, store)
    }

    /// Assemble a context from prebuilt components.
    pub fn from_parts(
        config: PromoLensConfig,
        catalog: PlatformCatalog,
        engine: Arc<dyn OcrEngine>,
        embedder: Arc<Embedder>,
        store: VectorStore,
    ) -> Result<Self> {
        let classifier = PlatformClassifier::new(Arc::new(catalog), config.classifier.clone())?;
        info!(
            "Pipeline ready: ocr={}, platforms={}, dim={}",
            engine.name(),
            classifier.catalog().len(),
            store.dimension()
        );
        Ok(Self {
            classifier: RwLock::new(Arc::new(classifier)),
            text_extractor: Arc::new(TextExtractor::new(engine)),
            field_extractor: FieldExtractor::new(),
            index: EmbeddingIndex::new(embedder, store),
            today: None,
            config,
        })
    }

    /// Pin the reference day used for status inference.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Start loading the embedding model in the background.
    pub fn warm_up(&self) -> tokio::task::JoinHandle<()> {
        self.index.embedder().warm_up()
    }

    /// Snapshot of the active classifier. In-flight submissions keep the
    /// snapshot they started with across a catalog reload.
    pub fn classifier(&self) -> Arc<PlatformClassifier> {
        self.classifier.read().clone()
    }

    pub fn catalog(&self) -> Arc<PlatformCatalog> {
        self.classifier.read().catalog().clone()
    }

    pub fn text_extractor(&self) -> &Arc<TextExtractor> {
        &self.text_extractor
    }

    pub fn field_extractor(&self) -> &FieldExtractor {
        &self.field_extractor
    }

    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    /// Replace the catalog with the one in `path`, returning the number of
    /// platforms now active. On any error the current catalog stays in place.
    pub fn reload_catalog(&self, path: &Path) -> Result<usize> {
        let result = PlatformCatalog::from_json_file(path).and_then(|catalog| {
            PlatformClassifier::new(Arc::new(catalog), self.config.classifier.clone())
        });
        match result {
            Ok(classifier) => {
                let count = classifier.catalog().len();
                *self.classifier.write() = Arc::new(classifier);
                info!("Catalog reloaded from {}: {} platforms", path.display(), count);
                Ok(count)
            }
            Err(e) => {
                warn!(
                    "Catalog reload from {} failed, keeping current catalog: {}",
                    path.display(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Aggregator bound to the current classifier snapshot.
    pub fn aggregator(&self) -> MultiImageAggregator {
        let aggregator = MultiImageAggregator::new(
            Arc::clone(&self.text_extractor),
            self.classifier(),
            self.field_extractor,
            self.config.merge.clone(),
        );
        match self.today {
            Some(today) => aggregator.with_today(today),
            None => aggregator,
        }
    }
}

/// Catalog from `path` if it exists and is valid, otherwise the built-in one.
pub fn load_catalog(path: &Path) -> PlatformCatalog {
    if !path.is_file() {
        return PlatformCatalog::builtin();
    }
    match PlatformCatalog::from_json_file(path) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("Ignoring catalog {}: {}. Using built-in catalog.", path.display(), e);
            PlatformCatalog::builtin()
        }
    }
}
