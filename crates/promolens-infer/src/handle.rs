//! Shared embedding handle: one model load per process, fallback on failure.

use std::path::PathBuf;
use std::sync::Arc;

use ndarray::Array1;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::cache::QueryCache;
use crate::embedder::{BucketEmbedder, EmbedderBackend};
use promolens_core::{EmbeddingConfig, EmbeddingSource};

/// Produces the model backend. Runs once, on the blocking pool.
pub type ModelLoader =
    Arc<dyn Fn() -> std::result::Result<Arc<dyn EmbedderBackend>, String> + Send + Sync>;

/// A vector together with the path that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Array1<f32>,
    pub source: EmbeddingSource,
    pub cached: bool,
}

/// Embedding entry point for the pipeline.
///
/// The model loads asynchronously the first time it is needed, or earlier
/// via [`Embedder::warm_up`]. Calls issued while the load is in flight wait
/// for it to settle. A missing model, a model whose output size differs from
/// the index dimension, or a failed inference all degrade to the bucket
/// fallback, so `embed` never fails.
pub struct Embedder {
    dimension: usize,
    loader: ModelLoader,
    model: OnceCell<Option<Arc<dyn EmbedderBackend>>>,
    fallback: BucketEmbedder,
    cache: QueryCache,
}

impl Embedder {
    pub fn new(config: &EmbeddingConfig, loader: ModelLoader) -> Self {
        Self {
            dimension: config.dimension,
            loader,
            model: OnceCell::new(),
            fallback: BucketEmbedder::new(config.dimension),
            cache: QueryCache::from_config(config),
        }
    }

    /// Embedder backed by the ONNX model in `model_dir` when the `onnx`
    /// feature is enabled.
    pub fn from_config(config: &EmbeddingConfig, model_dir: PathBuf) -> Self {
        Self::new(config, onnx_loader(model_dir))
    }

    /// Embedder that never loads a model.
    pub fn fallback_only(config: &EmbeddingConfig) -> Self {
        Self::new(config, Arc::new(no_model))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Start loading the model in the background.
    pub fn warm_up(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.model().await;
        })
    }

    /// `None` while loading, then whether a usable model was loaded.
    pub fn model_loaded(&self) -> Option<bool> {
        self.model.get().map(Option::is_some)
    }

    async fn model(&self) -> Option<Arc<dyn EmbedderBackend>> {
        self.model
            .get_or_init(|| async {
                let loader = Arc::clone(&self.loader);
                match tokio::task::spawn_blocking(move || loader()).await {
                    Ok(Ok(backend)) if backend.dimension() == self.dimension => {
                        info!(
                            "Embedding model '{}' ready (dim={})",
                            backend.name(),
                            backend.dimension()
                        );
                        Some(backend)
                    }
                    Ok(Ok(backend)) => {
                        warn!(
                            "Embedding model '{}' outputs {} dims, index expects {}. Using fallback.",
                            backend.name(),
                            backend.dimension(),
                            self.dimension
                        );
                        None
                    }
                    Ok(Err(e)) => {
                        warn!("Embedding model unavailable: {}. Using fallback.", e);
                        None
                    }
                    Err(e) => {
                        warn!("Embedding model load task failed: {}. Using fallback.", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    pub async fn embed(&self, text: &str) -> Embedding {
        if let Some(vector) = self.cache.get(text) {
            return Embedding {
                vector,
                source: EmbeddingSource::Model,
                cached: true,
            };
        }

        if let Some(model) = self.model().await {
            let owned = text.to_string();
            match tokio::task::spawn_blocking(move || model.embed(&owned)).await {
                Ok(Ok(vector)) if vector.len() == self.dimension => {
                    self.cache.put(text.to_string(), vector.clone());
                    return Embedding {
                        vector,
                        source: EmbeddingSource::Model,
                        cached: false,
                    };
                }
                Ok(Ok(vector)) => warn!(
                    "Model returned {} dims instead of {}, using fallback",
                    vector.len(),
                    self.dimension
                ),
                Ok(Err(e)) => warn!("{}, using fallback", e),
                Err(e) => warn!("Embedding task failed: {}, using fallback", e),
            }
        }

        Embedding {
            vector: self.fallback.vectorize(text),
            source: EmbeddingSource::Fallback,
            cached: false,
        }
    }
}

fn no_model() -> std::result::Result<Arc<dyn EmbedderBackend>, String> {
    Err("no embedding model configured".to_string())
}

#[cfg(feature = "onnx")]
fn onnx_loader(model_dir: PathBuf) -> ModelLoader {
    Arc::new(move || {
        crate::onnx_embedder::OnnxEmbedder::load(&model_dir)
            .map(|m| Arc::new(m) as Arc<dyn EmbedderBackend>)
    })
}

#[cfg(not(feature = "onnx"))]
fn onnx_loader(model_dir: PathBuf) -> ModelLoader {
    Arc::new(move || {
        Err::<Arc<dyn EmbedderBackend>, _>(format!(
            "onnx feature disabled, ignoring model directory {}",
            model_dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use promolens_core::{Error, Result};

    /// Puts all weight on the first component.
    struct UnitModel {
        dim: usize,
        calls: Arc<AtomicUsize>,
    }

    impl EmbedderBackend for UnitModel {
        fn embed(&self, _text: &str) -> Result<Array1<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut v = Array1::zeros(self.dim);
            v[0] = 1.0;
            Ok(v)
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn name(&self) -> &'static str {
            "unit"
        }
    }

    struct BrokenModel;

    impl EmbedderBackend for BrokenModel {
        fn embed(&self, _text: &str) -> Result<Array1<f32>> {
            Err(Error::Embedding("session poisoned".into()))
        }

        fn dimension(&self) -> usize {
            8
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn config(dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            dimension,
            ..Default::default()
        }
    }

    fn unit_loader(dim: usize, calls: Arc<AtomicUsize>) -> ModelLoader {
        Arc::new(move || {
            Ok::<_, String>(Arc::new(UnitModel {
                dim,
                calls: Arc::clone(&calls),
            }) as Arc<dyn EmbedderBackend>)
        })
    }

    #[tokio::test]
    async fn test_model_path_and_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let embedder = Embedder::new(&config(8), unit_loader(8, Arc::clone(&calls)));

        let first = embedder.embed("暑期特惠").await;
        assert_eq!(first.source, EmbeddingSource::Model);
        assert!(!first.cached);
        assert_eq!(first.vector.len(), 8);

        let second = embedder.embed("暑期特惠").await;
        assert!(second.cached);
        assert_eq!(second.vector, first.vector);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.model_loaded(), Some(true));
    }

    #[tokio::test]
    async fn test_missing_model_falls_back() {
        let embedder = Embedder::fallback_only(&config(256));
        let e = embedder.embed("携程 ebooking").await;
        assert_eq!(e.source, EmbeddingSource::Fallback);
        assert_eq!(e.vector.len(), 256);
        assert_eq!(e.vector, BucketEmbedder::new(256).vectorize("携程 ebooking"));
        assert_eq!(embedder.model_loaded(), Some(false));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejects_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let embedder = Embedder::new(&config(16), unit_loader(8, Arc::clone(&calls)));
        let e = embedder.embed("text").await;
        assert_eq!(e.source, EmbeddingSource::Fallback);
        assert_eq!(e.vector.len(), 16);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_inference_error_falls_back() {
        let loader: ModelLoader =
            Arc::new(|| Ok::<_, String>(Arc::new(BrokenModel) as Arc<dyn EmbedderBackend>));
        let embedder = Embedder::new(&config(8), loader);
        let e = embedder.embed("text").await;
        assert_eq!(e.source, EmbeddingSource::Fallback);
        assert_eq!(embedder.model_loaded(), Some(true));
    }

    #[tokio::test]
    async fn test_requests_wait_for_slow_load() {
        let calls = Arc::new(AtomicUsize::new(0));
        let inner = unit_loader(8, Arc::clone(&calls));
        let slow: ModelLoader = Arc::new(move || {
            std::thread::sleep(Duration::from_millis(50));
            inner()
        });
        let embedder = Arc::new(Embedder::new(&config(8), slow));
        let warm = embedder.warm_up();
        assert_eq!(embedder.model_loaded(), None);

        let e = embedder.embed("early request").await;
        assert_eq!(e.source, EmbeddingSource::Model);
        warm.await.unwrap();
    }
}
