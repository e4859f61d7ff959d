//! PromoLens Infer: text embeddings for the similarity index.
//!
//! `Embedder` is the handle the pipeline holds. It loads the ONNX sentence
//! model once (feature `onnx`) and serves `BucketEmbedder` vectors whenever
//! the model is absent, incompatible or failing, so a vector of the index
//! dimension is always produced.

pub mod cache;
pub mod embedder;
pub mod handle;
pub mod onnx_embedder;

pub use cache::QueryCache;
pub use embedder::{l2_normalize, BucketEmbedder, EmbedderBackend};
pub use handle::{Embedder, Embedding, ModelLoader};

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;
