//! PromoLens runtime. Wires OCR, classification, extraction and the
//! embedding index into the multi-image submission pipeline.

pub mod aggregator;
pub mod context;
pub mod index;
pub mod pipeline;
pub mod types;

pub use aggregator::{merge, MultiImageAggregator};
pub use context::{load_catalog, PipelineContext};
pub use index::EmbeddingIndex;
pub use pipeline::{analyze_submission, process_submission};
pub use types::*;
