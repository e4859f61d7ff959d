//! PromoLens OCR: turns screenshots into raw text plus engine confidence.
//!
//! When the `tesseract` feature is enabled and Tesseract initialises,
//! `TesseractEngine` reads the pixels directly. Otherwise `SidecarEngine`
//! picks up text recognized upstream from files stored next to each image.

pub mod engine;
pub mod extractor;
pub mod sidecar;
pub mod tesseract;

pub use engine::{EngineOutput, OcrEngine};
pub use extractor::{normalize_text, TextExtractor};
pub use sidecar::SidecarEngine;

#[cfg(feature = "tesseract")]
pub use tesseract::TesseractEngine;

use std::sync::Arc;

use promolens_core::OcrConfig;

/// Create the best available OCR engine for the given configuration.
///
/// Tries Tesseract first (if feature enabled and it initialises),
/// falls back to SidecarEngine.
pub fn create_engine(config: &OcrConfig) -> Arc<dyn OcrEngine> {
    #[cfg(feature = "tesseract")]
    {
        match TesseractEngine::load(config) {
            Ok(engine) => return Arc::new(engine),
            Err(e) => {
                tracing::warn!("Tesseract unavailable: {}. Falling back to sidecar readings.", e);
            }
        }
    }

    #[cfg(not(feature = "tesseract"))]
    {
        tracing::info!("Tesseract feature disabled. Using sidecar readings.");
    }

    Arc::new(SidecarEngine::new(config.sidecar_confidence))
}
