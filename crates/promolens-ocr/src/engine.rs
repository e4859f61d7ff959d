//! Recognition engine trait.
//!
//! Implementations:
//! - `TesseractEngine`: local Tesseract through leptess (requires the `tesseract` feature)
//! - `SidecarEngine`: reads text recognized upstream from files stored next to the image

use std::path::Path;

use promolens_core::Result;

/// What an engine returns for one image, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub text: String,
    /// Engine's own certainty. Not yet clamped.
    pub confidence: f64,
}

/// Trait for OCR backends.
pub trait OcrEngine: Send + Sync {
    /// Recognize the text in one image.
    ///
    /// Errors are per-image `Error::EngineFailure`s.
    fn recognize(&self, image: &Path) -> Result<EngineOutput>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}
