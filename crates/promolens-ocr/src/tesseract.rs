//! Tesseract OCR engine via leptess. Requires the `tesseract` feature.

#[cfg(feature = "tesseract")]
mod inner {
    use std::path::{Path, PathBuf};

    use leptess::LepTess;
    use tracing::{debug, info};

    use crate::engine::{EngineOutput, OcrEngine};
    use promolens_core::{Error, OcrConfig, Result};

    /// Tesseract-backed engine.
    ///
    /// A fresh `LepTess` handle is created per image so concurrent images
    /// never share engine state.
    pub struct TesseractEngine {
        tessdata: Option<PathBuf>,
        languages: String,
    }

    impl TesseractEngine {
        /// Check that Tesseract initialises with the configured languages.
        pub fn load(config: &OcrConfig) -> std::result::Result<Self, String> {
            let engine = Self {
                tessdata: config.tessdata_dir.clone(),
                languages: config.languages.clone(),
            };
            engine.handle().map_err(|e| e.to_string())?;
            info!(
                "Tesseract engine ready: languages={}, tessdata={:?}",
                engine.languages, engine.tessdata
            );
            Ok(engine)
        }

        fn handle(&self) -> Result<LepTess> {
            let data_path = self.tessdata.as_deref().and_then(Path::to_str);
            LepTess::new(data_path, &self.languages)
                .map_err(|e| Error::Config(format!("Tesseract init failed: {:?}", e)))
        }
    }

    impl OcrEngine for TesseractEngine {
        fn recognize(&self, image: &Path) -> Result<EngineOutput> {
            let label = image.display().to_string();
            let mut lt = self
                .handle()
                .map_err(|e| Error::engine(label.clone(), e.to_string()))?;
            lt.set_image(image)
                .map_err(|e| Error::engine(label.clone(), format!("cannot load image: {:?}", e)))?;
            let text = lt
                .get_utf8_text()
                .map_err(|e| Error::engine(label.clone(), format!("invalid UTF-8 output: {}", e)))?;
            let confidence = lt.mean_text_conf() as f64;
            debug!("Tesseract read {} chars from {} (conf={})", text.len(), label, confidence);
            Ok(EngineOutput { text, confidence })
        }

        fn name(&self) -> &'static str {
            "tesseract"
        }
    }
}

#[cfg(feature = "tesseract")]
pub use inner::TesseractEngine;
