//! TextExtractor: one screenshot in, normalized text and confidence out.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::OcrEngine;
use promolens_core::{clamp_confidence, Error, RawOcrReading, Result};

pub struct TextExtractor {
    engine: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Recognize one image.
    ///
    /// Missing or unreadable files fail with `Error::EngineFailure` before
    /// the engine is invoked.
    pub fn extract(&self, image: &Path) -> Result<RawOcrReading> {
        let label = image.display().to_string();
        let meta = std::fs::metadata(image).map_err(|e| {
            warn!("Image unavailable {}: {}", label, e);
            Error::engine(label.clone(), e.to_string())
        })?;
        if !meta.is_file() {
            return Err(Error::engine(label, "not a regular file"));
        }
        std::fs::File::open(image).map_err(|e| Error::engine(label.clone(), e.to_string()))?;

        let output = self.engine.recognize(image)?;
        let text = normalize_text(&output.text);
        let confidence = clamp_confidence(output.confidence);
        debug!(
            "{} recognized {} chars in {} (conf={:.1})",
            self.engine.name(),
            text.chars().count(),
            label,
            confidence
        );

        Ok(RawOcrReading {
            image_path: image.to_path_buf(),
            text,
            confidence,
        })
    }
}

/// Unify line endings, strip trailing whitespace, collapse blank-line runs.
pub fn normalize_text(raw: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut blank_run = false;
    for line in raw.split('\n') {
        let line = line.trim_end_matches('\r').trim_end();
        if line.trim().is_empty() {
            if !blank_run && !out.is_empty() {
                out.push("");
            }
            blank_run = true;
            continue;
        }
        blank_run = false;
        out.push(line);
    }
    while out.last() == Some(&"") {
        out.pop();
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineOutput;
    use tempfile::TempDir;

    struct FixedEngine(f64);

    impl OcrEngine for FixedEngine {
        fn recognize(&self, _image: &Path) -> Result<EngineOutput> {
            Ok(EngineOutput {
                text: "活动名称：春季特惠  \r\n\r\n\r\n满300减50\r\n".into(),
                confidence: self.0,
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_missing_file_is_engine_failure() {
        let extractor = TextExtractor::new(Arc::new(FixedEngine(90.0)));
        let err = extractor.extract(Path::new("/nonexistent/shot.png")).unwrap_err();
        assert!(matches!(err, Error::EngineFailure { .. }));
    }

    #[test]
    fn test_directory_is_engine_failure() {
        let dir = TempDir::new().unwrap();
        let extractor = TextExtractor::new(Arc::new(FixedEngine(90.0)));
        assert!(extractor.extract(dir.path()).is_err());
    }

    #[test]
    fn test_normalizes_and_clamps() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"png").unwrap();

        let extractor = TextExtractor::new(Arc::new(FixedEngine(140.0)));
        let reading = extractor.extract(&image).unwrap();
        assert_eq!(reading.text, "活动名称：春季特惠\n\n满300减50");
        assert_eq!(reading.confidence, 100.0);
        assert_eq!(reading.image_path, image);
    }

    #[test]
    fn test_normalize_text_leading_blank_lines() {
        assert_eq!(normalize_text("\n\n  \nfoo\n"), "foo");
        assert_eq!(normalize_text(""), "");
    }
}
