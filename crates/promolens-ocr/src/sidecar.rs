//! Sidecar engine. Picks up recognition results produced outside this process.
//!
//! For an image `shots/list.png` it looks for, in order:
//! - `shots/list.png.ocr.json`: `{"text": "...", "confidence": 87.5}`
//! - `shots/list.png.txt`: plain text, scored with the configured default confidence

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::engine::{EngineOutput, OcrEngine};
use promolens_core::{Error, Result};

#[derive(Deserialize)]
struct SidecarReading {
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct SidecarEngine {
    default_confidence: f64,
}

impl SidecarEngine {
    pub fn new(default_confidence: f64) -> Self {
        Self { default_confidence }
    }

    pub fn json_path(image: &Path) -> PathBuf {
        with_suffix(image, ".ocr.json")
    }

    pub fn text_path(image: &Path) -> PathBuf {
        with_suffix(image, ".txt")
    }
}

fn with_suffix(image: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = image.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

impl OcrEngine for SidecarEngine {
    fn recognize(&self, image: &Path) -> Result<EngineOutput> {
        let json_path = Self::json_path(image);
        if json_path.is_file() {
            let raw = std::fs::read_to_string(&json_path)
                .map_err(|e| Error::engine(image.display().to_string(), e.to_string()))?;
            let reading: SidecarReading = serde_json::from_str(&raw).map_err(|e| {
                Error::engine(
                    image.display().to_string(),
                    format!("malformed sidecar {}: {}", json_path.display(), e),
                )
            })?;
            debug!("Sidecar reading for {} from {}", image.display(), json_path.display());
            return Ok(EngineOutput {
                text: reading.text,
                confidence: reading.confidence.unwrap_or(self.default_confidence),
            });
        }

        let text_path = Self::text_path(image);
        if text_path.is_file() {
            let text = std::fs::read_to_string(&text_path)
                .map_err(|e| Error::engine(image.display().to_string(), e.to_string()))?;
            return Ok(EngineOutput {
                text,
                confidence: self.default_confidence,
            });
        }

        Err(Error::engine(
            image.display().to_string(),
            "no recognition sidecar found",
        ))
    }

    fn name(&self) -> &'static str {
        "sidecar"
    }
}
