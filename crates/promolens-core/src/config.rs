//! Configuration and data directory management.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Paths to all PromoLens data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Vector index directory (`data/vectordb/`).
    pub vectordb: PathBuf,
    /// Embedding model directory (`data/models/`).
    pub models: PathBuf,
    /// Platform catalog override (`data/catalog.json`).
    pub catalog_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let paths = Self::resolve(root);
        paths.ensure_dirs()?;
        Ok(paths)
    }

    /// Compute the paths without touching the filesystem.
    pub fn resolve(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            vectordb: root.join("vectordb"),
            models: root.join("models"),
            catalog_file: root.join("catalog.json"),
            root,
        }
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.vectordb)?;
        std::fs::create_dir_all(&self.models)?;
        Ok(())
    }
}

/// Weights and threshold used by the platform classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Score for a keyword found as a whole word.
    pub whole_word_weight: f64,
    /// Score for a keyword found only as a substring.
    pub substring_weight: f64,
    /// Score for a cataloged domain string.
    pub domain_weight: f64,
    /// Score for a UI element phrase.
    pub ui_element_weight: f64,
    /// Fixed bonus for a verbatim URL containing a cataloged domain.
    pub url_bonus: f64,
    /// Minimum confidence (percent) below which the result is "unknown".
    pub min_confidence: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            whole_word_weight: 2.0,
            substring_weight: 1.0,
            domain_weight: 3.0,
            ui_element_weight: 1.5,
            url_bonus: 5.0,
            min_confidence: 10.0,
        }
    }
}

/// Multi-image merge rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MergeConfig {
    /// A later image overrides a field only if its OCR confidence is
    /// strictly greater than `override_gate * mean confidence`.
    pub override_gate: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { override_gate: 0.8 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    /// Tesseract language string.
    pub languages: String,
    /// Optional tessdata directory; Tesseract's default lookup when unset.
    pub tessdata_dir: Option<PathBuf>,
    /// Confidence assigned to plain-text sidecar readings.
    pub sidecar_confidence: f64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: "chi_sim+eng".into(),
            tessdata_dir: None,
            sidecar_confidence: 85.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Vector dimension of the whole index. The fallback embedder uses
    /// this many buckets; a model with a different output size is rejected.
    pub dimension: usize,
    /// Model directory override. Defaults to `<data_dir>/models`.
    pub model_dir: Option<PathBuf>,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimension: 384,
            model_dir: None,
            cache_size: 1000,
            cache_ttl_secs: 3600,
        }
    }
}

/// Top-level PromoLens configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromoLensConfig {
    pub data_dir: PathBuf,
    /// Catalog file override. Falls back to `<data_dir>/catalog.json`, then
    /// to the built-in catalog.
    pub catalog_path: Option<PathBuf>,
    pub classifier: ClassifierConfig,
    pub merge: MergeConfig,
    pub ocr: OcrConfig,
    pub embedding: EmbeddingConfig,
    /// Path to config file for saving.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for PromoLensConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            catalog_path: None,
            classifier: ClassifierConfig::default(),
            merge: MergeConfig::default(),
            ocr: OcrConfig::default(),
            embedding: EmbeddingConfig::default(),
            config_path: None,
        }
    }
}

impl PromoLensConfig {
    /// Load config from file, falling back to defaults, then apply env overrides.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path)?;
                let parsed: PromoLensConfig = serde_json::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
                info!("Loaded config from {}", path.display());
                parsed
            }
            Some(path) => {
                warn!("Config file {} not found, using defaults", path.display());
                PromoLensConfig::default()
            }
            None => PromoLensConfig::default(),
        };
        config.config_path = config_path.map(Path::to_path_buf);
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("PROMOLENS_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("PROMOLENS_MODEL_DIR") {
            self.embedding.model_dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("TESSDATA_PREFIX") {
            if self.ocr.tessdata_dir.is_none() {
                self.ocr.tessdata_dir = Some(PathBuf::from(dir));
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(Error::Config("embedding.dimension must be > 0".into()));
        }
        if !(0.0..=100.0).contains(&self.classifier.min_confidence) {
            return Err(Error::Config(
                "classifier.min_confidence must be within 0..=100".into(),
            ));
        }
        if self.merge.override_gate < 0.0 {
            return Err(Error::Config("merge.override_gate must be >= 0".into()));
        }
        Ok(())
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        let path = self
            .config_path
            .as_ref()
            .ok_or_else(|| Error::Config("no config path to save to".into()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths::resolve(&self.data_dir)
    }

    pub fn model_dir(&self) -> PathBuf {
        self.embedding
            .model_dir
            .clone()
            .unwrap_or_else(|| self.data_paths().models)
    }

    pub fn catalog_file(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| self.data_paths().catalog_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = PromoLensConfig::default();
        assert_eq!(cfg.classifier.domain_weight, 3.0);
        assert_eq!(cfg.classifier.url_bonus, 5.0);
        assert_eq!(cfg.classifier.min_confidence, 10.0);
        assert_eq!(cfg.merge.override_gate, 0.8);
        assert_eq!(cfg.embedding.dimension, 384);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("promolens.json");
        std::fs::write(&path, r#"{"merge": {"override_gate": 0.5}, "embedding": {"dimension": 256}}"#)
            .unwrap();

        let cfg = PromoLensConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.merge.override_gate, 0.5);
        assert_eq!(cfg.embedding.dimension, 256);
        assert_eq!(cfg.embedding.cache_size, 1000);
        assert_eq!(cfg.classifier.whole_word_weight, 2.0);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            PromoLensConfig::load(Some(&path)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut cfg = PromoLensConfig::default();
        cfg.embedding.dimension = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/promolens.json");
        let mut cfg = PromoLensConfig::default();
        cfg.config_path = Some(path.clone());
        cfg.classifier.url_bonus = 7.0;
        cfg.save().unwrap();

        let loaded = PromoLensConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded.classifier.url_bonus, 7.0);
    }

    #[test]
    fn test_data_paths() {
        let dir = TempDir::new().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        assert!(paths.vectordb.is_dir());
        assert!(paths.models.is_dir());
        assert_eq!(paths.catalog_file, dir.path().join("catalog.json"));
    }
}
