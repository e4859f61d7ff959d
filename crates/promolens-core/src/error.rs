//! Error types for PromoLens.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A single image could not be recognized. Recoverable: the image is skipped.
    #[error("OCR engine failure on {image}: {reason}")]
    EngineFailure { image: String, reason: String },

    /// Every image of a submission failed.
    #[error("Aggregation failed: {0}")]
    AggregationFailure(String),

    /// Embedding model error. Callers recover through the fallback embedder.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Writing to the vector store failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn engine(image: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::EngineFailure {
            image: image.into(),
            reason: reason.into(),
        }
    }

    /// Whether a pipeline may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::EngineFailure { .. } | Error::Embedding(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_failure_message() {
        let err = Error::engine("shots/a.png", "file not found");
        assert_eq!(
            err.to_string(),
            "OCR engine failure on shots/a.png: file not found"
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_aggregation_failure_is_fatal() {
        let err = Error::AggregationFailure("all 3 images failed".into());
        assert!(!err.is_recoverable());
        assert!(!Error::Persistence("disk full".into()).is_recoverable());
    }
}
