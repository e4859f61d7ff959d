//! PromoLens Core: error taxonomy, configuration and shared record types.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ClassifierConfig, DataPaths, EmbeddingConfig, MergeConfig, OcrConfig, PromoLensConfig,
};
pub use error::{Error, Result};
pub use types::*;
