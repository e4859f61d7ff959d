//! Record types shared across the pipeline.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name and code reported when no platform signature clears the threshold.
pub const UNKNOWN_PLATFORM: &str = "unknown";

/// Raw recognition output for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOcrReading {
    pub image_path: PathBuf,
    pub text: String,
    /// Engine confidence, 0..=100.
    pub confidence: f64,
}

/// Best platform guess for a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMatch {
    pub name: String,
    pub code: String,
    /// 0..=100.
    pub confidence: f64,
}

impl PlatformMatch {
    pub fn unknown() -> Self {
        Self {
            name: UNKNOWN_PLATFORM.to_string(),
            code: UNKNOWN_PLATFORM.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_known(&self) -> bool {
        self.code != UNKNOWN_PLATFORM
    }
}

/// Lifecycle state of a promotion activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Upcoming,
    Ended,
    /// Neither a status keyword nor usable dates were found.
    Undetermined,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Active => "active",
            ActivityStatus::Upcoming => "upcoming",
            ActivityStatus::Ended => "ended",
            ActivityStatus::Undetermined => "undetermined",
        }
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, ActivityStatus::Undetermined)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Themed category of a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTag {
    FlashSale,
    Holiday,
    Promotional,
    Seasonal,
    NewArrival,
    Membership,
    Bestseller,
    Other,
}

impl ActivityTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityTag::FlashSale => "flash_sale",
            ActivityTag::Holiday => "holiday",
            ActivityTag::Promotional => "promotional",
            ActivityTag::Seasonal => "seasonal",
            ActivityTag::NewArrival => "new_arrival",
            ActivityTag::Membership => "membership",
            ActivityTag::Bestseller => "bestseller",
            ActivityTag::Other => "other",
        }
    }
}

impl fmt::Display for ActivityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured fields pulled out of recognized text.
///
/// Every field is optional; `None` means "not detected".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ActivityStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<ActivityTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        *self == ExtractedFields::default()
    }
}

/// Fused result of one multi-image submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedOcrResult {
    pub text: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_platform: Option<PlatformMatch>,
    pub extracted_data: ExtractedFields,
}

impl MergedOcrResult {
    /// Text fed to the embedder: activity name, description, then raw text.
    pub fn embedding_text(&self) -> String {
        let data = &self.extracted_data;
        [
            data.activity_name.as_deref(),
            data.description.as_deref(),
            Some(self.text.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
    }
}

/// Which path produced an embedding vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSource {
    Model,
    Fallback,
}

impl EmbeddingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingSource::Model => "model",
            EmbeddingSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for EmbeddingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp a confidence value into 0..=100, mapping NaN to 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
