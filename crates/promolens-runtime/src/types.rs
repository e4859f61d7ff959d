//! Runtime types.

use std::path::PathBuf;

use serde::Serialize;

use promolens_core::{Error, ExtractedFields, MergedOcrResult, PlatformMatch, RawOcrReading, Result};
use promolens_store::VectorRecord;

/// Everything learned from one image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAnalysis {
    pub reading: RawOcrReading,
    pub platform: PlatformMatch,
    pub fields: ExtractedFields,
}

/// Result of the per-image step. Failures carry the error instead of a
/// sentinel reading.
#[derive(Debug)]
pub enum ImageOutcome {
    Succeeded(ImageAnalysis),
    Failed { image_path: PathBuf, error: Error },
}

impl ImageOutcome {
    pub fn image_path(&self) -> &PathBuf {
        match self {
            ImageOutcome::Succeeded(analysis) => &analysis.reading.image_path,
            ImageOutcome::Failed { image_path, .. } => image_path,
        }
    }
}

/// An image left out of the merge, with the reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedImage {
    pub image_path: PathBuf,
    pub reason: String,
}

/// Merged result plus the images that did not contribute.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub merged: MergedOcrResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedImage>,
}

/// Outcome of a full submission.
///
/// Extraction and persistence are separate steps: a failed store leaves
/// `merged` intact and reports the error in `record`.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub merged: MergedOcrResult,
    pub skipped: Vec<SkippedImage>,
    pub record: Result<VectorRecord>,
}
