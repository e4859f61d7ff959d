//! Multi-image aggregation.
//!
//! Each image is recognized, classified and mined for fields on the
//! blocking pool; the merge waits for every image to settle and then fuses
//! the successful ones:
//!
//! - text: successful texts joined by newlines, in input order
//! - confidence: mean OCR confidence
//! - platform: confidence-weighted vote over known detections
//! - fields: the first image seeds them; a later image writes a field only
//!   if it is confident enough (strictly above `override_gate * mean`) and
//!   supplies a non-empty value

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::types::{Aggregation, ImageAnalysis, ImageOutcome, SkippedImage};
use promolens_core::{
    ActivityTag, Error, ExtractedFields, MergeConfig, MergedOcrResult,
    PlatformMatch, Result,
};
use promolens_extract::fields::infer_status;
use promolens_extract::{FieldExtractor, PlatformClassifier};
use promolens_ocr::TextExtractor;

/// Recognize, classify and extract one image. Never panics on bad input;
/// every failure comes back as `ImageOutcome::Failed`.
pub fn analyze_image(
    text_extractor: &TextExtractor,
    classifier: &PlatformClassifier,
    field_extractor: &FieldExtractor,
    image: &Path,
    today: NaiveDate,
) -> ImageOutcome {
    let reading = match text_extractor.extract(image) {
        Ok(reading) => reading,
        Err(error) => {
            warn!("Skipping {}: {}", image.display(), error);
            return ImageOutcome::Failed {
                image_path: image.to_path_buf(),
                error,
            };
        }
    };

    let platform = classifier.classify(&reading.text);
    let mut fields = field_extractor.extract_at(&reading.text, today);
    if fields.platform.is_none() && platform.is_known() {
        fields.platform = Some(platform.name.clone());
    }
    debug!(
        "{}: platform={} ({:.1}%), ocr conf={:.1}",
        image.display(),
        platform.code,
        platform.confidence,
        reading.confidence
    );

    ImageOutcome::Succeeded(ImageAnalysis {
        reading,
        platform,
        fields,
    })
}

pub struct MultiImageAggregator {
    text_extractor: Arc<TextExtractor>,
    classifier: Arc<PlatformClassifier>,
    field_extractor: FieldExtractor,
    merge: MergeConfig,
    today: Option<NaiveDate>,
}

impl MultiImageAggregator {
    pub fn new(
        text_extractor: Arc<TextExtractor>,
        classifier: Arc<PlatformClassifier>,
        field_extractor: FieldExtractor,
        merge: MergeConfig,
    ) -> Self {
        Self {
            text_extractor,
            classifier,
            field_extractor,
            merge,
            today: None,
        }
    }

    /// Pin the reference day used for status inference.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Analyze every image concurrently. Outcomes keep input order.
    pub async fn analyze_all(&self, image_paths: &[PathBuf]) -> Vec<ImageOutcome> {
        let today = self.today();
        let tasks = image_paths.iter().map(|path| {
            let text_extractor = Arc::clone(&self.text_extractor);
            let classifier = Arc::clone(&self.classifier);
            let field_extractor = self.field_extractor;
            let path = path.clone();
            async move {
                let task_path = path.clone();
                tokio::task::spawn_blocking(move || {
                    analyze_image(
                        &text_extractor,
                        &classifier,
                        &field_extractor,
                        &task_path,
                        today,
                    )
                })
                .await
                .unwrap_or_else(|e| ImageOutcome::Failed {
                    image_path: path,
                    error: Error::Internal(format!("image task failed: {}", e)),
                })
            }
        });
        join_all(tasks).await
    }

    pub async fn aggregate(&self, image_paths: &[PathBuf]) -> Result<MergedOcrResult> {
        self.aggregate_detailed(image_paths).await.map(|a| a.merged)
    }

    /// Like `aggregate`, also reporting which images were skipped and why.
    pub async fn aggregate_detailed(&self, image_paths: &[PathBuf]) -> Result<Aggregation> {
        if image_paths.is_empty() {
            return Err(Error::AggregationFailure("no images supplied".into()));
        }

        let outcomes = self.analyze_all(image_paths).await;
        let mut analyses = Vec::with_capacity(outcomes.len());
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                ImageOutcome::Succeeded(analysis) => analyses.push(analysis),
                ImageOutcome::Failed { image_path, error } => skipped.push(SkippedImage {
                    image_path,
                    reason: error.to_string(),
                }),
            }
        }

        if analyses.is_empty() {
            let reasons: Vec<String> = skipped
                .iter()
                .map(|s| format!("{}: {}", s.image_path.display(), s.reason))
                .collect();
            return Err(Error::AggregationFailure(format!(
                "all {} images failed ({})",
                image_paths.len(),
                reasons.join("; ")
            )));
        }

        let merged = merge(&analyses, &self.merge, self.today())?;
        info!(
            "Aggregated {}/{} images: platform={}, confidence={:.1}",
            analyses.len(),
            image_paths.len(),
            merged
                .detected_platform
                .as_ref()
                .map(|p| p.code.as_str())
                .unwrap_or("none"),
            merged.confidence
        );
        Ok(Aggregation { merged, skipped })
    }
}

/// Fuse per-image analyses into one record.
pub fn merge(
    analyses: &[ImageAnalysis],
    config: &MergeConfig,
    today: NaiveDate,
) -> Result<MergedOcrResult> {
    if analyses.is_empty() {
        return Err(Error::AggregationFailure("no successful image to merge".into()));
    }

    // Every successful image contributes its text, even when it is empty.
    let text = analyses
        .iter()
        .map(|a| a.reading.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let confidence =
        analyses.iter().map(|a| a.reading.confidence).sum::<f64>() / analyses.len() as f64;

    // The first image seeds every field; later images write only through the gate.
    let threshold = config.override_gate * confidence;
    let mut fields = analyses[0].fields.clone();
    for analysis in &analyses[1..] {
        if analysis.reading.confidence > threshold {
            override_fields(&mut fields, &analysis.fields);
        } else {
            debug!(
                "{}: conf {:.1} not above {:.1}, fields ignored",
                analysis.reading.image_path.display(),
                analysis.reading.confidence,
                threshold
            );
        }
    }

    if !fields.status.is_some_and(|s| s.is_determined())
        && (fields.start_date.is_some() || fields.end_date.is_some())
    {
        fields.status = Some(infer_status(fields.start_date, fields.end_date, today));
    }

    Ok(MergedOcrResult {
        text,
        confidence,
        detected_platform: vote_platform(analyses),
        extracted_data: fields,
    })
}

fn override_fields(merged: &mut ExtractedFields, incoming: &ExtractedFields) {
    let text_empty = |s: &String| s.trim().is_empty();
    override_slot(&mut merged.activity_name, &incoming.activity_name, text_empty);
    override_slot(&mut merged.description, &incoming.description, text_empty);
    override_slot(&mut merged.start_date, &incoming.start_date, |_| false);
    override_slot(&mut merged.end_date, &incoming.end_date, |_| false);
    override_slot(&mut merged.discount, &incoming.discount, text_empty);
    override_slot(&mut merged.commission_rate, &incoming.commission_rate, text_empty);
    override_slot(&mut merged.status, &incoming.status, |s| !s.is_determined());
    override_slot(&mut merged.tag, &incoming.tag, |t| *t == ActivityTag::Other);
    override_slot(&mut merged.platform, &incoming.platform, text_empty);
}

/// Empty values and sentinels never overwrite anything.
fn override_slot<T: Clone>(
    slot: &mut Option<T>,
    incoming: &Option<T>,
    is_empty: impl Fn(&T) -> bool,
) {
    if let Some(value) = incoming {
        if !is_empty(value) {
            *slot = Some(value.clone());
        }
    }
}

struct Tally<'a> {
    winner: &'a PlatformMatch,
    weight: f64,
    confidence_sum: f64,
    votes: usize,
}

impl Tally<'_> {
    fn mean_confidence(&self) -> f64 {
        self.confidence_sum / self.votes as f64
    }
}

/// Each known detection votes with weight `1 + confidence / 100`. Ties go
/// to the higher mean confidence, then to the platform seen first.
fn vote_platform(analyses: &[ImageAnalysis]) -> Option<PlatformMatch> {
    let mut tallies: Vec<Tally<'_>> = Vec::new();
    for analysis in analyses.iter().filter(|a| a.platform.is_known()) {
        let p = &analysis.platform;
        match tallies.iter_mut().find(|t| t.winner.code == p.code) {
            Some(t) => {
                t.weight += 1.0 + p.confidence / 100.0;
                t.confidence_sum += p.confidence;
                t.votes += 1;
            }
            None => tallies.push(Tally {
                winner: p,
                weight: 1.0 + p.confidence / 100.0,
                confidence_sum: p.confidence,
                votes: 1,
            }),
        }
    }

    let mut best: Option<&Tally<'_>> = None;
    for tally in &tallies {
        let better = match best {
            None => true,
            Some(b) => {
                tally.weight > b.weight
                    || (tally.weight == b.weight && tally.mean_confidence() > b.mean_confidence())
            }
        };
        if better {
            best = Some(tally);
        }
    }

    best.map(|t| PlatformMatch {
        name: t.winner.name.clone(),
        code: t.winner.code.clone(),
        confidence: t.mean_confidence(),
    })
}
