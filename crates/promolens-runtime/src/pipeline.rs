//! Submission pipeline: images → merged result → index record.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::types::{Aggregation, SubmissionOutcome};
use promolens_core::Result;

/// Aggregate the images without touching the index.
pub async fn analyze_submission(
    ctx: &PipelineContext,
    image_paths: &[PathBuf],
) -> Result<Aggregation> {
    ctx.aggregator().aggregate_detailed(image_paths).await
}

/// Aggregate the images of one submission and store the result.
///
/// Fails only when aggregation fails. A store error is reported in
/// `SubmissionOutcome::record` alongside the merged result.
pub async fn process_submission(
    ctx: &PipelineContext,
    platform_id: &str,
    image_paths: &[PathBuf],
) -> Result<SubmissionOutcome> {
    info!(
        "Processing submission for {} ({} images)",
        platform_id,
        image_paths.len()
    );
    let Aggregation { merged, skipped } = analyze_submission(ctx, image_paths).await?;

    let record = ctx.index().store(&merged, platform_id, image_paths).await;
    if let Err(e) = &record {
        warn!("Merged result for {} not stored: {}", platform_id, e);
    }

    Ok(SubmissionOutcome {
        merged,
        skipped,
        record,
    })
}
