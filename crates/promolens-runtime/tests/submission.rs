//! End-to-end submissions driven by sidecar recognition files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use promolens_core::{
    ActivityStatus, ActivityTag, EmbeddingConfig, EmbeddingSource, Error, PromoLensConfig,
};
use promolens_extract::PlatformCatalog;
use promolens_infer::Embedder;
use promolens_ocr::SidecarEngine;
use promolens_runtime::{analyze_submission, process_submission, PipelineContext};
use promolens_store::VectorStore;

const DIM: usize = 64;

fn context(dir: &TempDir) -> PipelineContext {
    let mut config = PromoLensConfig {
        data_dir: dir.path().join("data"),
        ..Default::default()
    };
    config.embedding = EmbeddingConfig {
        dimension: DIM,
        ..Default::default()
    };
    let embedder = Arc::new(Embedder::fallback_only(&config.embedding));
    let store = VectorStore::open(config.data_paths().vectordb, DIM).unwrap();
    PipelineContext::from_parts(
        config,
        PlatformCatalog::builtin(),
        Arc::new(SidecarEngine::new(85.0)),
        embedder,
        store,
    )
    .unwrap()
    .with_today(NaiveDate::from_ymd_opt(2024, 7, 15).unwrap())
}

/// A placeholder image plus its recognition sidecar.
fn screenshot(dir: &Path, name: &str, text: &str, confidence: f64) -> PathBuf {
    let image = bare_image(dir, name);
    let sidecar = serde_json::json!({ "text": text, "confidence": confidence });
    std::fs::write(SidecarEngine::json_path(&image), sidecar.to_string()).unwrap();
    image
}

/// An image with no recognition available.
fn bare_image(dir: &Path, name: &str) -> PathBuf {
    let image = dir.join(name);
    std::fs::write(&image, b"\x89PNG\r\n\x1a\n").unwrap();
    image
}

const DETAIL_PAGE: &str = "携程 eBooking\n\
                           https://ebooking.ctrip.com/promotion\n\
                           活动名称：暑期特惠大促\n\
                           开始时间：2024-07-01\n\
                           结束时间：2024-08-31";

const TERMS_PAGE: &str = "携程 商家后台\n折扣：8.5折\n佣金比例：12%";

#[tokio::test]
async fn test_submission_merges_and_stores() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let images = vec![
        screenshot(dir.path(), "detail.png", DETAIL_PAGE, 92.0),
        screenshot(dir.path(), "terms.png", TERMS_PAGE, 60.0),
        bare_image(dir.path(), "blurry.png"),
    ];

    let outcome = process_submission(&ctx, "hotel-42", &images).await.unwrap();

    let merged = &outcome.merged;
    assert_eq!(merged.text, format!("{}\n{}", DETAIL_PAGE, TERMS_PAGE));
    assert_eq!(merged.confidence, 76.0);
    let platform = merged.detected_platform.as_ref().unwrap();
    assert_eq!(platform.code, "ctrip");

    let fields = &merged.extracted_data;
    // The terms page is below the override gate (60 < 0.8 * 76), so none of
    // its fields reach the merge, not even the ones the detail page lacks.
    assert_eq!(fields.activity_name.as_deref(), Some("暑期特惠大促"));
    assert_eq!(fields.start_date, NaiveDate::from_ymd_opt(2024, 7, 1));
    assert_eq!(fields.end_date, NaiveDate::from_ymd_opt(2024, 8, 31));
    assert!(fields.discount.is_none());
    assert!(fields.commission_rate.is_none());
    assert_eq!(fields.status, Some(ActivityStatus::Active));
    assert_eq!(fields.tag, Some(ActivityTag::Promotional));
    assert_eq!(fields.platform.as_deref(), Some("携程"));

    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].image_path, images[2]);

    let record = outcome.record.unwrap();
    assert_eq!(record.dimension(), DIM);
    assert_eq!(record.metadata.platform_id, "hotel-42");
    assert_eq!(record.metadata.embedding_source, EmbeddingSource::Fallback);
    assert_eq!(record.metadata.image_paths.len(), 3);
    assert_eq!(record.metadata.extracted_data, *fields);

    let stored = ctx.index().get(&record.id).unwrap().unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_confident_terms_page_fills_gaps() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let images = vec![
        screenshot(dir.path(), "detail.png", DETAIL_PAGE, 90.0),
        screenshot(dir.path(), "terms.png", TERMS_PAGE, 88.0),
    ];

    let aggregation = analyze_submission(&ctx, &images).await.unwrap();
    let fields = &aggregation.merged.extracted_data;
    assert_eq!(fields.discount.as_deref(), Some("15%"));
    assert_eq!(fields.commission_rate.as_deref(), Some("12%"));
    assert_eq!(fields.start_date, NaiveDate::from_ymd_opt(2024, 7, 1));
    assert_eq!(fields.status, Some(ActivityStatus::Active));
}

#[tokio::test]
async fn test_failed_image_does_not_change_result() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let good = screenshot(dir.path(), "detail.png", DETAIL_PAGE, 92.0);
    let bad = bare_image(dir.path(), "missing-sidecar.png");

    let alone = analyze_submission(&ctx, &[good.clone()]).await.unwrap();
    let with_failure = analyze_submission(&ctx, &[bad, good]).await.unwrap();

    assert_eq!(with_failure.merged, alone.merged);
    assert_eq!(with_failure.skipped.len(), 1);
    assert!(alone.skipped.is_empty());
}

#[tokio::test]
async fn test_all_images_failing_is_fatal() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let images = vec![
        bare_image(dir.path(), "a.png"),
        dir.path().join("does-not-exist.png"),
    ];

    let err = process_submission(&ctx, "hotel-42", &images).await.unwrap_err();
    assert!(matches!(err, Error::AggregationFailure(_)));
    assert_eq!(ctx.index().count().unwrap(), 0);

    let err = process_submission(&ctx, "hotel-42", &[]).await.unwrap_err();
    assert!(matches!(err, Error::AggregationFailure(_)));
}

#[tokio::test]
async fn test_ctrip_screenshots_vote() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let texts = [
        "携程 eBooking\nhttps://ebooking.ctrip.com/promotion\n活动名称：早鸟特惠",
        "ebooking.ctrip.com 房型促销\n活动名称：连住优惠",
        "携程 商家后台\n早鸟特惠 立减20元",
    ];

    let classifier = ctx.classifier();
    let scores: Vec<_> = texts.iter().map(|t| classifier.classify(t)).collect();
    assert!(scores.iter().all(|m| m.code == "ctrip"));
    assert!(scores[0].confidence > scores[2].confidence);
    assert!(scores[1].confidence > scores[2].confidence);

    let images: Vec<_> = texts
        .iter()
        .enumerate()
        .map(|(i, t)| screenshot(dir.path(), &format!("{}.png", i), t, 80.0))
        .collect();
    let aggregation = analyze_submission(&ctx, &images).await.unwrap();
    let platform = aggregation.merged.detected_platform.unwrap();
    assert_eq!(platform.code, "ctrip");
    assert_eq!(platform.name, "携程");
}

#[tokio::test]
async fn test_similarity_is_reproducible() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);

    let summer = screenshot(dir.path(), "summer.png", DETAIL_PAGE, 92.0);
    let member = screenshot(
        dir.path(),
        "member.png",
        "美团商家\n活动名称：会员专享价\n会员积分翻倍，连住三晚享专属折扣",
        88.0,
    );
    process_submission(&ctx, "hotel-42", &[summer])
        .await
        .unwrap()
        .record
        .unwrap();
    process_submission(&ctx, "hotel-7", &[member])
        .await
        .unwrap()
        .record
        .unwrap();

    let first = ctx.index().find_similar("暑期特惠大促", 5).await.unwrap();
    let second = ctx.index().find_similar("暑期特惠大促", 5).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].record.metadata.platform_id, "hotel-42");
    assert!(first[0].similarity >= first[1].similarity);
    let ids = |r: &[promolens_store::SimilarRecord]| {
        r.iter()
            .map(|s| (s.record.id.clone(), s.similarity))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));

    let scoped = ctx
        .index()
        .find_similar_for_platform("hotel-7", "暑期特惠大促", 5)
        .await
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].record.metadata.platform_id, "hotel-7");
}

#[tokio::test]
async fn test_catalog_reload() {
    let dir = TempDir::new().unwrap();
    let ctx = context(&dir);
    let before = ctx.classifier();
    assert_eq!(ctx.catalog().len(), 8);

    let bad = dir.path().join("broken.json");
    std::fs::write(&bad, "{not json").unwrap();
    assert!(ctx.reload_catalog(&bad).is_err());
    assert_eq!(ctx.catalog().len(), 8);

    let good = dir.path().join("catalog.json");
    std::fs::write(
        &good,
        r#"{"platforms": [{
            "name": "Acme Stays",
            "code": "acme",
            "keywords": ["acme"],
            "domains": ["partners.acme.example"],
            "uiElements": ["Acme Deals"]
        }]}"#,
    )
    .unwrap();
    assert_eq!(ctx.reload_catalog(&good).unwrap(), 1);
    assert_eq!(ctx.catalog().len(), 1);
    assert_eq!(ctx.classifier().classify("acme portal").code, "acme");

    // Snapshots taken before the reload keep the old catalog.
    assert_eq!(before.catalog().len(), 8);
    assert_eq!(before.classify("携程 eBooking").code, "ctrip");
}
