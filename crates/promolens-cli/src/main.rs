//! PromoLens: turn promotion screenshots into structured, searchable records.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use promolens_core::{
    DataPaths, EmbeddingSource, ExtractedFields, MergedOcrResult, PlatformMatch, PromoLensConfig,
};
use promolens_extract::{FieldExtractor, PlatformClassifier};
use promolens_runtime::{
    analyze_submission, load_catalog, process_submission, PipelineContext, SkippedImage,
};
use promolens_store::SimilarRecord;

#[derive(Parser)]
#[command(name = "promolens", version, about = "Promotion screenshot OCR and indexing")]
struct Cli {
    /// Path to config JSON
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recognize a set of screenshots as one submission
    Scan {
        /// Platform or account identifier the screenshots belong to
        #[arg(long)]
        platform_id: String,
        /// Print the merged result without writing it to the index
        #[arg(long, default_value_t = false)]
        no_store: bool,
        /// Screenshot files, in submission order
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Find stored records similar to a query
    Similar {
        /// Restrict results to one platform id
        #[arg(long)]
        platform_id: Option<String>,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        query: String,
    },
    /// Classify the platform of a recognized text file and extract its fields
    Classify { file: PathBuf },
    /// Show index statistics
    Stats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding_source: Option<EmbeddingSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store_error: Option<String>,
    merged: MergedOcrResult,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skipped: Vec<SkippedImage>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyReport {
    platform: PlatformMatch,
    candidates: Vec<PlatformMatch>,
    fields: ExtractedFields,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PromoLensConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            platform_id,
            no_store,
            images,
        } => run_scan(config, &platform_id, &images, no_store).await,
        Commands::Similar {
            platform_id,
            limit,
            query,
        } => run_similar(config, platform_id.as_deref(), &query, limit).await,
        Commands::Classify { file } => run_classify(&config, &file),
        Commands::Stats => run_stats(config),
    }
}

fn build_context(config: PromoLensConfig) -> Result<PipelineContext> {
    DataPaths::new(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;
    let ctx = PipelineContext::build(config)?;
    ctx.warm_up();
    Ok(ctx)
}

async fn run_scan(
    config: PromoLensConfig,
    platform_id: &str,
    images: &[PathBuf],
    no_store: bool,
) -> Result<()> {
    let ctx = build_context(config)?;

    let report = if no_store {
        let aggregation = analyze_submission(&ctx, images).await?;
        ScanReport {
            record_id: None,
            embedding_source: None,
            store_error: None,
            merged: aggregation.merged,
            skipped: aggregation.skipped,
        }
    } else {
        let outcome = process_submission(&ctx, platform_id, images).await?;
        let (record_id, embedding_source, store_error) = match outcome.record {
            Ok(record) => (
                Some(record.id),
                Some(record.metadata.embedding_source),
                None,
            ),
            Err(e) => (None, None, Some(e.to_string())),
        };
        ScanReport {
            record_id,
            embedding_source,
            store_error,
            merged: outcome.merged,
            skipped: outcome.skipped,
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    if let Some(err) = report.store_error {
        bail!("merged result was not stored: {}", err);
    }
    Ok(())
}

async fn run_similar(
    config: PromoLensConfig,
    platform_id: Option<&str>,
    query: &str,
    limit: usize,
) -> Result<()> {
    let ctx = build_context(config)?;
    let results: Vec<SimilarRecord> = match platform_id {
        Some(pid) => {
            ctx.index()
                .find_similar_for_platform(pid, query, limit)
                .await?
        }
        None => ctx.index().find_similar(query, limit).await?,
    };
    info!("{} matches for {:?}", results.len(), query);
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

fn run_classify(config: &PromoLensConfig, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let catalog = Arc::new(load_catalog(&config.catalog_file()));
    let classifier = PlatformClassifier::new(catalog, config.classifier.clone())?;

    let report = ClassifyReport {
        platform: classifier.classify(&text),
        candidates: classifier.rank(&text).into_iter().take(3).collect(),
        fields: FieldExtractor::new().extract(&text),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_stats(config: PromoLensConfig) -> Result<()> {
    let ctx = PipelineContext::build(config)?;
    let stats = ctx.index().stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
