use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::PreprocessArgs;
use crate::common::{
    create_spinner, format_elapsed, setup_logging, timestamp_slug, PreprocessStats,
};
use crate::extract::read_raw_items;
use crate::preprocess::{
    Deduplicator, NormalizedRecord, Normalizer, PipelineRecord, TransformOutcome, Transformer,
};

/// Run the preprocess command with the given arguments
pub fn run_preprocess(args: PreprocessArgs) -> Result<PreprocessStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    info!("Starting CrossRef metadata preprocessing");
    info!("Input: {}", args.input_dir);

    let stats = preprocess_batch(&args)?;

    let total_time = start_time.elapsed();

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(total_time));
    info!("Raw items read: {}", stats.raw_items);
    info!("Records transformed: {}", stats.transformed_records);
    if stats.fell_back {
        info!("Transformation fell back to raw passthrough");
    }
    info!("Records normalized: {}", stats.normalized_records);
    info!("Records skipped: {}", stats.records_skipped);
    info!("Unique records: {}", stats.unique_records);
    info!("Output file: {}", stats.output_file);
    info!("========================================================");

    Ok(stats)
}

/// The in-memory preprocess stage: staged raw pages in, a deduplicated
/// normalized batch written to a processed file.
pub(crate) fn preprocess_batch(args: &PreprocessArgs) -> Result<PreprocessStats> {
    configure_thread_pool(args.threads);

    let raw_items = read_raw_items(Path::new(&args.input_dir))?;
    info!("Extracted {} raw items from staged pages", raw_items.len());

    let mut stats = PreprocessStats {
        raw_items: raw_items.len(),
        ..Default::default()
    };

    let spinner = create_spinner("Transforming batch...");

    let transformer = Transformer::new();
    let input_count = raw_items.len();
    let records: Vec<PipelineRecord> = match transformer.transform(raw_items) {
        TransformOutcome::Transformed(transformed) => {
            let summary = transformer.summary(input_count, transformed.len());
            info!(
                "Transformed {} of {} records",
                summary.output_records, summary.input_records
            );
            for category in summary.transformations_applied {
                debug!("  - {}", category);
            }
            stats.transformed_records = transformed.len();
            transformed.into_iter().map(PipelineRecord::Transformed).collect()
        }
        TransformOutcome::FellBack { reason, raw } => {
            warn!(
                "Batch transformation failed ({}); passing {} raw records through unmodified",
                reason,
                raw.len()
            );
            stats.fell_back = true;
            raw.into_iter().map(PipelineRecord::Raw).collect()
        }
    };

    spinner.set_message("Normalizing records...");

    let normalizer = Normalizer::new();
    let mut normalized: Vec<NormalizedRecord> = Vec::with_capacity(records.len());
    for record in &records {
        match normalizer.normalize(record) {
            Ok(normalized_record) => normalized.push(normalized_record),
            Err(e) => {
                error!("{}", e);
                error!("Data format may have changed. Please check the API response.");
                stats.records_skipped += 1;
            }
        }
    }
    info!("Normalized {} items.", normalized.len());
    stats.normalized_records = normalized.len();

    let mut deduplicator = Deduplicator::new();
    let unique = deduplicator.deduplicate(normalized);
    info!("Deduplicated data to {} items.", unique.len());
    stats.unique_records = unique.len();

    spinner.finish_with_message("Preprocessing complete");

    let output_path = resolve_output_path(args)?;
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create processed data directory: {}", parent.display())
        })?;
    }

    let json = serde_json::to_string_pretty(&unique).context("Failed to serialize batch")?;
    fs::write(&output_path, json)
        .with_context(|| format!("Failed to write processed file: {}", output_path.display()))?;
    info!("Saved processed data to {}", output_path.display());

    stats.output_file = output_path.to_string_lossy().to_string();
    Ok(stats)
}

fn resolve_output_path(args: &PreprocessArgs) -> Result<PathBuf> {
    match &args.output {
        Some(output) => Ok(PathBuf::from(output)),
        None => {
            let filename = format!("{}_data.json", timestamp_slug()?);
            Ok(Path::new(&args.processed_dir).join(filename))
        }
    }
}

fn configure_thread_pool(threads: usize) {
    let num_threads = if threads == 0 {
        let cores = num_cpus::get();
        info!("Auto-detected {} CPU cores. Using {} threads.", cores, cores);
        cores
    } else {
        info!("Using specified {} threads.", threads);
        threads
    };

    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        error!("Failed to build thread pool: {}. Using default.", e);
    }
}
