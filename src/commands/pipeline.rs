use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use crate::cli::{PipelineArgs, PreprocessArgs};
use crate::commands::{fetch, load, preprocess};
use crate::common::{format_elapsed, setup_logging, Config};

/// Run the full pipeline: fetch -> preprocess -> load
pub fn run_pipeline(args: PipelineArgs) -> Result<()> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    let config = Config::from_env()?;
    let run_id = Uuid::new_v4().to_string()[..8].to_string();
    let processed_file: PathBuf =
        Path::new(&args.processed_dir).join(format!("works_{}.json", run_id));

    info!("Starting CrossRef metadata pipeline (run {})", run_id);
    info!("Endpoint: {}", config.api_endpoint);
    info!("Max pages: {}", args.max_pages);
    info!("Raw data directory: {}", args.raw_dir);
    info!("Processed batch file: {}", processed_file.display());
    if args.skip_load {
        info!("Database load will be skipped");
    }

    let rt = tokio::runtime::Runtime::new()?;

    info!("");
    info!("=== STEP 1/3: Fetching works from CrossRef ===");
    info!("");

    let fetch_stats = rt.block_on(fetch::fetch_and_stage(
        &config,
        args.max_pages,
        Path::new(&args.raw_dir),
    ))?;

    info!(
        "Fetch complete: {} items across {} pages",
        fetch_stats.items_fetched, fetch_stats.pages_fetched
    );

    info!("");
    info!("=== STEP 2/3: Preprocessing staged pages ===");
    info!("");

    let preprocess_args = PreprocessArgs {
        input_dir: args.raw_dir.clone(),
        processed_dir: args.processed_dir.clone(),
        output: Some(processed_file.to_string_lossy().to_string()),
        threads: args.threads,
        log_level: args.log_level.clone(),
    };

    let preprocess_stats = preprocess::preprocess_batch(&preprocess_args)?;

    info!(
        "Preprocess complete: {} unique records",
        preprocess_stats.unique_records
    );

    let load_stats = if args.skip_load {
        info!("");
        info!("=== STEP 3/3: Load skipped ===");
        None
    } else {
        info!("");
        info!("=== STEP 3/3: Loading into Postgres ===");
        info!("");

        let stats = rt.block_on(load::load_batch(&config, &processed_file))?;
        info!(
            "Load complete: {} inserted, {} already present",
            stats.records_inserted, stats.records_skipped
        );
        Some(stats)
    };

    let total_time = start_time.elapsed();

    info!("");
    info!("==================== PIPELINE COMPLETE ====================");
    info!("Total execution time: {}", format_elapsed(total_time));
    info!("");
    info!("Fetch step:");
    info!("  Pages fetched: {}", fetch_stats.pages_fetched);
    info!("  Items fetched: {}", fetch_stats.items_fetched);
    info!("  Page files staged: {}", fetch_stats.files_written);
    info!("");
    info!("Preprocess step:");
    info!("  Raw items read: {}", preprocess_stats.raw_items);
    info!("  Records transformed: {}", preprocess_stats.transformed_records);
    if preprocess_stats.fell_back {
        info!("  Transformation fell back to raw passthrough");
    }
    info!("  Records normalized: {}", preprocess_stats.normalized_records);
    info!("  Records skipped: {}", preprocess_stats.records_skipped);
    info!("  Unique records: {}", preprocess_stats.unique_records);
    info!("");
    if let Some(stats) = &load_stats {
        info!("Load step:");
        info!("  Records inserted: {}", stats.records_inserted);
        info!("  Records already present: {}", stats.records_skipped);
        info!("");
    }
    info!("Processed batch: {}", processed_file.display());
    info!("===========================================================");

    Ok(())
}
