use anyhow::{anyhow, Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::cli::LoadArgs;
use crate::common::{format_elapsed, setup_logging, Config, LoadStats};
use crate::load::Loader;
use crate::preprocess::NormalizedRecord;

/// Run the load command with the given arguments
pub fn run_load(args: LoadArgs) -> Result<LoadStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    let config = Config::from_env()?;

    let input = match &args.input {
        Some(input) => PathBuf::from(input),
        None => find_latest_batch(Path::new(&args.processed_dir))?,
    };

    info!("Starting database load");
    info!("Input: {}", input.display());

    let rt = tokio::runtime::Runtime::new()?;
    let stats = rt.block_on(load_batch(&config, &input))?;

    let total_time = start_time.elapsed();

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(total_time));
    info!("Records received: {}", stats.records_received);
    info!("Records inserted: {}", stats.records_inserted);
    info!("Records already present: {}", stats.records_skipped);
    info!("========================================================");

    Ok(stats)
}

/// Load one processed batch file into the database.
pub(crate) async fn load_batch(config: &Config, input: &Path) -> Result<LoadStats> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read processed file: {}", input.display()))?;
    let records: Vec<NormalizedRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse processed file: {}", input.display()))?;

    info!("Loading {} records into the database", records.len());

    let loader = Loader::connect(config).await?;
    loader.ensure_schema().await?;
    loader.load(&records).await
}

/// Newest processed batch file in the directory, by modification time.
pub(crate) fn find_latest_batch(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read processed data directory: {}", dir.display()))?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .max_by_key(|path| {
            path.metadata()
                .and_then(|meta| meta.modified())
                .ok()
        })
        .ok_or_else(|| anyhow!("No processed batch files found in {}", dir.display()))
}
