use anyhow::{Context, Result};
use log::{error, info};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::cli::FetchArgs;
use crate::common::{
    create_count_progress_bar, format_elapsed, setup_logging, timestamp_slug, Config, FetchStats,
};
use crate::extract::{CrossrefClient, PAGE_SIZE};

/// Run the fetch command with the given arguments
pub fn run_fetch(args: FetchArgs) -> Result<FetchStats> {
    let start_time = Instant::now();

    setup_logging(&args.log_level)?;

    let config = Config::from_env()?;

    info!("Starting CrossRef works fetch");
    info!("Endpoint: {}", config.api_endpoint);
    info!("Max pages: {}", args.max_pages);
    info!("Raw data directory: {}", args.raw_dir);

    let rt = tokio::runtime::Runtime::new()?;
    let stats = rt.block_on(fetch_and_stage(&config, args.max_pages, Path::new(&args.raw_dir)))?;

    let total_time = start_time.elapsed();

    info!("==================== FINAL SUMMARY ====================");
    info!("Total execution time: {}", format_elapsed(total_time));
    info!("Pages fetched: {}", stats.pages_fetched);
    info!("Items fetched: {}", stats.items_fetched);
    info!("Page files staged: {}", stats.files_written);
    info!("Raw data directory: {}", args.raw_dir);
    info!("========================================================");

    Ok(stats)
}

/// Page through the works endpoint and stage every fetched page to disk.
///
/// Pagination stops at the first empty page or fetch error; whatever was
/// fetched up to that point is still staged.
pub(crate) async fn fetch_and_stage(
    config: &Config,
    max_pages: usize,
    raw_dir: &Path,
) -> Result<FetchStats> {
    let client = CrossrefClient::new(&config.api_endpoint)?;

    let mut stats = FetchStats::default();
    let mut pages: Vec<Value> = Vec::new();

    let progress = create_count_progress_bar(max_pages as u64);
    progress.set_message("Fetching pages");

    for page_index in 0..max_pages {
        let offset = page_index * PAGE_SIZE;

        match client.fetch_page(offset).await {
            Ok(Some(page)) => {
                info!("Fetched {} items from page offset {}", page.item_count, offset);
                stats.items_fetched += page.item_count;
                pages.push(page.payload);
            }
            Ok(None) => {
                info!("No more items found, stopping pagination");
                break;
            }
            Err(e) => {
                error!("An error occurred for offset {}: {:#}", offset, e);
                break;
            }
        }

        progress.inc(1);
    }

    progress.finish_with_message("Fetch complete");

    stats.pages_fetched = pages.len();
    info!("Fetched data from {} pages successfully.", stats.pages_fetched);

    fs::create_dir_all(raw_dir)
        .with_context(|| format!("Failed to create raw data directory: {}", raw_dir.display()))?;

    for (i, payload) in pages.iter().enumerate() {
        let filename = format!("{}_page_{}_data.json", timestamp_slug()?, i + 1);
        let path = raw_dir.join(filename);

        let json = serde_json::to_string_pretty(payload)
            .context("Failed to serialize page payload")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write page file: {}", path.display()))?;

        info!("Saved page {} data to {}", i + 1, path.display());
        stats.files_written += 1;
    }

    Ok(stats)
}
