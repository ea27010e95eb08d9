use anyhow::{Context, Result};
use log::{error, warn};
use rayon::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read every staged `*.json` page file under `dir` and return the raw work
/// records from their `message.items` arrays, in file order.
///
/// Files that fail to parse, or that carry no `message.items`, are logged
/// and skipped; non-object items are logged and skipped. Only the directory
/// listing itself can fail.
pub fn read_raw_items(dir: &Path) -> Result<Vec<Value>> {
    let files = list_page_files(dir)?;

    let per_file: Vec<Vec<Value>> = files
        .par_iter()
        .map(|path| read_page_items(path))
        .collect();

    Ok(per_file.into_iter().flatten().collect())
}

/// Staged page files in lexicographic order; names are timestamped, so this
/// is also fetch order.
fn list_page_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read raw data directory: {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_page_items(path: &Path) -> Vec<Value> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let payload: Value = match serde_json::from_str(&content) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Error decoding JSON from file {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    let items = match payload
        .get("message")
        .and_then(|message| message.get("items"))
        .and_then(Value::as_array)
    {
        Some(items) => items,
        None => {
            warn!("No 'message' or 'items' found in file {}", path.display());
            return Vec::new();
        }
    };

    items
        .iter()
        .filter(|item| {
            if item.is_object() {
                true
            } else {
                warn!("Item is not an object in {}: {}", path.display(), item);
                false
            }
        })
        .cloned()
        .collect()
}
