/// Statistics from the fetch step
#[derive(Debug, Clone, Default)]
pub struct FetchStats {
    pub pages_fetched: usize,
    pub items_fetched: usize,
    pub files_written: usize,
}

/// Statistics from the preprocess step
#[derive(Debug, Clone, Default)]
pub struct PreprocessStats {
    pub raw_items: usize,
    pub transformed_records: usize,
    pub fell_back: bool,
    pub normalized_records: usize,
    pub records_skipped: usize,
    pub unique_records: usize,
    pub output_file: String,
}

/// Statistics from the load step
#[derive(Debug, Clone, Default)]
pub struct LoadStats {
    pub records_received: usize,
    pub records_inserted: usize,
    pub records_skipped: usize,
}
