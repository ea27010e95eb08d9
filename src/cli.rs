use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "crossref-metadata-pipeline")]
#[command(about = "ETL pipeline for fetching, cleaning, and loading CrossRef publication metadata")]
#[command(version = "1.0.0")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch paginated works from the CrossRef API and stage raw pages to disk
    Fetch(FetchArgs),

    /// Flatten, sanitize, normalize, and deduplicate staged raw pages (vectorized using Polars)
    Preprocess(PreprocessArgs),

    /// Load a processed batch into Postgres with insert-or-ignore semantics keyed by DOI
    Load(LoadArgs),

    /// Run the full pipeline: fetch -> preprocess -> load
    Pipeline(PipelineArgs),
}

#[derive(Parser, Clone)]
pub struct FetchArgs {
    /// Maximum number of pages to fetch (200 works per page)
    #[arg(short, long, default_value = "5")]
    pub max_pages: usize,

    /// Directory for staged raw page files
    #[arg(short, long, default_value = "data/raw")]
    pub raw_dir: String,

    /// Logging level (DEBUG, INFO, WARN, ERROR, OFF)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone)]
pub struct PreprocessArgs {
    /// Directory holding staged raw page files
    #[arg(short, long, default_value = "data/raw")]
    pub input_dir: String,

    /// Directory for processed batch files
    #[arg(short, long, default_value = "data/processed")]
    pub processed_dir: String,

    /// Explicit output file (default: a timestamped file under the processed directory)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Worker threads for parsing staged pages (0 = number of CPU cores)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Logging level (DEBUG, INFO, WARN, ERROR, OFF)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone)]
pub struct LoadArgs {
    /// Processed batch file to load (default: newest *_data.json in the processed directory)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Directory searched for the newest processed batch when --input is not given
    #[arg(short, long, default_value = "data/processed")]
    pub processed_dir: String,

    /// Logging level (DEBUG, INFO, WARN, ERROR, OFF)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}

#[derive(Parser, Clone)]
pub struct PipelineArgs {
    /// Maximum number of pages to fetch (200 works per page)
    #[arg(short, long, default_value = "5")]
    pub max_pages: usize,

    /// Directory for staged raw page files
    #[arg(short, long, default_value = "data/raw")]
    pub raw_dir: String,

    /// Directory for processed batch files
    #[arg(long, default_value = "data/processed")]
    pub processed_dir: String,

    /// Worker threads for parsing staged pages (0 = number of CPU cores)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Skip the database load step
    #[arg(long, default_value = "false")]
    pub skip_load: bool,

    /// Logging level (DEBUG, INFO, WARN, ERROR, OFF)
    #[arg(short, long, default_value = "INFO")]
    pub log_level: String,
}
