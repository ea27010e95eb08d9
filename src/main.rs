use anyhow::Result;
use clap::Parser;

use crossref_metadata_pipeline::cli::{Cli, Commands};
use crossref_metadata_pipeline::commands::{run_fetch, run_load, run_pipeline, run_preprocess};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch(args) => {
            run_fetch(args)?;
        }
        Commands::Preprocess(args) => {
            run_preprocess(args)?;
        }
        Commands::Load(args) => {
            run_load(args)?;
        }
        Commands::Pipeline(args) => {
            run_pipeline(args)?;
        }
    }

    Ok(())
}
