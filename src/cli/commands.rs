//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Streaming importer for the countries/states/cities dataset
#[derive(Parser, Debug)]
#[command(name = "geoload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML, needs a `duckdb` section)
    #[arg(short = 'C', long, global = true, default_value = "geoload.yaml")]
    pub config: PathBuf,

    /// Write logs to this file instead of stderr
    #[arg(short, long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the schema and import the JSON array file
    Import {
        /// Input file (overrides `import.data_path`)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Flush threshold for every entity (overrides the config)
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Count the cities of one state and export the result as CSV
    Count {
        /// Country name
        #[arg(long)]
        country: Option<String>,

        /// State or province name
        #[arg(long)]
        state: Option<String>,

        /// Directory receiving the CSV file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Import, then export the count configured in the `report` section
    Run {
        /// Input file (overrides `import.data_path`)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}
