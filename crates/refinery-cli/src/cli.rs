//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Refinery: clean tabular datasets from the command line
#[derive(Parser)]
#[command(name = "refinery")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (info-level logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Processor configuration file (JSON)
    #[arg(long, global = true, value_name = "CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every quality check without changing anything
    Check {
        /// Path to the data file (CSV/TSV/JSON/XLSX)
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Z-score threshold for the outlier check (default from config)
        #[arg(short, long)]
        z_threshold: Option<f64>,
    },

    /// Apply cleaning steps and save the result
    Clean(CleanArgs),
}

/// Steps run by `clean`, in the order listed.
#[derive(clap::Args)]
pub struct CleanArgs {
    /// Path to the data file (CSV/TSV/JSON/XLSX)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output path for cleaned data (default: <file>.clean.<format>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: csv or xlsx (default: from the output extension)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Columns to drop (repeatable, or comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub drop: Vec<String>,

    /// Promote a column to the index as-is
    #[arg(long, conflicts_with = "index_date")]
    pub index: Option<String>,

    /// Parse a column as dates and promote it to the index
    #[arg(long)]
    pub index_date: Option<String>,

    /// Write rows with unparseable dates to this file
    #[arg(long, requires = "index_date")]
    pub invalid_log: Option<PathBuf>,

    /// Truncate date-times in the index to calendar dates
    #[arg(long, requires = "index_date")]
    pub plain_date: bool,

    /// Keep rows with unparseable dates (null index label)
    #[arg(long, requires = "index_date")]
    pub keep_invalid: bool,

    /// Missing-value strategy: drop, mean, median, most_frequent
    #[arg(short, long)]
    pub missing: Option<String>,

    /// Columns rounded back to integers after imputation
    #[arg(long, value_delimiter = ',', requires = "missing")]
    pub force_int: Vec<String>,

    /// Duplicate method: keep_first, keep_last, drop_all, flag
    #[arg(short, long)]
    pub duplicates: Option<String>,

    /// Columns that define a duplicate (default: all)
    #[arg(long, value_delimiter = ',', requires = "duplicates")]
    pub subset: Vec<String>,

    /// Remove rows that are z-score outliers in any numeric column
    #[arg(long, value_name = "THRESHOLD")]
    pub zscore: Option<f64>,

    /// Remove IQR outliers from this column
    #[arg(long, value_name = "COLUMN")]
    pub iqr: Option<String>,

    /// IQR fence multiplier (default from config)
    #[arg(long, requires = "iqr")]
    pub iqr_multiplier: Option<f64>,

    /// Min-max scale every numeric column to [0, 1]
    #[arg(long)]
    pub normalize: bool,

    /// Write the audit trail of applied steps to this JSON file
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Print a before/after comparison of this column
    #[arg(long, value_name = "COLUMN")]
    pub compare: Option<String>,

    /// Comparison plot kind: boxplot or histogram
    #[arg(long, default_value = "boxplot", requires = "compare")]
    pub plot: String,
}
