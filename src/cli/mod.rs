//! Command-line parsing for the ETF amount anomaly toolkit.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! detection and I/O code. Every tunable can also come from the environment
//! (or a `.env` file loaded at startup).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::detect::{DEFAULT_THRESHOLD, DEFAULT_WINDOW};
use crate::domain::Exchange;
use crate::io::composite::QUOTE_AMOUNT_COLUMN;
use crate::io::ingest::{DEFAULT_AMOUNT_COLUMN, DEFAULT_DATE_COLUMN};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "etfmad", version, about = "ETF traded-amount fetching, merging and lagged MAD anomaly detection")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the lagged rolling MAD detector over history + new data and report new outliers.
    Detect(DetectArgs),
    /// Sum several per-security quote CSVs into one daily composite series.
    Composite(CompositeArgs),
    /// Fetch daily quotes from an exchange into per-security CSVs.
    Fetch(FetchArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct DetectArgs {
    /// Historical window CSV (placed before the new data).
    #[arg(long, value_name = "CSV")]
    pub history: PathBuf,

    /// New data CSV.
    #[arg(long = "new", value_name = "CSV")]
    pub new_data: PathBuf,

    /// Lagged window size (days).
    #[arg(short = 'k', long, env = "ETF_MAD_WINDOW", default_value_t = DEFAULT_WINDOW)]
    pub window: usize,

    /// Outlier threshold on |z|.
    #[arg(short = 't', long, env = "ETF_MAD_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Date column name.
    #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    /// Amount column name.
    #[arg(long, default_value = DEFAULT_AMOUNT_COLUMN)]
    pub amount_column: String,

    /// Write per-day z-scores and flags to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Evaluate windows in parallel (same output).
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Parser, Clone)]
pub struct CompositeArgs {
    /// Per-security quote CSVs to merge.
    #[arg(required = true, value_name = "CSV")]
    pub inputs: Vec<PathBuf>,

    /// Output composite CSV (overwritten).
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,

    /// Date column of each input.
    #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    /// Amount column to sum in each input.
    #[arg(long, default_value = QUOTE_AMOUNT_COLUMN)]
    pub amount_column: String,
}

#[derive(Debug, Parser, Clone)]
pub struct FetchArgs {
    /// Exchange to query.
    #[arg(short, long, value_enum)]
    pub exchange: Exchange,

    /// Security codes, comma separated (e.g. 510300,510310).
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub codes: Vec<String>,

    /// First day (YYYY-MM-DD), defaults to today.
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD), defaults to today.
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Seconds to wait between requests.
    #[arg(long, env = "ETF_MAD_FETCH_DELAY_SECS", default_value_t = 5.0)]
    pub delay_secs: f64,

    /// Retries per request on transient failures.
    #[arg(long, env = "ETF_MAD_FETCH_RETRIES", default_value_t = 3)]
    pub retries: u32,

    /// Directory for `<code>_SH.csv` / `<code>_SZ.csv` files.
    #[arg(long, env = "ETF_MAD_OUT_DIR", default_value = ".")]
    pub out_dir: PathBuf,

    /// Also query Saturdays and Sundays.
    #[arg(long)]
    pub include_weekends: bool,
}
