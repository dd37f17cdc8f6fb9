//! CSV ingest for `(date, amount)` series.
//!
//! This module turns a history-window CSV or a new-data CSV into an ordered list
//! of `Observation`s.
//!
//! Design goals:
//! - **Strict schema** for the date and amount columns (clear errors + exit code 2)
//! - **Positional fidelity**: rows stay in file order, nothing is sorted or deduplicated
//! - **No silent repair**: blank/unparsable amounts become `NaN` so the detector
//!   reports their position instead of the loader guessing a value

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::Observation;
use crate::error::AppError;

/// Default date column of composite series files.
pub const DEFAULT_DATE_COLUMN: &str = "交易日期";
/// Default amount column of composite series files (10k CNY).
pub const DEFAULT_AMOUNT_COLUMN: &str = "总成交额(万元)";

/// Which CSV columns hold the date and the amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesColumns {
    pub date: String,
    pub amount: String,
}

impl Default for SeriesColumns {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_COLUMN.to_string(),
            amount: DEFAULT_AMOUNT_COLUMN.to_string(),
        }
    }
}

/// Load a `(date, amount)` series from CSV, keeping file order.
pub fn load_series_csv(path: &Path, columns: &SeriesColumns) -> Result<Vec<Observation>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    let date_idx = require_column(&header_map, &columns.date, path)?;
    let amount_idx = require_column(&header_map, &columns.amount, path)?;

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| p.line());
            AppError::new(2, format!("CSV parse error in '{}' line {line}: {e}", path.display()))
        })?;
        // Reader positions count every physical line, including blank ones the
        // reader skips and newlines inside quoted cells.
        let line = record.position().map_or(0, |p| p.line());

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_trade_date(raw_date).ok_or_else(|| {
            AppError::new(
                2,
                format!("Invalid date '{raw_date}' in '{}' line {line}.", path.display()),
            )
        })?;

        let raw_amount = record.get(amount_idx).unwrap_or("");
        let value = match parse_amount(raw_amount) {
            Some(v) => v,
            None => {
                warn!(path = %path.display(), line, raw = raw_amount, "unparsable amount kept as NaN");
                f64::NAN
            }
        };

        out.push(Observation::new(date, value));
    }

    debug!(path = %path.display(), rows = out.len(), "loaded series");
    Ok(out)
}

/// Parse an exchange trading date: `20250912` or `2025-09-12`.
pub fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim().trim_matches('"');
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok()
}

/// Parse an amount cell, tolerating thousands separators and stray quotes.
///
/// Returns `None` for blank, unparsable or non-finite values.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '"').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_lowercase()
}

fn require_column(header_map: &HashMap<String, usize>, column: &str, path: &Path) -> Result<usize, AppError> {
    header_map
        .get(&normalize_header_name(column))
        .copied()
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Missing required column `{column}` in '{}'.", path.display()),
            )
        })
}
