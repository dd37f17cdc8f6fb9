//! Composite series: daily traded amounts summed across several securities.
//!
//! Inputs are per-security daily CSVs as written by `etfmad fetch`; the output is
//! a `(交易日期, 总成交额(万元))` file ready for `etfmad detect`.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::domain::Observation;
use crate::error::AppError;
use crate::io::ingest::{
    DEFAULT_AMOUNT_COLUMN, DEFAULT_DATE_COLUMN, SeriesColumns, build_header_map, normalize_header_name, parse_amount,
    parse_trade_date,
};

/// Amount column of per-security quote files.
pub const QUOTE_AMOUNT_COLUMN: &str = "成交额(万元)";

/// Date and amount columns of the per-security quote files written by `etfmad fetch`.
pub fn quote_columns() -> SeriesColumns {
    SeriesColumns {
        date: DEFAULT_DATE_COLUMN.to_string(),
        amount: QUOTE_AMOUNT_COLUMN.to_string(),
    }
}

/// Daily totals, ascending by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeSeries {
    pub observations: Vec<Observation>,
    /// Files skipped because they lack the date or amount column.
    pub skipped_files: Vec<PathBuf>,
    /// Rows skipped because they were short, blank or unparsable.
    pub skipped_rows: usize,
}

/// Sum the amount column of every input file per trading date.
///
/// See [`quote_columns`] for the columns of fetched quote files.
pub fn merge_daily_amounts(paths: &[PathBuf], columns: &SeriesColumns) -> Result<CompositeSeries, AppError> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    let mut skipped_files = Vec::new();
    let mut skipped_rows = 0usize;

    for path in paths {
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

        let (Some(&date_idx), Some(&amount_idx)) = (
            header_map.get(&normalize_header_name(&columns.date)),
            header_map.get(&normalize_header_name(&columns.amount)),
        ) else {
            warn!(path = %path.display(), "required columns not found, skipping file");
            skipped_files.push(path.clone());
            continue;
        };

        let mut used = 0usize;
        for result in reader.records() {
            let Ok(record) = result else {
                skipped_rows += 1;
                continue;
            };
            if record.len() <= date_idx.max(amount_idx) {
                skipped_rows += 1;
                continue;
            }

            let raw_amount = &record[amount_idx];
            let Some(amount) = parse_amount(raw_amount) else {
                if !raw_amount.trim().is_empty() {
                    warn!(path = %path.display(), raw = raw_amount, "unparsable amount, skipping row");
                }
                skipped_rows += 1;
                continue;
            };
            let Some(date) = parse_trade_date(&record[date_idx]) else {
                warn!(path = %path.display(), raw = &record[date_idx], "unparsable date, skipping row");
                skipped_rows += 1;
                continue;
            };

            *totals.entry(date).or_insert(0.0) += amount;
            used += 1;
        }
        info!(path = %path.display(), rows = used, "merged file");
    }

    Ok(CompositeSeries {
        observations: totals
            .into_iter()
            .map(|(date, value)| Observation::new(date, value))
            .collect(),
        skipped_files,
        skipped_rows,
    })
}

/// Write a composite series as `交易日期,总成交额(万元)`, overwriting `path`.
pub fn write_composite_csv(path: &Path, observations: &[Observation]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create composite CSV '{}': {e}", path.display())))?;

    writer
        .write_record([DEFAULT_DATE_COLUMN, DEFAULT_AMOUNT_COLUMN])
        .map_err(|e| AppError::new(2, format!("Failed to write composite CSV header: {e}")))?;
    for o in observations {
        writer
            .write_record([o.date.format("%Y%m%d").to_string(), format!("{:.2}", o.value)])
            .map_err(|e| AppError::new(2, format!("Failed to write composite CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush composite CSV: {e}")))?;
    Ok(())
}
