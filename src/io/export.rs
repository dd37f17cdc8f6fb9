//! CSV writers: detection results and per-security daily quote files.
//!
//! Exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::detect::DetectionResult;
use crate::domain::{DailyQuote, Exchange, Series};
use crate::error::AppError;
use crate::io::ingest::{DEFAULT_AMOUNT_COLUMN, DEFAULT_DATE_COLUMN};

const SSE_QUOTE_HEADER: [&str; 9] = [
    "证券名称",
    "证券代码",
    "交易日期",
    "收盘价",
    "涨跌幅(%)",
    "最高价",
    "最低价",
    "成交量(万份)",
    "成交额(万元)",
];

const SZSE_QUOTE_HEADER: [&str; 11] = [
    "证券名称",
    "证券代码",
    "交易日期",
    "前收价",
    "开盘价",
    "最高价",
    "最低价",
    "收盘价",
    "涨跌幅(%)",
    "成交量(万份)",
    "成交额(万元)",
];

/// Write one row per series position with its z-score and outlier flag.
///
/// Positions without a full lagged window get an empty `lag_mad_z_score` cell.
pub fn write_detection_csv(path: &Path, series: &Series, result: &DetectionResult) -> Result<(), AppError> {
    if series.len() != result.len() {
        return Err(AppError::new(
            2,
            format!(
                "Detection result length {} does not match series length {}.",
                result.len(),
                series.len()
            ),
        ));
    }

    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    writer
        .write_record([DEFAULT_DATE_COLUMN, DEFAULT_AMOUNT_COLUMN, "lag_mad_z_score", "is_outlier"])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (obs, point) in series.observations().iter().zip(result.points.iter()) {
        writer
            .write_record([
                obs.date.format("%Y%m%d").to_string(),
                format!("{:.2}", obs.value),
                point.z_score.map(|z| format!("{z:.6}")).unwrap_or_default(),
                point.is_outlier.to_string(),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Append a quote to a per-security CSV, writing the header when the file is new.
pub fn append_quote_csv(path: &Path, exchange: Exchange, quote: &DailyQuote) -> Result<(), AppError> {
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open quote CSV '{}': {e}", path.display())))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        let header: &[&str] = match exchange {
            Exchange::Sse => &SSE_QUOTE_HEADER,
            Exchange::Szse => &SZSE_QUOTE_HEADER,
        };
        write_row(&mut writer, header.iter().map(|s| s.to_string()).collect(), path)?;
    }

    write_row(&mut writer, quote_row(exchange, quote), path)?;
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush quote CSV '{}': {e}", path.display())))?;
    Ok(())
}

fn write_row(writer: &mut csv::Writer<File>, row: Vec<String>, path: &Path) -> Result<(), AppError> {
    writer
        .write_record(&row)
        .map_err(|e| AppError::new(2, format!("Failed to write quote CSV '{}': {e}", path.display())))
}

fn quote_row(exchange: Exchange, q: &DailyQuote) -> Vec<String> {
    let date = q.date.format("%Y%m%d").to_string();
    match exchange {
        Exchange::Sse => vec![
            q.name.clone(),
            q.code.clone(),
            date,
            fmt_opt(q.close),
            fmt_opt(q.change_pct),
            fmt_opt(q.high),
            fmt_opt(q.low),
            fmt_opt(q.volume),
            fmt_opt(q.amount),
        ],
        Exchange::Szse => vec![
            q.name.clone(),
            q.code.clone(),
            date,
            fmt_opt(q.prev_close),
            fmt_opt(q.open),
            fmt_opt(q.high),
            fmt_opt(q.low),
            fmt_opt(q.close),
            fmt_opt(q.change_pct),
            fmt_opt(q.volume),
            fmt_opt(q.amount),
        ],
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
