//! Exchange data sources and the fetch loop.
//!
//! - retrying HTTP client (`client`)
//! - SSE / SZSE response parsing (`sse`, `szse`)
//! - per-code, per-day fetch loop writing per-security CSVs (`fetch`)

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::{DailyQuote, Exchange};
use crate::error::AppError;
use crate::io::ingest::parse_amount;

pub mod client;
pub mod fetch;
pub mod sse;
pub mod szse;

pub use client::{FetchOptions, HttpClient};
pub use fetch::{FetchSummary, fetch_range};
pub use sse::SseClient;
pub use szse::SzseClient;

/// Something that can answer "what did `code` trade on `date`?".
pub trait QuoteSource {
    fn exchange(&self) -> Exchange;

    /// `Ok(None)` when the exchange has no row for that day.
    fn fetch_quote(&self, code: &str, date: NaiveDate) -> Result<Option<DailyQuote>, AppError>;
}

/// Build the client for `exchange`.
pub fn source_for(exchange: Exchange, options: &FetchOptions) -> Result<Box<dyn QuoteSource>, AppError> {
    let source: Box<dyn QuoteSource> = match exchange {
        Exchange::Sse => Box::new(SseClient::new(options)?),
        Exchange::Szse => Box::new(SzseClient::new(options)?),
    };
    Ok(source)
}

/// Exchange payloads mix numbers and strings with thousands separators.
pub(crate) fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount(s),
        _ => None,
    }
}

pub(crate) fn json_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
