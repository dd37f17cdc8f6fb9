//! Sequential fetch loop: every code, every day in a range, one request at a time.

use std::path::{Path, PathBuf};
use std::thread;

use chrono::{Datelike, NaiveDate, Weekday};
use tracing::{info, warn};

use crate::data::QuoteSource;
use crate::data::client::FetchOptions;
use crate::error::AppError;
use crate::io::export::append_quote_csv;

/// Outcome counts of a fetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    /// Quotes received and appended.
    pub fetched: usize,
    /// Days the exchange reported no data for.
    pub empty: usize,
    /// Requests that failed after retries.
    pub failed: usize,
}

/// Per-security output file, e.g. `out/510300_SH.csv`.
pub fn quote_file_path(out_dir: &Path, code: &str, suffix: &str) -> PathBuf {
    out_dir.join(format!("{code}_{suffix}.csv"))
}

/// Days in `[start, end]`, weekends dropped unless `include_weekends`.
pub fn trading_days(start: NaiveDate, end: NaiveDate, include_weekends: bool) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| include_weekends || !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Fetch every `(code, day)` pair and append quotes to per-security CSVs.
///
/// Failed and empty days are skipped (and logged); they never produce rows.
/// File-system errors abort the run.
pub fn fetch_range(
    source: &dyn QuoteSource,
    codes: &[String],
    start: NaiveDate,
    end: NaiveDate,
    options: &FetchOptions,
    out_dir: &Path,
) -> Result<FetchSummary, AppError> {
    if start > end {
        return Err(AppError::new(
            2,
            format!("Start date {start} is after end date {end}."),
        ));
    }

    let exchange = source.exchange();
    let days = trading_days(start, end, options.include_weekends);
    let mut summary = FetchSummary::default();
    let mut first_request = true;

    for code in codes {
        let path = quote_file_path(out_dir, code, exchange.file_suffix());

        for &day in &days {
            if !first_request && !options.delay.is_zero() {
                thread::sleep(options.delay);
            }
            first_request = false;

            info!(exchange = exchange.display_name(), code = %code, %day, "fetching");
            match source.fetch_quote(code, day) {
                Ok(Some(quote)) => {
                    append_quote_csv(&path, exchange, &quote)?;
                    summary.fetched += 1;
                }
                Ok(None) => {
                    info!(code = %code, %day, "no trading data");
                    summary.empty += 1;
                }
                Err(e) => {
                    warn!(code = %code, %day, error = %e, "fetch failed, skipping day");
                    summary.failed += 1;
                }
            }
        }
    }

    info!(
        exchange = exchange.display_name(),
        fetched = summary.fetched,
        empty = summary.empty,
        failed = summary.failed,
        "fetch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    use crate::domain::{DailyQuote, Exchange};
    use crate::io::composite::{merge_daily_amounts, quote_columns};

    struct FakeSource {
        calls: RefCell<Vec<(String, NaiveDate)>>,
    }

    impl QuoteSource for FakeSource {
        fn exchange(&self) -> Exchange {
            Exchange::Szse
        }

        fn fetch_quote(&self, code: &str, date: NaiveDate) -> Result<Option<DailyQuote>, AppError> {
            self.calls.borrow_mut().push((code.to_string(), date));
            match date.day() {
                // Pretend the 10th failed and the 11th was a holiday.
                10 => Err(AppError::new(4, "status 503")),
                11 => Ok(None),
                d => Ok(Some(DailyQuote {
                    name: "fund".to_string(),
                    code: code.to_string(),
                    date,
                    prev_close: None,
                    open: None,
                    high: None,
                    low: None,
                    close: None,
                    change_pct: None,
                    volume: None,
                    amount: Some(f64::from(d)),
                })),
            }
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, day).unwrap()
    }

    #[test]
    fn weekends_are_skipped_by_default() {
        // 2025-09-12 is a Friday, 13/14 the weekend.
        assert_eq!(trading_days(d(12), d(15), false), vec![d(12), d(15)]);
        assert_eq!(trading_days(d(12), d(15), true).len(), 4);
        assert!(trading_days(d(15), d(12), true).is_empty());
    }

    #[test]
    fn failed_and_empty_days_produce_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let source = FakeSource {
            calls: RefCell::new(Vec::new()),
        };
        let options = FetchOptions {
            delay: Duration::ZERO,
            ..FetchOptions::default()
        };
        let codes = vec!["159919".to_string(), "159845".to_string()];

        let summary = fetch_range(&source, &codes, d(9), d(12), &options, dir.path()).unwrap();
        assert_eq!(
            summary,
            FetchSummary {
                fetched: 4,
                empty: 2,
                failed: 2
            }
        );
        assert_eq!(source.calls.borrow().len(), 8);
        assert_eq!(source.calls.borrow()[0], ("159919".to_string(), d(9)));

        let file = quote_file_path(dir.path(), "159919", "SZ");
        let composite = merge_daily_amounts(&[file], &quote_columns()).unwrap();
        let days: Vec<NaiveDate> = composite.observations.iter().map(|o| o.date).collect();
        assert_eq!(days, vec![d(9), d(12)]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let source = FakeSource {
            calls: RefCell::new(Vec::new()),
        };
        let err = fetch_range(&source, &[], d(12), d(9), &FetchOptions::default(), Path::new(".")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
