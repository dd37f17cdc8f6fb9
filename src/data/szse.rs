//! Shenzhen Stock Exchange daily fund snapshot (JSON report endpoint).

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::data::client::{FetchOptions, HttpClient};
use crate::data::{QuoteSource, json_f64, json_string};
use crate::domain::{DailyQuote, Exchange};
use crate::error::AppError;
use crate::io::ingest::parse_trade_date;

const BASE_URL: &str = "https://www.szse.cn/api/report/ShowReport/data";
const CATALOG_ID: &str = "1815_stock_snapshot";
/// `tab2` is the fund tab of the snapshot report (`tab1` would be stocks).
const FUND_TAB: &str = "tab2";
const ARCHIVE_DATE: &str = "2023-09-01";
const REFERER: &str = "https://www.szse.cn/market/trend/index.html";

pub struct SzseClient {
    http: HttpClient,
}

impl SzseClient {
    pub fn new(options: &FetchOptions) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpClient::new(options)?,
        })
    }
}

impl QuoteSource for SzseClient {
    fn exchange(&self) -> Exchange {
        Exchange::Szse
    }

    fn fetch_quote(&self, code: &str, date: NaiveDate) -> Result<Option<DailyQuote>, AppError> {
        let day = date.format("%Y-%m-%d").to_string();
        let query = [
            ("SHOWTYPE", "JSON".to_string()),
            ("CATALOGID", CATALOG_ID.to_string()),
            ("TABKEY", FUND_TAB.to_string()),
            ("txtDMorJC", code.to_string()),
            ("txtBeginDate", day.clone()),
            ("txtEndDate", day),
            ("archiveDate", ARCHIVE_DATE.to_string()),
            ("random", Utc::now().timestamp_millis().to_string()),
        ];
        let headers = [
            ("Referer", REFERER),
            ("X-Request-Type", "ajax"),
            ("X-Requested-With", "XMLHttpRequest"),
            ("Sec-Fetch-Site", "same-origin"),
            ("Sec-Fetch-Mode", "cors"),
        ];
        let body = self.http.get_text(BASE_URL, &headers, &query)?;
        parse_szse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SzseTab {
    /// Absent or `null` on days without a row.
    #[serde(default)]
    data: Option<Vec<SzseRow>>,
}

#[derive(Debug, Deserialize)]
struct SzseRow {
    zqjc: Option<Value>,
    zqdm: Option<Value>,
    jyrq: Option<Value>,
    qss: Option<Value>,
    ks: Option<Value>,
    zg: Option<Value>,
    zd: Option<Value>,
    ss: Option<Value>,
    sdf: Option<Value>,
    cjgs: Option<Value>,
    cjje: Option<Value>,
}

/// Parse an SZSE report body (a JSON array of report tabs).
///
/// `Ok(None)` means the first tab holds no row for that day.
pub fn parse_szse_response(text: &str) -> Result<Option<DailyQuote>, AppError> {
    let tabs: Vec<SzseTab> = serde_json::from_str(text)
        .map_err(|e| AppError::new(4, format!("Failed to parse SZSE response: {e}")))?;

    let Some(row) = tabs
        .into_iter()
        .next()
        .and_then(|tab| tab.data)
        .and_then(|rows| rows.into_iter().next())
    else {
        return Ok(None);
    };

    let raw_date = row.jyrq.as_ref().map(json_string).unwrap_or_default();
    let date = parse_trade_date(&raw_date)
        .ok_or_else(|| AppError::new(4, format!("Invalid SZSE trade date '{raw_date}'.")))?;

    Ok(Some(DailyQuote {
        name: row.zqjc.as_ref().map(json_string).unwrap_or_default(),
        code: row.zqdm.as_ref().map(json_string).unwrap_or_default(),
        date,
        prev_close: row.qss.as_ref().and_then(json_f64),
        open: row.ks.as_ref().and_then(json_f64),
        high: row.zg.as_ref().and_then(json_f64),
        low: row.zd.as_ref().and_then(json_f64),
        close: row.ss.as_ref().and_then(json_f64),
        change_pct: row.sdf.as_ref().and_then(json_f64),
        volume: row.cjgs.as_ref().and_then(json_f64),
        amount: row.cjje.as_ref().and_then(json_f64),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_row_of_first_tab() {
        let body = r#"[{"metadata":{"name":"基金"},"data":[{"zqjc":"华夏中证1000ETF","zqdm":"159845","jyrq":"2025-09-12","qss":"2.650","ks":"2.655","zg":"2.700","zd":"2.640","ss":"2.690","sdf":"1.51","cjgs":"45,678.90","cjje":"12,345.67"}]}]"#;
        let quote = parse_szse_response(body).unwrap().unwrap();

        assert_eq!(quote.code, "159845");
        assert_eq!(quote.date, NaiveDate::from_ymd_opt(2025, 9, 12).unwrap());
        assert_eq!(quote.prev_close, Some(2.65));
        assert_eq!(quote.close, Some(2.69));
        assert_eq!(quote.volume, Some(45678.9));
        assert_eq!(quote.amount, Some(12345.67));
    }

    #[test]
    fn empty_data_is_no_quote() {
        assert_eq!(parse_szse_response(r#"[{"metadata":{},"data":[]}]"#).unwrap(), None);
        assert_eq!(parse_szse_response("[]").unwrap(), None);
    }

    #[test]
    fn null_or_missing_data_is_no_quote() {
        assert_eq!(parse_szse_response(r#"[{"metadata":{},"data":null}]"#).unwrap(), None);
        assert_eq!(parse_szse_response(r#"[{"metadata":{}}]"#).unwrap(), None);
    }

    #[test]
    fn non_array_body_is_an_error() {
        assert!(parse_szse_response(r#"{"error":"blocked"}"#).is_err());
    }
}
