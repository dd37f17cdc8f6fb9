//! Shanghai Stock Exchange daily fund snapshot (JSONP endpoint).

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::data::client::{FetchOptions, HttpClient};
use crate::data::{QuoteSource, json_f64, json_string};
use crate::domain::{DailyQuote, Exchange};
use crate::error::AppError;
use crate::io::ingest::parse_trade_date;

const BASE_URL: &str = "https://query.sse.com.cn/commonQuery.do";
const SQL_ID: &str = "COMMON_SSE_CP_GPJCTPZ_GPLB_CJGK_MRGK_C";
const REFERER: &str = "https://www.sse.com.cn/";

pub struct SseClient {
    http: HttpClient,
}

impl SseClient {
    pub fn new(options: &FetchOptions) -> Result<Self, AppError> {
        Ok(Self {
            http: HttpClient::new(options)?,
        })
    }
}

impl QuoteSource for SseClient {
    fn exchange(&self) -> Exchange {
        Exchange::Sse
    }

    fn fetch_quote(&self, code: &str, date: NaiveDate) -> Result<Option<DailyQuote>, AppError> {
        let now_ms = Utc::now().timestamp_millis();
        let query = [
            ("jsonCallBack", format!("jsonpCallback{}", now_ms % 100_000_000)),
            ("sqlId", SQL_ID.to_string()),
            ("SEC_CODE", code.to_string()),
            ("TX_DATE", date.format("%Y%m%d").to_string()),
            ("_", now_ms.to_string()),
        ];
        let body = self.http.get_text(BASE_URL, &[("Referer", REFERER)], &query)?;
        parse_sse_response(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SseResponse {
    #[serde(default)]
    result: Vec<SseRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct SseRow {
    sec_name: Option<Value>,
    sec_code: Option<Value>,
    tx_date: Option<Value>,
    close_price: Option<Value>,
    change_rate: Option<Value>,
    high_price: Option<Value>,
    low_price: Option<Value>,
    trade_vol: Option<Value>,
    trade_amt: Option<Value>,
}

/// Extract the JSON payload of a JSONP body `callback({...})`.
///
/// Takes everything between the first `(` and the last `)`.
pub fn unwrap_jsonp(text: &str) -> Option<&str> {
    let start = text.find('(')?;
    let end = text.rfind(')')?;
    if end <= start {
        return None;
    }
    Some(&text[start + 1..end])
}

/// Parse an SSE response body.
///
/// `Ok(None)` means the exchange returned no row for that day (holiday, weekend,
/// or a date before listing).
pub fn parse_sse_response(text: &str) -> Result<Option<DailyQuote>, AppError> {
    let json = unwrap_jsonp(text).unwrap_or(text);
    let resp: SseResponse = serde_json::from_str(json)
        .map_err(|e| AppError::new(4, format!("Failed to parse SSE response: {e}")))?;

    let Some(row) = resp.result.into_iter().next() else {
        return Ok(None);
    };

    let raw_date = row.tx_date.as_ref().map(json_string).unwrap_or_default();
    let date = parse_trade_date(&raw_date)
        .ok_or_else(|| AppError::new(4, format!("Invalid SSE trade date '{raw_date}'.")))?;

    Ok(Some(DailyQuote {
        name: row.sec_name.as_ref().map(json_string).unwrap_or_default(),
        code: row.sec_code.as_ref().map(json_string).unwrap_or_default(),
        date,
        prev_close: None,
        open: None,
        high: row.high_price.as_ref().and_then(json_f64),
        low: row.low_price.as_ref().and_then(json_f64),
        close: row.close_price.as_ref().and_then(json_f64),
        change_pct: row.change_rate.as_ref().and_then(json_f64),
        volume: row.trade_vol.as_ref().and_then(json_f64),
        amount: row.trade_amt.as_ref().and_then(json_f64),
    }))
}
