//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can flow unchanged
//! between ingest, detection, reporting and export.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One daily observation: a trading date and the traded amount (10k CNY).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// A positional, chronologically ordered series.
///
/// Built by concatenating a historical segment before a new-data segment.
/// Duplicate dates are kept: detection works on positions, not on dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    observations: Vec<Observation>,
    new_data_start_idx: usize,
}

impl Series {
    /// A series with no history segment (every observation counts as new).
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self {
            observations,
            new_data_start_idx: 0,
        }
    }

    /// Concatenate `history` followed by `new`, remembering where the new part starts.
    pub fn concat(history: Vec<Observation>, new: Vec<Observation>) -> Self {
        let new_data_start_idx = history.len();
        let mut observations = history;
        observations.extend(new);
        Self {
            observations,
            new_data_start_idx,
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Index of the first new-data observation (= length of the history segment).
    pub fn new_data_start_idx(&self) -> usize {
        self.new_data_start_idx
    }

    pub fn history(&self) -> &[Observation] {
        &self.observations[..self.new_data_start_idx]
    }

    pub fn new_portion(&self) -> &[Observation] {
        &self.observations[self.new_data_start_idx..]
    }
}

/// Supported stock exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    /// Shanghai Stock Exchange.
    Sse,
    /// Shenzhen Stock Exchange.
    Szse,
}

impl Exchange {
    pub fn display_name(self) -> &'static str {
        match self {
            Exchange::Sse => "SSE",
            Exchange::Szse => "SZSE",
        }
    }

    /// Suffix used in per-security file names, e.g. `510300_SH.csv`.
    pub fn file_suffix(self) -> &'static str {
        match self {
            Exchange::Sse => "SH",
            Exchange::Szse => "SZ",
        }
    }
}

/// One security's trading summary for one day, as reported by an exchange.
///
/// SSE does not report previous close or open; those stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub name: String,
    pub code: String,
    pub date: NaiveDate,
    pub prev_close: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    /// Percent change versus previous close.
    pub change_pct: Option<f64>,
    /// Volume in 10k shares.
    pub volume: Option<f64>,
    /// Traded amount in 10k CNY.
    pub amount: Option<f64>,
}
