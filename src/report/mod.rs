//! Reporting utilities: new-portion outlier summary and formatted terminal output.

use chrono::NaiveDate;

use crate::detect::DetectionResult;
use crate::domain::Series;

pub mod format;

pub use format::*;

/// One flagged observation in the new-data portion.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierDetail {
    /// Position in the full (history + new) series.
    pub index: usize,
    pub date: NaiveDate,
    pub value: f64,
    pub z_score: f64,
}

/// Outlier statistics restricted to the new-data portion of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDataReport {
    pub new_data_start_idx: usize,
    pub new_count: usize,
    pub outlier_count: usize,
    pub outliers: Vec<OutlierDetail>,
}

impl NewDataReport {
    /// Share of new-data days flagged as outliers, in `[0, 1]`.
    pub fn outlier_ratio(&self) -> f64 {
        if self.new_count == 0 {
            0.0
        } else {
            self.outlier_count as f64 / self.new_count as f64
        }
    }
}

/// Summarize the outliers found at or after the series' new-data boundary.
pub fn summarize_new_portion(series: &Series, result: &DetectionResult) -> NewDataReport {
    let start = series.new_data_start_idx();
    let outliers: Vec<OutlierDetail> = series
        .observations()
        .iter()
        .zip(result.points.iter())
        .enumerate()
        .skip(start)
        .filter(|(_, (_, p))| p.is_outlier)
        .map(|(index, (obs, p))| OutlierDetail {
            index,
            date: obs.date,
            value: obs.value,
            z_score: p.z_score_or_zero(),
        })
        .collect();

    NewDataReport {
        new_data_start_idx: start,
        new_count: series.len().saturating_sub(start),
        outlier_count: outliers.len(),
        outliers,
    }
}
