//! Shared detection pipeline.
//!
//! history CSV + new CSV -> concatenated series -> lagged MAD detection -> new-portion report
//!
//! Front-ends only decide how to present the returned `RunOutput`.

use std::path::PathBuf;

use tracing::info;

use crate::detect::{DetectConfig, DetectionResult, detect_series};
use crate::domain::Series;
use crate::error::AppError;
use crate::io::ingest::{SeriesColumns, load_series_csv};
use crate::report::{NewDataReport, summarize_new_portion};

/// Inputs of a detection run.
#[derive(Debug, Clone)]
pub struct DetectRunConfig {
    pub history_path: PathBuf,
    pub new_data_path: PathBuf,
    pub columns: SeriesColumns,
    pub detect: DetectConfig,
    pub parallel: bool,
}

/// All computed outputs of a single detection run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub series: Series,
    pub result: DetectionResult,
    pub report: NewDataReport,
}

/// Load both segments and run detection over the concatenated series.
pub fn run_detect(config: &DetectRunConfig) -> Result<RunOutput, AppError> {
    let history = load_series_csv(&config.history_path, &config.columns)?;
    let new_data = load_series_csv(&config.new_data_path, &config.columns)?;
    info!(history = history.len(), new = new_data.len(), "loaded segments");

    run_detect_on_series(Series::concat(history, new_data), config)
}

/// Run detection over an already assembled series.
///
/// Detector precondition failures (too little data, non-finite values) abort
/// here, before anything is reported or exported.
pub fn run_detect_on_series(series: Series, config: &DetectRunConfig) -> Result<RunOutput, AppError> {
    let result = detect_series(&series, &config.detect, config.parallel)?;
    let report = summarize_new_portion(&series, &result);

    info!(
        total = series.len(),
        window = config.detect.window,
        threshold = config.detect.threshold,
        new_outliers = report.outlier_count,
        "detection finished"
    );

    Ok(RunOutput { series, result, report })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &std::path::Path) -> DetectRunConfig {
        DetectRunConfig {
            history_path: dir.join("history.csv"),
            new_data_path: dir.join("new.csv"),
            columns: SeriesColumns::default(),
            detect: DetectConfig::default(),
            parallel: false,
        }
    }

    fn write_series(path: &std::path::Path, first_day: u32, values: &[f64]) {
        let mut text = String::from("交易日期,总成交额(万元)\n");
        for (i, v) in values.iter().enumerate() {
            text.push_str(&format!("202501{:02},{v}\n", first_day as usize + i));
        }
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn history_then_new_is_detected_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let history: Vec<f64> = (0..20).map(|i| 1000.0 + (i % 5) as f64 * 10.0).collect();
        write_series(&cfg.history_path, 1, &history);
        write_series(&cfg.new_data_path, 21, &[1010.0, 5000.0, 1020.0]);

        let out = run_detect(&cfg).unwrap();
        assert_eq!(out.series.len(), 23);
        assert_eq!(out.series.new_data_start_idx(), 20);
        assert_eq!(out.result.len(), 23);
        assert_eq!(out.report.new_count, 3);
        assert_eq!(out.report.outliers.len(), 1);
        assert_eq!(out.report.outliers[0].index, 21);
    }

    #[test]
    fn insufficient_data_aborts_with_exit_code_3() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_series(&cfg.history_path, 1, &[1.0; 10]);
        write_series(&cfg.new_data_path, 11, &[1.0; 10]);

        let err = run_detect(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("insufficient data"));
    }

    #[test]
    fn blank_amount_is_reported_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_series(&cfg.history_path, 1, &[1.0; 20]);
        std::fs::write(&cfg.new_data_path, "交易日期,总成交额(万元)\n20250121,1\n20250122,\n").unwrap();

        let err = run_detect(&cfg).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("position 21"));
    }
}
