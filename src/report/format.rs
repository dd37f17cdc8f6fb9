//! Formatted terminal output for a detection run.
//!
//! We keep formatting code in one place so output changes stay localized and
//! the detector itself never prints.

use crate::detect::DetectionResult;
use crate::domain::Series;
use crate::report::NewDataReport;

/// Format the full run report: new-portion results, outlier details, summary.
pub fn format_report(series: &Series, result: &DetectionResult, report: &NewDataReport) -> String {
    let mut out = String::new();

    out.push_str("=== Lagged rolling MAD detection (new data) ===\n");
    out.push_str(&format!("New data days: {}\n", report.new_count));
    out.push_str(&format!("Outliers detected: {}\n", report.outlier_count));
    out.push_str(&format!("Outlier share: {:.2}%\n", report.outlier_ratio() * 100.0));

    out.push_str("\nOutlier details:\n");
    if report.outliers.is_empty() {
        out.push_str("  no outliers\n");
    } else {
        out.push_str(&format!("  {:>6}  {:<10}  {:>16}  {:>14}\n", "index", "date", "amount(10k CNY)", "z-score"));
        for o in &report.outliers {
            out.push_str(&format!(
                "  {:>6}  {:<10}  {:>16.2}  {:>14}\n",
                o.index,
                o.date.format("%Y%m%d"),
                o.value,
                fmt_z(o.z_score)
            ));
        }
    }

    out.push_str(&format_summary(series, result));
    out
}

/// Run parameters and the history/new boundary.
pub fn format_summary(series: &Series, result: &DetectionResult) -> String {
    let mut out = String::new();
    let history = series.history();
    let new = series.new_portion();

    out.push_str("\n=== Summary ===\n");
    out.push_str(&format!("History days: {}\n", history.len()));
    out.push_str(&format!("New data days: {}\n", new.len()));
    out.push_str(&format!("Total days: {}\n", series.len()));
    out.push_str(&format!("First scored index: {}\n", result.config.window));
    out.push_str(&format!("New data start index: {}\n", series.new_data_start_idx()));
    out.push_str(&format!("Window: {} days\n", result.config.window));
    out.push_str(&format!("Threshold: {}\n", result.config.threshold));

    if let (Some(last), Some(first)) = (history.last(), new.first()) {
        out.push_str(&format!(
            "Boundary: last history date {} | first new date {}\n",
            last.date.format("%Y%m%d"),
            first.date.format("%Y%m%d")
        ));
        if first.date <= last.date {
            out.push_str("Warning: new data does not start after the history window.\n");
        }
    }

    out
}

/// Flat-window scores are astronomically large; switch to scientific notation.
fn fmt_z(z: f64) -> String {
    if z.abs() >= 1e6 { format!("{z:.3e}") } else { format!("{z:.4}") }
}
