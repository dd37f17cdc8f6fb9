//! Lagged rolling MAD (median absolute deviation) detector.
//!
//! For every position `t >= k` the robust z-score is
//!
//! ```text
//! z_t = 0.6745 * (x_t - median(W_t)) / MAD(W_t),   W_t = x[t-k .. t-1]
//! ```
//!
//! The window holds only the `k` observations strictly before `t`, so a point
//! never influences its own judgment. Positions `t < k` are not scored.
//!
//! A perfectly flat window has `MAD = 0`; it is floored to `1e-8`, which makes
//! any deviation from the flat level an (extreme) outlier.

use rayon::prelude::*;

use crate::detect::stats::median_and_mad;
use crate::domain::Series;
use crate::error::DetectError;

/// Scale making MAD a consistent estimator of the standard deviation under normality.
pub const MAD_SCALE: f64 = 0.6745;

/// Substitute for a zero MAD.
pub const MAD_FLOOR: f64 = 1e-8;

pub const DEFAULT_WINDOW: usize = 20;
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Detector parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectConfig {
    /// Lagged window size `k`.
    pub window: usize,
    /// A point is an outlier when `|z| > threshold`.
    pub threshold: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl DetectConfig {
    pub fn new(window: usize, threshold: f64) -> Self {
        Self { window, threshold }
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if self.window < 1 {
            return Err(DetectError::InvalidParameter(format!(
                "window must be >= 1 (got {})",
                self.window
            )));
        }
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(DetectError::InvalidParameter(format!(
                "threshold must be finite and > 0 (got {})",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Detection output for one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionPoint {
    /// `None` for positions without a full lagged window.
    pub z_score: Option<f64>,
    pub is_outlier: bool,
}

impl DetectionPoint {
    pub const NOT_COMPUTED: DetectionPoint = DetectionPoint {
        z_score: None,
        is_outlier: false,
    };

    pub fn is_computed(&self) -> bool {
        self.z_score.is_some()
    }

    /// The z-score with unscored positions reported as `0.0`.
    pub fn z_score_or_zero(&self) -> f64 {
        self.z_score.unwrap_or(0.0)
    }
}

/// Per-position detection output, parallel to the input series.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub config: DetectConfig,
    pub points: Vec<DetectionPoint>,
}

impl DetectionResult {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&DetectionPoint> {
        self.points.get(idx)
    }

    pub fn z_scores_or_zero(&self) -> Vec<f64> {
        self.points.iter().map(DetectionPoint::z_score_or_zero).collect()
    }

    pub fn outlier_flags(&self) -> Vec<bool> {
        self.points.iter().map(|p| p.is_outlier).collect()
    }

    /// Positions flagged as outliers, ascending.
    pub fn outlier_indices(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_outlier)
            .map(|(idx, _)| idx)
            .collect()
    }
}

/// Run the detector sequentially.
pub fn detect(values: &[f64], config: &DetectConfig) -> Result<DetectionResult, DetectError> {
    check_preconditions(values, config)?;

    let mut scratch = Vec::with_capacity(config.window);
    let points = (0..values.len())
        .map(|t| score_at(values, t, config, &mut scratch))
        .collect();

    Ok(DetectionResult {
        config: *config,
        points,
    })
}

/// Run the detector with windows evaluated in parallel.
///
/// Each window depends only on a fixed slice of the input, and collecting an
/// indexed parallel iterator keeps input order, so the result equals [`detect`].
pub fn detect_parallel(values: &[f64], config: &DetectConfig) -> Result<DetectionResult, DetectError> {
    check_preconditions(values, config)?;

    let points = (0..values.len())
        .into_par_iter()
        .map_init(
            || Vec::with_capacity(config.window),
            |scratch, t| score_at(values, t, config, scratch),
        )
        .collect();

    Ok(DetectionResult {
        config: *config,
        points,
    })
}

/// Run the detector over a series' values.
pub fn detect_series(series: &Series, config: &DetectConfig, parallel: bool) -> Result<DetectionResult, DetectError> {
    let values = series.values();
    if parallel {
        detect_parallel(&values, config)
    } else {
        detect(&values, config)
    }
}

/// Robust z-score of `current` against a lagged `window`.
///
/// Returns `None` for an empty window.
pub fn lagged_z_score(window: &[f64], current: f64) -> Option<f64> {
    let mut scratch = Vec::with_capacity(window.len());
    z_score_with(window, current, &mut scratch)
}

fn check_preconditions(values: &[f64], config: &DetectConfig) -> Result<(), DetectError> {
    config.validate()?;

    if values.len() <= config.window {
        return Err(DetectError::InsufficientData {
            len: values.len(),
            window: config.window,
        });
    }

    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(DetectError::InvalidInput { index, value });
    }

    Ok(())
}

fn score_at(values: &[f64], t: usize, config: &DetectConfig, scratch: &mut Vec<f64>) -> DetectionPoint {
    let k = config.window;
    if t < k {
        return DetectionPoint::NOT_COMPUTED;
    }

    match z_score_with(&values[t - k..t], values[t], scratch) {
        Some(z) => DetectionPoint {
            z_score: Some(z),
            is_outlier: z.abs() > config.threshold,
        },
        None => DetectionPoint::NOT_COMPUTED,
    }
}

fn z_score_with(window: &[f64], current: f64, scratch: &mut Vec<f64>) -> Option<f64> {
    let (median, mad) = median_and_mad(window, scratch)?;
    let mad = if mad == 0.0 { MAD_FLOOR } else { mad };
    Some(MAD_SCALE * (current - median) / mad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    fn noisy_series(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(900.0..1100.0)).collect()
    }

    #[test]
    fn too_short_series_is_insufficient_data() {
        let config = DetectConfig::default();
        for n in [0, 1, 19, 20] {
            let err = detect(&vec![1.0; n], &config).unwrap_err();
            assert_eq!(err, DetectError::InsufficientData { len: n, window: 20 });
        }
        assert!(detect(&vec![1.0; 21], &config).is_ok());
    }

    #[test]
    fn output_length_matches_input() {
        let values = noisy_series(57, 1);
        let result = detect(&values, &DetectConfig::default()).unwrap();
        assert_eq!(result.len(), values.len());
    }

    #[test]
    fn first_window_positions_are_not_computed() {
        let values = noisy_series(40, 2);
        let result = detect(&values, &DetectConfig::default()).unwrap();
        for t in 0..20 {
            let p = result.points[t];
            assert_eq!(p, DetectionPoint::NOT_COMPUTED);
            assert_eq!((p.z_score_or_zero(), p.is_outlier), (0.0, false));
        }
        assert!(result.points[20..].iter().all(DetectionPoint::is_computed));
    }

    #[test]
    fn flat_window_with_equal_current_is_zero() {
        let values = vec![5.0; 21];
        let result = detect(&values, &DetectConfig::default()).unwrap();
        assert_eq!(result.points[20].z_score, Some(0.0));
        assert!(!result.points[20].is_outlier);
    }

    #[test]
    fn flat_window_floors_mad() {
        let mut values = vec![10.0; 20];
        values.push(100.0);
        let result = detect(&values, &DetectConfig::new(20, 2.0)).unwrap();

        let z = result.points[20].z_score.unwrap();
        let expected = MAD_SCALE * (100.0 - 10.0) / MAD_FLOOR;
        assert!((z - expected).abs() / expected < 1e-12);
        assert!(z > 1e9);
        assert!(result.points[20].is_outlier);
    }

    #[test]
    fn flat_window_any_deviation_is_outlier() {
        for v in [9.999, 10.001, -3.0, 1e6] {
            let mut values = vec![10.0; 20];
            values.push(v);
            let result = detect(&values, &DetectConfig::default()).unwrap();
            let p = result.points[20];
            assert!(p.is_outlier, "value {v} should be flagged");
            assert_eq!(p.z_score.unwrap().signum(), (v - 10.0).signum());
        }
    }

    #[test]
    fn three_mads_away_scores_three() {
        // Window 1..=20 has median 10.5 and MAD 5.0.
        let mut values: Vec<f64> = (1..=20).map(f64::from).collect();
        values.push(10.5 + 3.0 * 5.0 / MAD_SCALE);
        let result = detect(&values, &DetectConfig::default()).unwrap();

        let z = result.points[20].z_score.unwrap();
        assert!((z - 3.0).abs() < 1e-9, "z = {z}");
        assert!(result.points[20].is_outlier);

        let strict = detect(&values, &DetectConfig::new(20, 3.5)).unwrap();
        assert!(!strict.points[20].is_outlier);
    }

    #[test]
    fn current_point_is_excluded_from_its_window() {
        // With k = 3: position 3 sees [1, 2, 3] only, not the spike itself.
        let values = [1.0, 2.0, 3.0, 1000.0];
        let result = detect(&values, &DetectConfig::new(3, 2.0)).unwrap();
        let expected = lagged_z_score(&[1.0, 2.0, 3.0], 1000.0).unwrap();
        assert_eq!(result.points[3].z_score, Some(expected));
        assert!((expected - MAD_SCALE * 998.0).abs() < 1e-9);
    }

    #[test]
    fn threshold_comparison_is_strict() {
        // Window [1, 2, 3]: median 2, MAD 1 -> z = 0.6745 * (x - 2).
        let x = 2.0 + 1.0 / MAD_SCALE;
        let values = [1.0, 2.0, 3.0, x];
        let z = lagged_z_score(&[1.0, 2.0, 3.0], x).unwrap();
        let at_threshold = detect(&values, &DetectConfig::new(3, z)).unwrap();
        assert!(!at_threshold.points[3].is_outlier);
    }

    #[test]
    fn non_finite_values_are_rejected_with_position() {
        let mut values = noisy_series(30, 3);
        values[12] = f64::NAN;
        values[20] = f64::INFINITY;
        match detect(&values, &DetectConfig::default()) {
            Err(DetectError::InvalidInput { index, .. }) => assert_eq!(index, 12),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let values = noisy_series(30, 4);
        for config in [
            DetectConfig::new(0, 2.0),
            DetectConfig::new(5, 0.0),
            DetectConfig::new(5, -1.0),
            DetectConfig::new(5, f64::NAN),
        ] {
            assert!(matches!(detect(&values, &config), Err(DetectError::InvalidParameter(_))));
        }
    }

    #[test]
    fn parameter_errors_take_precedence_over_length() {
        let err = detect(&[1.0], &DetectConfig::new(0, 2.0)).unwrap_err();
        assert!(matches!(err, DetectError::InvalidParameter(_)));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let values = noisy_series(120, 5);
        let config = DetectConfig::default();
        let a = detect(&values, &config).unwrap();
        let b = detect(&values, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut values = noisy_series(500, 6);
        values[250] = 5000.0;
        values[400] = 10.0;
        let config = DetectConfig::new(15, 2.5);
        let seq = detect(&values, &config).unwrap();
        let par = detect_parallel(&values, &config).unwrap();
        assert_eq!(seq, par);
        assert!(seq.outlier_indices().contains(&250));
        assert!(seq.outlier_indices().contains(&400));
    }

    #[test]
    fn swapping_observations_changes_result() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + ((i * 37) % 11) as f64).collect();
        let config = DetectConfig::default();
        let base = detect(&values, &config).unwrap();

        let mut swapped = values.clone();
        swapped.swap(3, 30);
        assert_ne!(values[3], values[30]);
        let after = detect(&swapped, &config).unwrap();

        assert_ne!(base, after);
        // Position 30 is scored against the same window in both runs, only its value moved.
        let window = &values[10..30];
        assert_eq!(after.points[30].z_score, lagged_z_score(window, values[3]));
        // Positions whose window and value don't touch index 3 or 30 are unchanged.
        assert_eq!(base.points[25], after.points[25]);
    }

    #[test]
    fn input_is_not_mutated() {
        let values = noisy_series(30, 7);
        let copy = values.clone();
        let _ = detect(&values, &DetectConfig::default()).unwrap();
        assert_eq!(values, copy);
    }

    #[test]
    fn detect_series_uses_all_observations() {
        use crate::domain::{Observation, Series};
        use chrono::NaiveDate;

        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let obs = |i: usize, v: f64| Observation::new(start + chrono::Duration::days(i as i64), v);
        let history: Vec<Observation> = (0..20).map(|i| obs(i, 10.0)).collect();
        let new = vec![obs(20, 10.0), obs(21, 100.0)];
        let series = Series::concat(history, new);

        let result = detect_series(&series, &DetectConfig::default(), true).unwrap();
        assert_eq!(result.len(), 22);
        assert_eq!(result.outlier_indices(), vec![21]);
    }
}
