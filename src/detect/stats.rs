//! Robust location/scale statistics over small windows.

/// Median of `values`, sorting them in place.
///
/// Even-length inputs return the mean of the two middle values.
/// Returns `None` for an empty slice.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Median of `values` without touching the input.
pub fn median(values: &[f64]) -> Option<f64> {
    let mut scratch = values.to_vec();
    median_mut(&mut scratch)
}

/// Median and median absolute deviation of `window`.
///
/// `scratch` is overwritten; passing the same buffer across calls avoids
/// reallocating once per window.
pub fn median_and_mad(window: &[f64], scratch: &mut Vec<f64>) -> Option<(f64, f64)> {
    scratch.clear();
    scratch.extend_from_slice(window);
    let median = median_mut(scratch)?;

    for v in scratch.iter_mut() {
        *v = (*v - median).abs();
    }
    let mad = median_mut(scratch)?;
    Some((median, mad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn median_does_not_reorder_input() {
        let values = [5.0, 1.0, 4.0];
        let _ = median(&values);
        assert_eq!(values, [5.0, 1.0, 4.0]);
    }

    #[test]
    fn mad_of_one_to_twenty() {
        // median = 10.5; |i - 10.5| = 0.5, 0.5, 1.5, 1.5, ... -> middle pair 4.5 / 5.5.
        let window: Vec<f64> = (1..=20).map(f64::from).collect();
        let mut scratch = Vec::new();
        let (median, mad) = median_and_mad(&window, &mut scratch).unwrap();
        assert!((median - 10.5).abs() < 1e-12);
        assert!((mad - 5.0).abs() < 1e-12);
    }

    #[test]
    fn mad_of_constant_window_is_zero() {
        let mut scratch = Vec::new();
        let (median, mad) = median_and_mad(&[7.0; 5], &mut scratch).unwrap();
        assert_eq!(median, 7.0);
        assert_eq!(mad, 0.0);
    }
}
