//! Descriptive statistics helpers
//!
//! Standard deviations are sample standard deviations (n - 1 denominator).
//! Percentiles use linear interpolation between closest ranks: for a sorted
//! sample of size n the q-th quantile sits at position `(n - 1) * q`.

use crate::types::{DistributionSummary, Moments, Percentiles};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation
///
/// A single value has no spread to estimate; it yields 0.0 instead of NaN.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Quantile of an already sorted slice by linear interpolation
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Mean and standard deviation
pub fn moments(values: &[f64]) -> Option<Moments> {
    Some(Moments {
        mean: mean(values)?,
        std: sample_std(values)?,
    })
}

/// Mean, standard deviation, extremes and quartiles
pub fn summarize(values: &[f64]) -> Option<DistributionSummary> {
    let Moments { mean, std } = moments(values)?;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    Some(DistributionSummary {
        mean,
        std,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        percentiles: Percentiles {
            p25: quantile_sorted(&sorted, 0.25)?,
            p50: quantile_sorted(&sorted, 0.50)?,
            p75: quantile_sorted(&sorted, 0.75)?,
        },
    })
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-12);
        // Sample std: sqrt(32 / 7)
        assert!((sample_std(&values).unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_single_value_std_is_zero() {
        assert_eq!(sample_std(&[3.5]), Some(0.0));
        let m = moments(&[3.5]).unwrap();
        assert_eq!(m.mean, 3.5);
        assert_eq!(m.std, 0.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(mean(&[]).is_none());
        assert!(sample_std(&[]).is_none());
        assert!(summarize(&[]).is_none());
        assert!(quantile_sorted(&[], 0.5).is_none());
    }

    #[test]
    fn test_linear_quantiles() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        // Positions 0.75, 1.5, 2.25
        assert!((quantile_sorted(&sorted, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.50).unwrap() - 2.5).abs() < 1e-12);
        assert!((quantile_sorted(&sorted, 0.75).unwrap() - 3.25).abs() < 1e-12);
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
    }

    #[test]
    fn test_summarize_unsorted_input() {
        let summary = summarize(&[30.0, 10.0, 20.0]).unwrap();
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);
        assert!((summary.mean - 20.0).abs() < 1e-12);
        assert!((summary.percentiles.p50 - 20.0).abs() < 1e-12);
        assert!((summary.percentiles.p25 - 15.0).abs() < 1e-12);
        assert!((summary.percentiles.p75 - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(123.456), 123.46);
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2(100.0), 100.0);
    }
}
