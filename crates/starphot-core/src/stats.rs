//! Sigma-clipped statistics.
//!
//! Values farther than `sigma` standard deviations from the median are
//! rejected, and the statistics recomputed, until nothing more is rejected or
//! the iteration limit is hit. Used for sky backgrounds and tracking
//! thresholds where hot pixels, cosmic rays and the star itself must not bias
//! the estimate.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CLIP_ITERATIONS, DEFAULT_CLIP_SIGMA};

/// Parameters for sigma clipping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SigmaClipParams {
    /// Rejection threshold in standard deviations (default: 3.0).
    pub sigma: f64,
    /// Maximum number of rejection passes (default: 10).
    pub max_iterations: usize,
}

impl Default for SigmaClipParams {
    fn default() -> Self {
        Self {
            sigma: DEFAULT_CLIP_SIGMA,
            max_iterations: DEFAULT_CLIP_ITERATIONS,
        }
    }
}

/// Statistics of the samples that survived clipping.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClippedStats {
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Number of surviving samples.
    pub count: usize,
}

/// Sigma-clipped mean, median and standard deviation.
///
/// Non-finite values are ignored. Returns `None` when no finite value remains.
pub fn sigma_clipped_stats(values: &[f64], params: &SigmaClipParams) -> Option<ClippedStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    // The clip window is symmetric around the median, so the survivors are
    // always a contiguous run of the sorted samples.
    let mut lo = 0usize;
    let mut hi = sorted.len();

    for _ in 0..params.max_iterations {
        let window = &sorted[lo..hi];
        let center = median_of_sorted(window);
        let (_, std) = mean_stddev(window);
        if std < 1e-10 {
            break;
        }

        let low_cut = center - params.sigma * std;
        let high_cut = center + params.sigma * std;
        let new_lo = lo + window.partition_point(|&v| v < low_cut);
        let new_hi = lo + window.partition_point(|&v| v <= high_cut);

        if new_lo == lo && new_hi == hi {
            break;
        }
        if new_lo >= new_hi {
            // Everything rejected: keep the last surviving set.
            break;
        }
        lo = new_lo;
        hi = new_hi;
    }

    let window = &sorted[lo..hi];
    let (mean, std) = mean_stddev(window);
    Some(ClippedStats {
        mean,
        median: median_of_sorted(window),
        std,
        count: window.len(),
    })
}

/// Median of an already sorted, non-empty slice.
pub fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Median of an unsorted slice (NaN-free).
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    median_of_sorted(&sorted)
}

/// Mean and population standard deviation.
pub fn mean_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert!((median(&[3.0, 1.0, 2.0]) - 2.0).abs() < 1e-12);
        assert!((median(&[4.0, 1.0, 3.0, 2.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_mean_stddev_population() {
        let (mean, std) = mean_stddev(&[0.0, 0.0, 1.0, 1.0]);
        assert!((mean - 0.5).abs() < 1e-12);
        assert!((std - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_clipping_rejects_hot_pixel() {
        let mut values: Vec<f64> = (0..100).map(|i| 10.0 + (i % 5) as f64 * 0.1).collect();
        values.push(5000.0);
        let stats = sigma_clipped_stats(&values, &SigmaClipParams::default()).unwrap();
        assert_eq!(stats.count, 100);
        assert!((stats.median - 10.2).abs() < 1e-9);
        assert!(stats.mean < 10.5);
    }

    #[test]
    fn test_constant_values_have_zero_std() {
        let stats = sigma_clipped_stats(&[7.0; 16], &SigmaClipParams::default()).unwrap();
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.median, 7.0);
        assert_eq!(stats.count, 16);
    }

    #[test]
    fn test_empty_and_non_finite() {
        assert!(sigma_clipped_stats(&[], &SigmaClipParams::default()).is_none());
        assert!(sigma_clipped_stats(&[f64::NAN], &SigmaClipParams::default()).is_none());
    }
}
