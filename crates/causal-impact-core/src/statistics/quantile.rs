//! Quantiles of posterior draws using Type 2 quantiles (inverse empirical CDF
//! with averaging).
//!
//! **Type 2 formula** (for sorted sample x of size n at probability p):
//! ```text
//! h = n * p + 0.5
//! q = (x[floor(h)] + x[ceil(h)]) / 2
//! ```
//!
//! Credible-interval bounds and medians of counterfactual and effect draws
//! all go through this estimator, so intervals from different summaries are
//! directly comparable.
//!
//! # Input Requirements
//!
//! All input data must be finite. In debug builds this is checked via
//! assertions.
//!
//! # Reference
//!
//! Hyndman, R. J. & Fan, Y. (1996). "Sample quantiles in statistical packages."
//! The American Statistician 50(4):361–365.

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::math;

/// 0-based (floor, ceil) indices of the Type 2 quantile at `p`.
#[inline]
fn type2_indices(n: usize, p: f64) -> (usize, usize) {
    let h = n as f64 * p + 0.5;
    let floor_idx = (math::floor(h) as usize).saturating_sub(1).min(n - 1);
    let ceil_idx = (math::ceil(h) as usize).saturating_sub(1).min(n - 1);
    (floor_idx, ceil_idx)
}

#[inline]
fn debug_assert_finite(data: &[f64]) {
    debug_assert!(
        data.iter().all(|x| x.is_finite()),
        "quantile input must be finite (no NaN or infinity)"
    );
}

/// Compute a single quantile from a mutable slice.
///
/// Uses `select_nth_unstable()` for O(n) expected time. The slice is
/// partially reordered as a side effect.
///
/// # Panics
///
/// Panics if `data` is empty or if `p` is outside [0, 1].
pub fn compute_quantile(data: &mut [f64], p: f64) -> f64 {
    assert!(!data.is_empty(), "Cannot compute quantile of empty slice");
    assert!(
        (0.0..=1.0).contains(&p),
        "Quantile probability must be in [0, 1]"
    );
    debug_assert_finite(data);

    let n = data.len();
    if n == 1 {
        return data[0];
    }

    let (floor_idx, ceil_idx) = type2_indices(n, p);
    let cmp = |a: &f64, b: &f64| a.total_cmp(b);

    if floor_idx == ceil_idx {
        let (_, mid, _) = data.select_nth_unstable_by(floor_idx, cmp);
        return *mid;
    }

    let (_, mid, _) = data.select_nth_unstable_by(ceil_idx, cmp);
    let ceil_val = *mid;
    // floor lies in the left partition
    let (_, mid, _) = data[..ceil_idx].select_nth_unstable_by(floor_idx, cmp);
    let floor_val = *mid;

    (floor_val + ceil_val) / 2.0
}

/// Quantile of data already sorted in ascending order.
///
/// # Panics
///
/// Panics if `sorted` is empty.
pub fn compute_quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty(), "Cannot compute quantile of empty slice");
    let (floor_idx, ceil_idx) = type2_indices(sorted.len(), p.clamp(0.0, 1.0));
    (sorted[floor_idx] + sorted[ceil_idx]) / 2.0
}

/// Mean, median, standard deviation and central interval of a set of draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointSummary {
    /// Posterior mean.
    pub mean: f64,
    /// Posterior median.
    pub median: f64,
    /// Posterior standard deviation.
    pub sd: f64,
    /// Lower bound at α/2.
    pub lower: f64,
    /// Upper bound at 1 − α/2.
    pub upper: f64,
}

impl PointSummary {
    /// Summarize draws at two-sided level `alpha`.
    ///
    /// Non-finite values are dropped. Returns `None` if nothing is left.
    pub fn from_draws(draws: &[f64], alpha: f64) -> Option<Self> {
        let mut sorted: Vec<f64> = draws.iter().copied().filter(|x| x.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));
        Some(Self::from_sorted(&sorted, alpha))
    }

    /// Summarize draws that are already sorted and finite.
    pub fn from_sorted(sorted: &[f64], alpha: f64) -> Self {
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let var = if sorted.len() > 1 {
            sorted.iter().map(|&x| math::sq(x - mean)).sum::<f64>() / (n - 1.0)
        } else {
            0.0
        };
        Self {
            mean,
            median: compute_quantile_sorted(sorted, 0.5),
            sd: math::sqrt(var),
            lower: compute_quantile_sorted(sorted, alpha / 2.0),
            upper: compute_quantile_sorted(sorted, 1.0 - alpha / 2.0),
        }
    }

    /// Whether `value` lies inside [lower, upper].
    pub fn covers(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}
