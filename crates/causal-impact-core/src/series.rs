//! Observed series, control design and the pre/post split.

use alloc::format;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::error::{SamplerError, SamplerResult};
use crate::model::InitialState;
use crate::types::{Matrix, Observation};

/// Response values and controls aligned on one time index.
///
/// The pre-period is `0..pre_end`; the post-period is `post_start..len`.
/// Steps in `pre_end..post_start` are forecast but belong to neither period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    response: Vec<Observation>,
    controls: Option<Matrix>,
    pre_end: usize,
    post_start: usize,
}

impl SeriesData {
    /// Validate and wrap a series.
    ///
    /// # Arguments
    /// * `response` - One value per time step, `None` where missing
    /// * `controls` - Optional `len × p` design, no missing values
    /// * `pre_end` - Exclusive end of the pre-period
    /// * `post_start` - First post-period step (`len` for no post-period)
    pub fn new(
        response: Vec<Observation>,
        controls: Option<Matrix>,
        pre_end: usize,
        post_start: usize,
    ) -> SamplerResult<Self> {
        let n = response.len();
        if pre_end == 0 {
            return Err(SamplerError::invalid("pre-period is empty"));
        }
        if pre_end > post_start || post_start > n {
            return Err(SamplerError::invalid(format!(
                "split out of range: pre-period ends at {pre_end}, post-period starts at {post_start}, series length {n}"
            )));
        }
        if let Some(t) = response.iter().position(|y| y.is_some_and(|v| !v.is_finite())) {
            return Err(SamplerError::invalid(format!(
                "response value at time {t} is not finite"
            )));
        }
        if response[..pre_end].iter().all(Option::is_none) {
            return Err(SamplerError::invalid("pre-period has no observed response values"));
        }
        if let Some(x) = &controls {
            if x.nrows() != n {
                return Err(SamplerError::invalid(format!(
                    "control design has {} rows but the response has {n} values",
                    x.nrows()
                )));
            }
            if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
                // column-major storage
                let (t, j) = (pos % n, pos / n);
                return Err(SamplerError::invalid(format!(
                    "control {j} has a missing or non-finite value at time {t}"
                )));
            }
        }

        Ok(Self {
            response,
            controls: controls.filter(|x| x.ncols() > 0),
            pre_end,
            post_start,
        })
    }

    /// Series length.
    pub fn len(&self) -> usize {
        self.response.len()
    }

    /// Whether the series has no time steps (never true once constructed).
    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    /// Exclusive end of the pre-period.
    pub fn pre_end(&self) -> usize {
        self.pre_end
    }

    /// First post-period step.
    pub fn post_start(&self) -> usize {
        self.post_start
    }

    /// Number of post-period steps.
    pub fn post_len(&self) -> usize {
        self.len() - self.post_start
    }

    /// All response values.
    pub fn response(&self) -> &[Observation] {
        &self.response
    }

    /// Control design, if any.
    pub fn controls(&self) -> Option<&Matrix> {
        self.controls.as_ref()
    }

    /// Number of control columns.
    pub fn n_controls(&self) -> usize {
        self.controls.as_ref().map_or(0, Matrix::ncols)
    }

    /// Observations the model is fit on: the pre-period only.
    pub fn fitting_observations(&self) -> &[Observation] {
        &self.response[..self.pre_end]
    }

    /// Pre-period steps that carry an observation.
    pub fn observed_pre_indices(&self) -> Vec<usize> {
        self.fitting_observations()
            .iter()
            .enumerate()
            .filter_map(|(t, y)| y.map(|_| t))
            .collect()
    }

    /// Rows of the control design at the observed pre-period steps.
    pub fn pre_design(&self) -> Option<Matrix> {
        let x = self.controls.as_ref()?;
        let rows = self.observed_pre_indices();
        Some(x.select_rows(rows.iter()))
    }

    /// Mean and population variance of the observed pre-period values.
    pub fn pre_moments(&self) -> (f64, f64) {
        let values: Vec<f64> = self.fitting_observations().iter().flatten().copied().collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        (mean, var)
    }

    /// Prior on the first state: level mean at the first observed value,
    /// variance `scale × var(y_pre)` (falling back to `scale` for a
    /// constant pre-period).
    pub fn initial_state(&self, scale: f64) -> InitialState {
        let level_mean = self.fitting_observations().iter().flatten().next().copied().unwrap_or(0.0);
        let (_, var) = self.pre_moments();
        let base = if var > 0.0 { var } else { 1.0 };
        InitialState {
            level_mean,
            variance: scale * base,
        }
    }
}
