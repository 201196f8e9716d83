//! Input validation, period slicing and standardization.
//!
//! The response may contain `NaN` to mark a missing observation. Controls
//! must be complete over the analyzed window. Periods are inclusive index
//! ranges; everything before the pre-period start and after the
//! post-period end is dropped.

use serde::{Deserialize, Serialize};

use causal_impact_core::{Matrix, ResponseScale, SeriesData};

use crate::error::{ImpactError, ImpactResult};

/// Minimum number of non-missing response values.
pub const MIN_OBSERVATIONS: usize = 3;

/// Mean and population sd of a column over the pre-period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scaler {
    /// Pre-period mean.
    pub mean: f64,
    /// Pre-period population sd (1 for a constant column).
    pub sd: f64,
}

impl Scaler {
    /// Fit on `values`, skipping `NaN`.
    ///
    /// Returns `None` when no value is present.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if present.is_empty() {
            return None;
        }
        let n = present.len() as f64;
        let mean = present.iter().sum::<f64>() / n;
        let sd = (present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
        Some(Self {
            mean,
            sd: if sd > 0.0 { sd } else { 1.0 },
        })
    }

    /// Map a value to the standardized scale.
    #[inline]
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.sd
    }

    /// The back-transform to the original scale.
    pub fn response_scale(&self) -> ResponseScale {
        ResponseScale {
            location: self.mean,
            scale: self.sd,
        }
    }
}

/// Validated response, controls and periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactData {
    response: Vec<f64>,
    controls: Vec<Vec<f64>>,
    pre_period: (usize, usize),
    post_period: (usize, usize),
}

/// Series ready for the inference engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedSeries {
    /// Sliced and possibly standardized series.
    pub series: SeriesData,
    /// Response scaler, when standardized.
    pub response_scaler: Option<Scaler>,
    /// Index of the first kept step in the caller's series.
    pub time_offset: usize,
}

impl PreparedSeries {
    /// Map from the model scale back to the response scale.
    pub fn response_scale(&self) -> ResponseScale {
        self.response_scaler
            .map_or(ResponseScale::IDENTITY, |s| s.response_scale())
    }
}

impl ImpactData {
    /// Validate a response with control columns.
    ///
    /// # Arguments
    /// * `response` - Response values, `NaN` where missing
    /// * `controls` - Control columns, each as long as `response`
    /// * `pre_period` - Inclusive (start, end) of the pre-intervention period
    /// * `post_period` - Inclusive (start, end) of the post-intervention period
    pub fn new(
        response: Vec<f64>,
        controls: Vec<Vec<f64>>,
        pre_period: (usize, usize),
        post_period: (usize, usize),
    ) -> ImpactResult<Self> {
        let n = response.len();
        let (pre_start, pre_end) = pre_period;
        let (post_start, post_end) = post_period;

        if pre_start > pre_end {
            return Err(ImpactError::periods(format!(
                "pre-period start {pre_start} is after its end {pre_end}"
            )));
        }
        if post_start > post_end {
            return Err(ImpactError::periods(format!(
                "post-period start {post_start} is after its end {post_end}"
            )));
        }
        if pre_end >= post_start {
            return Err(ImpactError::periods(format!(
                "post-period must start after the pre-period ends ({post_start} <= {pre_end})"
            )));
        }
        if post_end >= n {
            return Err(ImpactError::periods(format!(
                "post-period end {post_end} is beyond the series ({n} values)"
            )));
        }

        if let Some(index) = response.iter().position(|v| v.is_infinite()) {
            return Err(ImpactError::NonFiniteResponse { index });
        }
        let found = response.iter().filter(|v| !v.is_nan()).count();
        if found < MIN_OBSERVATIONS {
            return Err(ImpactError::TooFewObservations { found });
        }

        for (control, column) in controls.iter().enumerate() {
            if column.len() != n {
                return Err(ImpactError::ControlLength {
                    control,
                    expected: n,
                    found: column.len(),
                });
            }
            if let Some(offset) = column[pre_start..=post_end].iter().position(|v| !v.is_finite()) {
                return Err(ImpactError::MissingControlValue {
                    control,
                    index: pre_start + offset,
                });
            }
        }

        let pre = &response[pre_start..=pre_end];
        let scaler = Scaler::fit(pre).ok_or_else(|| {
            ImpactError::periods("pre-period has no observed response values")
        })?;
        let first = pre.iter().copied().find(|v| !v.is_nan()).unwrap_or(scaler.mean);
        if pre.iter().filter(|v| !v.is_nan()).all(|&v| v == first) {
            return Err(ImpactError::ConstantResponse { value: first });
        }

        Ok(Self {
            response,
            controls,
            pre_period,
            post_period,
        })
    }

    /// Validate a response without controls.
    pub fn univariate(
        response: Vec<f64>,
        pre_period: (usize, usize),
        post_period: (usize, usize),
    ) -> ImpactResult<Self> {
        Self::new(response, Vec::new(), pre_period, post_period)
    }

    /// Response values.
    pub fn response(&self) -> &[f64] {
        &self.response
    }

    /// Control columns.
    pub fn controls(&self) -> &[Vec<f64>] {
        &self.controls
    }

    /// Number of control columns.
    pub fn n_controls(&self) -> usize {
        self.controls.len()
    }

    /// Inclusive pre-period.
    pub fn pre_period(&self) -> (usize, usize) {
        self.pre_period
    }

    /// Inclusive post-period.
    pub fn post_period(&self) -> (usize, usize) {
        self.post_period
    }

    /// Slice to [pre start, post end] and optionally standardize every
    /// column with its pre-period moments.
    pub fn prepare(&self, standardize: bool) -> ImpactResult<PreparedSeries> {
        let (start, pre_end) = self.pre_period;
        let (post_start, end) = self.post_period;
        let window = start..=end;
        let pre = start..=pre_end;

        let response_scaler = if standardize {
            Scaler::fit(&self.response[pre.clone()])
        } else {
            None
        };
        let response = self.response[window]
            .iter()
            .map(|&v| {
                if v.is_nan() {
                    None
                } else {
                    Some(response_scaler.map_or(v, |s| s.transform(v)))
                }
            })
            .collect();

        let controls = if self.controls.is_empty() {
            None
        } else {
            let scalers: Vec<Option<Scaler>> = self
                .controls
                .iter()
                .map(|c| if standardize { Scaler::fit(&c[pre.clone()]) } else { None })
                .collect();
            let len = end - start + 1;
            Some(Matrix::from_fn(len, self.controls.len(), |t, j| {
                let v = self.controls[j][start + t];
                scalers[j].map_or(v, |s| s.transform(v))
            }))
        };

        let series = SeriesData::new(response, controls, pre_end - start + 1, post_start - start)?;
        Ok(PreparedSeries {
            series,
            response_scaler,
            time_offset: start,
        })
    }
}
