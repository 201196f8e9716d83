//! Spike-and-slab regression over control series.
//!
//! Prior, conditional on the current observation variance σ²:
//!
//! ```text
//! γⱼ ~ Bernoulli(πⱼ)
//! βⱼ | γⱼ = 1 ~ N(0, v)          (slab)
//! βⱼ | γⱼ = 0 = 0                (spike)
//! r  | β, σ² ~ N(Xβ, σ² I)
//! ```
//!
//! where r is the regression target (observation minus structural state) at
//! the usable pre-period time steps. For an included subset γ the posterior
//! precision is Λ_γ = X_γᵀX_γ/σ² + I/v and, with b_γ = X_γᵀr/σ², the
//! coefficient-integrated log marginal likelihood is (up to a constant)
//!
//! ```text
//! log p(r | γ) = −|γ|/2 · log v − ½ log|Λ_γ| + ½ b_γᵀ Λ_γ⁻¹ b_γ
//! ```
//!
//! Columns are visited in a seeded random permutation. A column whose
//! inclusion would exceed the maximum model size is held out of the current
//! draw, which keeps the subset small enough to be identified by the data.

use alloc::format;
use alloc::vec::Vec;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::error::{SamplerError, SamplerResult};
use crate::linalg::{add_diagonal, cholesky_jittered, diagonal_scale, inverse_quadratic_form, log_det, sample_from_precision};
use crate::math;
use crate::model::{Coupling, RegressionPrior};
use crate::types::{Matrix, Vector};

/// Coefficients and inclusion indicators from one regression draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionDraw {
    /// Coefficient per control column (exactly 0 when excluded).
    pub coefficients: Vector,
    /// Inclusion indicator per control column.
    pub included: Vec<bool>,
}

impl RegressionDraw {
    /// All columns excluded.
    pub fn empty(n_controls: usize) -> Self {
        Self {
            coefficients: Vector::zeros(n_controls),
            included: alloc::vec![false; n_controls],
        }
    }

    /// Number of included columns.
    pub fn n_included(&self) -> usize {
        self.included.iter().filter(|&&g| g).count()
    }

    /// Regression contribution xₜᵀβ for every row of `controls`.
    pub fn contributions(&self, controls: &Matrix) -> Vec<f64> {
        if controls.ncols() == 0 {
            return alloc::vec![0.0; controls.nrows()];
        }
        (controls * &self.coefficients).iter().copied().collect()
    }
}

/// Conjugate spike-and-slab sampler over a fixed design.
#[derive(Debug, Clone)]
pub struct SpikeSlabSampler {
    design: Matrix,
    gram: Matrix,
    prior: RegressionPrior,
    max_model_size: usize,
}

fn indices(included: &[bool]) -> Vec<usize> {
    included
        .iter()
        .enumerate()
        .filter_map(|(j, &g)| g.then_some(j))
        .collect()
}

impl SpikeSlabSampler {
    /// Build a sampler for a design with one row per usable observation.
    ///
    /// Fails with [`SamplerError::SingularDesign`] if there are no usable
    /// rows, or if the columns forced in by a prior inclusion probability of
    /// 1 already exceed the maximum model size.
    pub fn new(design: Matrix, prior: &RegressionPrior) -> SamplerResult<Self> {
        let (n, p) = design.shape();
        if n == 0 {
            return Err(SamplerError::singular(
                "no usable pre-period observations for the regression",
            ));
        }
        let max_model_size = prior
            .max_model_size
            .unwrap_or(p)
            .min(n.saturating_sub(1))
            .min(p);
        let forced = prior.prior_inclusion.iter().filter(|&&pi| pi >= 1.0).count();
        if forced > max_model_size {
            return Err(SamplerError::singular(format!(
                "{forced} controls are forced in but at most {max_model_size} can be identified from {n} observations"
            )));
        }

        let gram = design.transpose() * &design;
        Ok(Self {
            design,
            gram,
            prior: prior.clone(),
            max_model_size,
        })
    }

    /// Number of control columns.
    pub fn n_controls(&self) -> usize {
        self.design.ncols()
    }

    /// Number of usable observations.
    pub fn n_rows(&self) -> usize {
        self.design.nrows()
    }

    /// Largest subset that will be included in one draw.
    pub fn max_model_size(&self) -> usize {
        self.max_model_size
    }

    /// Starting point with forced-in columns included at 0.
    pub fn initial_draw(&self) -> RegressionDraw {
        let mut draw = RegressionDraw::empty(self.n_controls());
        for (j, &pi) in self.prior.prior_inclusion.iter().enumerate() {
            draw.included[j] = pi >= 1.0;
        }
        draw
    }

    /// Draw new indicators and coefficients.
    ///
    /// # Arguments
    /// * `target` - Regression target at each usable observation
    /// * `sigma2` - Current observation noise variance
    /// * `current` - Previous draw (starting indicators)
    /// * `jitter` - Relative diagonal jitter for the posterior precision
    pub fn draw<R: Rng>(
        &self,
        target: &Vector,
        sigma2: f64,
        current: &RegressionDraw,
        jitter: f64,
        rng: &mut R,
    ) -> SamplerResult<RegressionDraw> {
        if target.len() != self.n_rows() {
            return Err(SamplerError::invalid(format!(
                "regression target has {} rows, design has {}",
                target.len(),
                self.n_rows()
            )));
        }
        let xtr = self.design.transpose() * target;
        match self.prior.coupling {
            Coupling::Joint => self.draw_joint(&xtr, sigma2, current, jitter, rng),
            Coupling::Independent => self.draw_independent(&xtr, sigma2, current, jitter, rng),
        }
    }

    fn visit_order<R: Rng>(&self, rng: &mut R) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.n_controls()).collect();
        order.shuffle(rng);
        order
    }

    fn precision(&self, subset: &[usize], sigma2: f64, jitter: f64) -> Matrix {
        let k = subset.len();
        let inv_slab = 1.0 / self.prior.slab_variance;
        let mut precision = Matrix::from_fn(k, k, |a, b| self.gram[(subset[a], subset[b])] / sigma2);
        add_diagonal(&mut precision, inv_slab);
        if jitter > 0.0 {
            let scale = diagonal_scale(&precision);
            add_diagonal(&mut precision, jitter * scale);
        }
        precision
    }

    fn log_marginal(&self, subset: &[usize], xtr: &Vector, sigma2: f64, jitter: f64) -> SamplerResult<f64> {
        if subset.is_empty() {
            return Ok(0.0);
        }
        let precision = self.precision(subset, sigma2, jitter);
        let (chol, _) = cholesky_jittered(&precision).ok_or_else(|| {
            SamplerError::singular(format!("posterior precision of controls {subset:?} is not invertible"))
        })?;
        let b = Vector::from_iterator(subset.len(), subset.iter().map(|&j| xtr[j] / sigma2));
        let k = subset.len() as f64;
        Ok(-0.5 * k * math::ln(self.prior.slab_variance) - 0.5 * log_det(&chol)
            + 0.5 * inverse_quadratic_form(&chol, &b))
    }

    fn draw_joint<R: Rng>(
        &self,
        xtr: &Vector,
        sigma2: f64,
        current: &RegressionDraw,
        jitter: f64,
        rng: &mut R,
    ) -> SamplerResult<RegressionDraw> {
        let p = self.n_controls();
        let mut included = current.included.clone();
        for (j, &pi) in self.prior.prior_inclusion.iter().enumerate() {
            if pi >= 1.0 {
                included[j] = true;
            } else if pi <= 0.0 {
                included[j] = false;
            }
        }

        for j in self.visit_order(rng) {
            let pi = self.prior.prior_inclusion[j];
            if pi <= 0.0 || pi >= 1.0 {
                continue;
            }

            included[j] = true;
            if indices(&included).len() > self.max_model_size {
                included[j] = false;
                continue;
            }
            let log_in = self.log_marginal(&indices(&included), xtr, sigma2, jitter)? + math::ln(pi);
            included[j] = false;
            let log_out = self.log_marginal(&indices(&included), xtr, sigma2, jitter)? + math::ln(1.0 - pi);

            let prob = math::logistic(log_in - log_out);
            included[j] = rng.random::<f64>() < prob;
        }

        let subset = indices(&included);
        let precision = self.precision(&subset, sigma2, jitter);
        let b = Vector::from_iterator(subset.len(), subset.iter().map(|&j| xtr[j] / sigma2));
        let beta_subset = sample_from_precision(&precision, &b, rng).ok_or_else(|| {
            SamplerError::singular(format!("posterior precision of controls {subset:?} is not invertible"))
        })?;

        let mut coefficients = Vector::zeros(p);
        for (k, &j) in subset.iter().enumerate() {
            coefficients[j] = beta_subset[k];
        }
        Ok(RegressionDraw {
            coefficients,
            included,
        })
    }

    fn draw_independent<R: Rng>(
        &self,
        xtr: &Vector,
        sigma2: f64,
        current: &RegressionDraw,
        jitter: f64,
        rng: &mut R,
    ) -> SamplerResult<RegressionDraw> {
        let slab = self.prior.slab_variance;
        let mut beta = current.coefficients.clone();
        let mut included = current.included.clone();
        // Xᵀ(r − Xβ), kept current as coefficients change.
        let mut xt_resid = xtr - &self.gram * &beta;
        let mut size = included.iter().filter(|&&g| g).count();

        for j in self.visit_order(rng) {
            let pi = self.prior.prior_inclusion[j];
            let g_jj = self.gram[(j, j)];
            let precision = (g_jj / sigma2 + 1.0 / slab) * (1.0 + jitter);
            if !(precision > 0.0) || !precision.is_finite() {
                return Err(SamplerError::singular(format!(
                    "posterior precision of control {j} is {precision}"
                )));
            }
            let b = (xt_resid[j] + g_jj * beta[j]) / sigma2;

            let include = if pi >= 1.0 {
                true
            } else if pi <= 0.0 || (!included[j] && size >= self.max_model_size) {
                false
            } else {
                let log_bf = -0.5 * math::ln(slab * precision) + 0.5 * b * b / precision;
                let prob = math::logistic(log_bf + math::ln(pi) - math::ln(1.0 - pi));
                rng.random::<f64>() < prob
            };

            let new_beta = if include {
                let z: f64 = rng.sample(StandardNormal);
                b / precision + z / math::sqrt(precision)
            } else {
                0.0
            };

            let delta = new_beta - beta[j];
            if delta != 0.0 {
                xt_resid -= self.gram.column(j) * delta;
            }
            if include != included[j] {
                if include {
                    size += 1;
                } else {
                    size -= 1;
                }
            }
            beta[j] = new_beta;
            included[j] = include;
        }

        Ok(RegressionDraw {
            coefficients: beta,
            included,
        })
    }
}
