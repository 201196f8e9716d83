//! Forward Kalman filter with missing-observation handling.
//!
//! For each time step the filter holds a Gaussian belief N(aₜ, Pₜ) over the
//! state given observations strictly before t, then:
//!
//! 1. If yₜ is present, updates with the innovation vₜ = yₜ − offsetₜ − Zᵀaₜ
//!    and its variance Fₜ = ZᵀPₜZ + σ²_ε. The covariance update uses the
//!    Joseph form (I − KZᵀ)P(I − KZᵀ)ᵀ + σ²_ε KKᵀ, which stays symmetric PSD
//!    under rounding where the subtractive form P − KFKᵀ can go negative.
//! 2. If yₜ is absent, skips the update and only propagates.
//!
//! Post-period values are passed as absent, so they never inform the fit but
//! the filter still produces forecasts over them.

use alloc::format;
use alloc::vec::Vec;

use crate::constants::{LOG_2PI, POSITIVITY_TOLERANCE, PREDICTION_VARIANCE_MIN};
use crate::error::{SamplerError, SamplerResult};
use crate::linalg::{add_diagonal, diagonal_scale, min_diagonal, symmetrize};
use crate::math;
use crate::model::{ComponentKind, InitialState, StateSpaceModel, Variances};
use crate::types::{Matrix, Observation, Vector};

/// One-step prediction error at an observed time step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Innovation {
    /// Prediction error vₜ.
    pub error: f64,
    /// Prediction variance Fₜ.
    pub variance: f64,
}

/// Everything the backward pass and the diagnostics need from one filter run.
#[derive(Debug, Clone)]
pub struct FilterOutput {
    /// Filtered means a_{t|t}.
    pub filtered_means: Vec<Vector>,
    /// Filtered covariances P_{t|t}.
    pub filtered_covs: Vec<Matrix>,
    /// One-step predicted means a_{t|t-1}.
    pub predicted_means: Vec<Vector>,
    /// One-step predicted covariances P_{t|t-1} (jitter included).
    pub predicted_covs: Vec<Matrix>,
    /// Innovation per time step, `None` where the observation was absent.
    pub innovations: Vec<Option<Innovation>>,
    /// Prediction-error decomposition of the log likelihood.
    pub log_likelihood: f64,
    /// Diagonal jitter applied to every predicted covariance.
    pub jitter: f64,
}

impl FilterOutput {
    fn with_capacity(n: usize, jitter: f64) -> Self {
        Self {
            filtered_means: Vec::with_capacity(n),
            filtered_covs: Vec::with_capacity(n),
            predicted_means: Vec::with_capacity(n),
            predicted_covs: Vec::with_capacity(n),
            innovations: Vec::with_capacity(n),
            log_likelihood: 0.0,
            jitter,
        }
    }

    /// Number of filtered time steps.
    pub fn len(&self) -> usize {
        self.filtered_means.len()
    }

    /// Whether no time step was filtered.
    pub fn is_empty(&self) -> bool {
        self.filtered_means.is_empty()
    }

    /// Number of time steps that carried an observation.
    pub fn n_observed(&self) -> usize {
        self.innovations.iter().filter(|i| i.is_some()).count()
    }
}

/// Reject a predicted covariance whose diagonal went negative beyond
/// tolerance, naming the component that owns the offending element.
pub(crate) fn check_positive_diagonal(
    model: &StateSpaceModel,
    cov: &Matrix,
    time: usize,
    what: &str,
) -> SamplerResult<()> {
    let Some((index, value)) = min_diagonal(cov) else {
        return Ok(());
    };
    let tolerance = POSITIVITY_TOLERANCE * diagonal_scale(cov);
    if value < -tolerance || !value.is_finite() {
        return Err(SamplerError::NumericalInstability {
            time,
            component: model.component_at(index),
            iteration: None,
            detail: format!("{what} variance {value:e} at state index {index}"),
        });
    }
    Ok(())
}

/// Run the forward filter over the whole series.
///
/// # Arguments
/// * `observations` - Response per time step; `None` marks an absent value
/// * `offsets` - Known contribution to subtract before filtering (xₜᵀβ)
/// * `variances` - Current variance components
/// * `init` - Prior on the first state
/// * `jitter` - Diagonal jitter added to each predicted covariance and
///   prediction variance (0 on a first attempt)
pub fn forward_filter(
    model: &StateSpaceModel,
    observations: &[Observation],
    offsets: &[f64],
    variances: &Variances,
    init: &InitialState,
    jitter: f64,
) -> SamplerResult<FilterOutput> {
    let n = observations.len();
    if offsets.len() != n {
        return Err(SamplerError::invalid(format!(
            "offset length {} does not match series length {n}",
            offsets.len()
        )));
    }

    let m = model.state_dim();
    let transition = model.transition();
    let z = model.loading();
    let q = model.state_noise(variances);
    let h = variances.observation;
    let identity = Matrix::identity(m, m);

    let (mut a, mut p) = model.initial_distribution(init);
    let mut out = FilterOutput::with_capacity(n, jitter);

    for t in 0..n {
        add_diagonal(&mut p, jitter);
        check_positive_diagonal(model, &p, t, "predicted")?;

        let (a_filtered, p_filtered, innovation) = match observations[t] {
            Some(y) => {
                let pz = &p * z;
                let f = z.dot(&pz) + h + jitter;
                if !(f > PREDICTION_VARIANCE_MIN) || !f.is_finite() {
                    return Err(SamplerError::NumericalInstability {
                        time: t,
                        component: ComponentKind::Observation,
                        iteration: None,
                        detail: format!("prediction variance {f:e}"),
                    });
                }
                let v = y - offsets[t] - z.dot(&a);
                let gain = pz / f;

                let a_f = &a + &gain * v;
                let i_kz = &identity - &gain * z.transpose();
                let mut p_f = &i_kz * &p * i_kz.transpose() + (&gain * gain.transpose()) * h;
                symmetrize(&mut p_f);

                out.log_likelihood += -0.5 * (LOG_2PI + math::ln(f) + v * v / f);
                (a_f, p_f, Some(Innovation { error: v, variance: f }))
            }
            None => (a.clone(), p.clone(), None),
        };

        let a_next = transition * &a_filtered;
        let mut p_next = transition * &p_filtered * transition.transpose() + &q;
        symmetrize(&mut p_next);

        out.predicted_means.push(core::mem::replace(&mut a, a_next));
        out.predicted_covs.push(core::mem::replace(&mut p, p_next));
        out.filtered_means.push(a_filtered);
        out.filtered_covs.push(p_filtered);
        out.innovations.push(innovation);
    }

    Ok(out)
}

/// Recompute the one-step-ahead predictive log likelihood from stored
/// predictions, independently of the accumulation done while filtering.
///
/// Used to cross-check a filter run: the value must equal
/// [`FilterOutput::log_likelihood`] up to rounding.
pub fn predictive_log_likelihood(
    model: &StateSpaceModel,
    observations: &[Observation],
    offsets: &[f64],
    variances: &Variances,
    output: &FilterOutput,
) -> f64 {
    let z = model.loading();
    observations
        .iter()
        .zip(offsets)
        .enumerate()
        .filter_map(|(t, (obs, offset))| obs.map(|y| (t, y - offset)))
        .map(|(t, y)| {
            let mean = z.dot(&output.predicted_means[t]);
            let var = z.dot(&(&output.predicted_covs[t] * z)) + variances.observation + output.jitter;
            let resid = y - mean;
            -0.5 * (LOG_2PI + math::ln(var) + resid * resid / var)
        })
        .sum()
}
