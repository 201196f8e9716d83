//! Backward sampling of a full state trajectory (Carter–Kohn / Frühwirth-
//! Schnatter).
//!
//! Given the forward filter output, the last state is drawn from its filtered
//! distribution N(a_{n|n}, P_{n|n}); each earlier state is then drawn from
//!
//! ```text
//! αₜ | αₜ₊₁, y₁:ₜ ~ N(a_{t|t} + Jₜ(αₜ₊₁ − a_{t+1|t}),  P_{t|t} − Jₜ P_{t+1|t} Jₜᵀ)
//! Jₜ = P_{t|t} Tᵀ P_{t+1|t}⁻¹
//! ```
//!
//! which yields one exact draw from the joint posterior over the trajectory.
//! The recursion runs iteratively over a preallocated `m × n` buffer.

use alloc::format;

use rand::Rng;

use crate::error::{SamplerError, SamplerResult};
use crate::filter::kalman::{forward_filter, FilterOutput};
use crate::linalg::{cholesky_jittered, min_diagonal, sample_gaussian, symmetrize};
use crate::model::{InitialState, StateSpaceModel, Variances};
use crate::types::{Matrix, Observation};

/// One draw of the latent state trajectory.
#[derive(Debug, Clone)]
pub struct StateDraw {
    /// States as columns: `states[(i, t)]` is element i of αₜ.
    pub states: Matrix,
    /// Log likelihood of the observations under the parameters used.
    pub log_likelihood: f64,
}

fn not_psd(model: &StateSpaceModel, cov: &Matrix, time: usize, what: &str) -> SamplerError {
    let (index, value) = min_diagonal(cov).unwrap_or((0, f64::NAN));
    SamplerError::NumericalInstability {
        time,
        component: model.component_at(index),
        iteration: None,
        detail: format!("{what} covariance not positive semi-definite (min diagonal {value:e})"),
    }
}

/// Draw a trajectory from a completed forward pass.
pub fn backward_sample<R: Rng>(
    model: &StateSpaceModel,
    filtered: &FilterOutput,
    rng: &mut R,
) -> SamplerResult<Matrix> {
    let n = filtered.len();
    let m = model.state_dim();
    let mut states = Matrix::zeros(m, n);
    if m == 0 || n == 0 {
        return Ok(states);
    }

    let last = n - 1;
    let alpha = sample_gaussian(&filtered.filtered_means[last], &filtered.filtered_covs[last], rng)
        .ok_or_else(|| not_psd(model, &filtered.filtered_covs[last], last, "filtered"))?;
    states.set_column(last, &alpha);

    let transition = model.transition();
    for t in (0..last).rev() {
        let a_f = &filtered.filtered_means[t];
        let p_f = &filtered.filtered_covs[t];
        let p_next = &filtered.predicted_covs[t + 1];

        let (chol, _) = cholesky_jittered(p_next)
            .ok_or_else(|| not_psd(model, p_next, t + 1, "predicted"))?;

        // Jᵀ = P_{t+1|t}⁻¹ T P_{t|t}
        let tp = transition * p_f;
        let gain_t = chol.solve(&tp);

        let resid = &states.column(t + 1) - &filtered.predicted_means[t + 1];
        let mean = a_f + gain_t.transpose() * resid;
        let mut cov = p_f - tp.transpose() * &gain_t;
        symmetrize(&mut cov);

        let draw = sample_gaussian(&mean, &cov, rng)
            .ok_or_else(|| not_psd(model, &cov, t, "smoothing"))?;
        states.set_column(t, &draw);
    }

    Ok(states)
}

/// Forward-filter then backward-sample one trajectory.
pub fn draw_states<R: Rng>(
    model: &StateSpaceModel,
    observations: &[Observation],
    offsets: &[f64],
    variances: &Variances,
    init: &InitialState,
    jitter: f64,
    rng: &mut R,
) -> SamplerResult<StateDraw> {
    let filtered = forward_filter(model, observations, offsets, variances, init, jitter)?;
    let states = backward_sample(model, &filtered, rng)?;
    Ok(StateDraw {
        states,
        log_likelihood: filtered.log_likelihood,
    })
}
