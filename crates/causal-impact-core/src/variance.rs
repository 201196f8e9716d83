//! Conjugate inverse-gamma draws for the variance components.
//!
//! With prior σ² ~ IG(a, b) and k Gaussian residuals with sum of squares S,
//! the full conditional is
//!
//! ```text
//! σ² | residuals ~ IG(a + k/2, b + S/2)
//! ```
//!
//! drawn as the reciprocal of a Gamma(a + k/2, rate = b + S/2) precision.
//! Each component only looks at its own residuals, so the draws are
//! independent given the state trajectory. They are taken in a fixed order
//! (observation, then state blocks in state order) so a seeded chain stays
//! reproducible.

use alloc::format;

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::constants::VARIANCE_FLOOR;
use crate::error::{SamplerError, SamplerResult};
use crate::math;
use crate::model::{ComponentKind, InverseGammaPrior, Priors, StateSpaceModel, Variances};
use crate::types::{Matrix, Observation};

/// Residual count and sum of squares for one component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualSums {
    /// Component the residuals belong to.
    pub component: ComponentKind,
    /// Number of residual terms k.
    pub count: usize,
    /// Sum of squared residuals S.
    pub sum_sq: f64,
}

/// Prior for a variance component.
pub fn prior_for(priors: &Priors, kind: ComponentKind) -> Option<&InverseGammaPrior> {
    match kind {
        ComponentKind::Observation => Some(&priors.observation),
        ComponentKind::Level => Some(&priors.level),
        ComponentKind::Trend => Some(&priors.trend),
        ComponentKind::Seasonal => Some(&priors.seasonal),
        ComponentKind::Regression => None,
    }
}

/// Draw σ² from IG(a + k/2, b + S/2), clamped to
/// `[VARIANCE_FLOOR, sd_upper_limit²]`.
pub fn draw_inverse_gamma<R: Rng>(
    prior: &InverseGammaPrior,
    sums: &ResidualSums,
    rng: &mut R,
) -> SamplerResult<f64> {
    let shape = prior.shape + sums.count as f64 / 2.0;
    let rate = prior.scale + sums.sum_sq / 2.0;

    // rand_distr uses shape-scale, so scale = 1/rate
    let gamma = Gamma::new(shape, 1.0 / rate).map_err(|e| SamplerError::NumericalInstability {
        time: 0,
        component: sums.component,
        iteration: None,
        detail: format!("inverse-gamma posterior (shape {shape}, rate {rate}) is invalid: {e}"),
    })?;
    let precision: f64 = gamma.sample(rng);

    let mut variance = 1.0 / precision;
    if let Some(limit) = prior.sd_upper_limit {
        variance = variance.min(math::sq(limit));
    }
    if !variance.is_finite() {
        return Err(SamplerError::NumericalInstability {
            time: 0,
            component: sums.component,
            iteration: None,
            detail: format!("variance draw {variance} from precision {precision:e}"),
        });
    }
    Ok(variance.max(VARIANCE_FLOOR))
}

/// Observation residuals yₜ − offsetₜ − Zᵀαₜ over the observed steps.
pub fn observation_residuals(
    model: &StateSpaceModel,
    observations: &[Observation],
    offsets: &[f64],
    states: &Matrix,
) -> ResidualSums {
    let z = model.loading();
    let mut sums = ResidualSums {
        component: ComponentKind::Observation,
        count: 0,
        sum_sq: 0.0,
    };
    for (t, obs) in observations.iter().enumerate() {
        if let Some(y) = obs {
            let fitted = if model.state_dim() == 0 {
                0.0
            } else {
                z.dot(&states.column(t))
            };
            sums.count += 1;
            sums.sum_sq += math::sq(y - offsets[t] - fitted);
        }
    }
    sums
}

/// State innovations αₜ₊₁ − Tαₜ at each block's noise index.
pub fn state_residuals(model: &StateSpaceModel, states: &Matrix) -> alloc::vec::Vec<ResidualSums> {
    let n = states.ncols();
    let transition = model.transition();
    let mut sums: alloc::vec::Vec<ResidualSums> = model
        .blocks()
        .iter()
        .map(|b| ResidualSums {
            component: b.kind,
            count: n.saturating_sub(1),
            sum_sq: 0.0,
        })
        .collect();

    for t in 0..n.saturating_sub(1) {
        let predicted = transition * states.column(t);
        for (block, acc) in model.blocks().iter().zip(sums.iter_mut()) {
            let i = block.noise_index;
            acc.sum_sq += math::sq(states[(i, t + 1)] - predicted[i]);
        }
    }
    sums
}

/// Draw every active variance component given the current trajectory.
///
/// # Arguments
/// * `observations` - Fitting observations (post-period already excluded)
/// * `offsets` - Regression contribution per fitting step
/// * `states` - Drawn trajectory, one column per fitting step
pub fn draw_variances<R: Rng>(
    model: &StateSpaceModel,
    priors: &Priors,
    observations: &[Observation],
    offsets: &[f64],
    states: &Matrix,
    rng: &mut R,
) -> SamplerResult<Variances> {
    let obs_sums = observation_residuals(model, observations, offsets, states);
    let mut variances = Variances {
        observation: draw_inverse_gamma(&priors.observation, &obs_sums, rng)?,
        level: None,
        trend: None,
        seasonal: None,
    };

    for sums in state_residuals(model, states) {
        if let Some(prior) = prior_for(priors, sums.component) {
            let value = draw_inverse_gamma(prior, &sums, rng)?;
            variances.set(sums.component, value);
        }
    }
    Ok(variances)
}

/// Starting variances: prior means (or scale/shape when the mean is
/// undefined) for every active component.
pub fn initial_variances(model: &StateSpaceModel, priors: &Priors) -> Variances {
    let mut variances = Variances {
        observation: priors.observation.initial_value(),
        level: None,
        trend: None,
        seasonal: None,
    };
    for block in model.blocks() {
        if let Some(prior) = prior_for(priors, block.kind) {
            variances.set(block.kind, prior.initial_value());
        }
    }
    variances
}
