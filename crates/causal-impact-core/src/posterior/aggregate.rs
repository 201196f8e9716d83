//! Counterfactual predictions and effect summaries from retained draws.
//!
//! For every retained draw the counterfactual over the whole series is:
//!
//! - pre-period: the drawn state's structural contribution plus the draw's
//!   regression contribution
//! - after the pre-period: the last pre-period state carried forward
//!   through the transition, plus regression on that step's controls
//!
//! In [`PredictionMode::Sampled`] the forward path also receives state
//! innovations and observation noise from the draw's variances, giving
//! posterior-predictive draws. [`PredictionMode::Projected`] keeps the mean
//! projection. The intervention effect never enters the counterfactual.
//!
//! Pointwise effect = observed − counterfactual. The cumulative effect is the
//! running sum of pointwise effects from the start of the post-period; steps
//! with an absent observation add nothing and carry the sum forward.

use alloc::format;
use alloc::vec::Vec;

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::constants::{DEFAULT_ALPHA, DEFAULT_SEED};
use crate::error::{SamplerError, SamplerResult};
use crate::gibbs::{counter_rng_seed, DrawSet, ParameterDraw};
use crate::math;
use crate::model::{ComponentKind, ModelSpec, StateSpaceModel};
use crate::series::SeriesData;
use crate::statistics::PointSummary;
use crate::types::Vector;

/// How post-period states are carried forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PredictionMode {
    /// Posterior-predictive draws: state innovations and observation noise
    /// are simulated with each draw's variances.
    #[default]
    Sampled,
    /// Mean projection of the last pre-period state, no noise.
    Projected,
}

/// Affine map from the model scale back to the response scale:
/// `y = location + scale · y_model`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseScale {
    /// Additive offset.
    pub location: f64,
    /// Multiplicative scale (positive).
    pub scale: f64,
}

impl ResponseScale {
    /// No transformation.
    pub const IDENTITY: Self = Self {
        location: 0.0,
        scale: 1.0,
    };

    /// Map a model-scale value to the response scale.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.location + self.scale * value
    }
}

impl Default for ResponseScale {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Options for [`summarize`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    /// Two-sided interval level; intervals span [α/2, 1 − α/2].
    pub alpha: f64,
    /// How states are carried past the pre-period.
    pub mode: PredictionMode,
    /// Seed of the prediction noise in [`PredictionMode::Sampled`].
    pub seed: u64,
    /// Summarize a cancelled or failed draw set instead of refusing it.
    pub allow_incomplete: bool,
    /// Back-transform applied to counterfactuals and observations.
    pub scale: ResponseScale,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            mode: PredictionMode::default(),
            seed: DEFAULT_SEED,
            allow_incomplete: false,
            scale: ResponseScale::IDENTITY,
        }
    }
}

impl AggregateOptions {
    fn validate(&self) -> SamplerResult<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(SamplerError::invalid(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.scale.scale > 0.0 && self.scale.scale.is_finite()) || !self.scale.location.is_finite() {
            return Err(SamplerError::invalid(format!(
                "response scale must be finite with positive scale, got {:?}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// Summaries at one time step, on the response scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStepSummary {
    /// Time index.
    pub time: usize,
    /// Observed value, if present.
    pub observed: Option<f64>,
    /// Counterfactual prediction.
    pub counterfactual: PointSummary,
    /// Pointwise effect, where an observation is present.
    pub effect: Option<PointSummary>,
    /// Cumulative effect since the start of the post-period.
    pub cumulative_effect: Option<PointSummary>,
}

/// Totals over the observed post-period steps, on the response scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodTotals {
    /// Observed post-period steps included.
    pub n_steps: usize,
    /// Average observed value.
    pub actual_average: f64,
    /// Sum of observed values.
    pub actual_cumulative: f64,
    /// Average counterfactual.
    pub predicted_average: PointSummary,
    /// Sum of counterfactuals.
    pub predicted_cumulative: PointSummary,
    /// Average pointwise effect.
    pub effect_average: PointSummary,
    /// Sum of pointwise effects.
    pub effect_cumulative: PointSummary,
    /// Cumulative effect relative to the cumulative counterfactual.
    pub relative_effect: Option<PointSummary>,
    /// Posterior tail-area probability of the observed total.
    pub p_value: f64,
    /// 1 − `p_value`.
    pub prob_causal_effect: f64,
}

/// Aggregate over the retained draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Interval level used.
    pub alpha: f64,
    /// Number of draws summarized.
    pub n_draws: usize,
    /// Exclusive end of the pre-period.
    pub pre_end: usize,
    /// First post-period step.
    pub post_start: usize,
    /// Per-time-step summaries for the whole series.
    pub steps: Vec<TimeStepSummary>,
    /// Post-period totals, if the post-period has observations.
    pub post_period: Option<PeriodTotals>,
}

impl PosteriorSummary {
    /// Summaries of the post-period steps.
    pub fn post_steps(&self) -> &[TimeStepSummary] {
        &self.steps[self.post_start..]
    }
}

/// Counterfactual path of one draw over the whole series, on the model scale.
pub fn counterfactual_path(
    model: &StateSpaceModel,
    data: &SeriesData,
    draw: &ParameterDraw,
    mode: PredictionMode,
    seed: u64,
) -> Vec<f64> {
    let n = data.len();
    let pre_end = data.pre_end();
    let m = model.state_dim();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let sampled = mode == PredictionMode::Sampled;
    let obs_sd = math::sqrt(draw.variances.observation);

    let regression: Vec<f64> = match (&draw.regression, data.controls()) {
        (Some(reg), Some(x)) => reg.contributions(x),
        _ => alloc::vec![0.0; n],
    };

    let mut path = Vec::with_capacity(n);
    for t in 0..pre_end {
        let structural = if m == 0 {
            0.0
        } else {
            model.loading().dot(&draw.states.column(t))
        };
        let noise = if sampled {
            obs_sd * rng.sample::<f64, _>(StandardNormal)
        } else {
            0.0
        };
        path.push(structural + regression[t] + noise);
    }

    let state_sds: Vec<(usize, f64)> = model
        .blocks()
        .iter()
        .filter_map(|b| draw.variances.get(b.kind).map(|v| (b.noise_index, math::sqrt(v))))
        .collect();
    let mut state: Vector = if m == 0 {
        Vector::zeros(0)
    } else {
        draw.states.column(pre_end - 1).into_owned()
    };

    for t in pre_end..n {
        state = model.project(&state);
        let mut noise = 0.0;
        if sampled {
            for &(i, sd) in &state_sds {
                state[i] += sd * rng.sample::<f64, _>(StandardNormal);
            }
            noise = obs_sd * rng.sample::<f64, _>(StandardNormal);
        }
        path.push(model.observation_mean(&state) + regression[t] + noise);
    }
    path
}

/// Summarize retained draws into counterfactual and effect distributions.
///
/// Refuses an incomplete draw set with [`SamplerError::IncompleteDraws`]
/// unless `options.allow_incomplete` is set.
pub fn summarize(
    spec: &ModelSpec,
    data: &SeriesData,
    draws: &DrawSet,
    options: &AggregateOptions,
) -> SamplerResult<PosteriorSummary> {
    if !draws.is_complete() && !options.allow_incomplete {
        return Err(SamplerError::IncompleteDraws {
            completed: draws.iterations_completed,
            requested: draws.iterations_requested,
        });
    }
    if draws.is_empty() {
        return Err(SamplerError::invalid("draw set has no retained draws"));
    }
    options.validate()?;

    let model = StateSpaceModel::new(spec)?;
    if let Some(bad) = draws
        .draws
        .iter()
        .find(|d| d.states.nrows() != model.state_dim() || d.states.ncols() != data.pre_end())
    {
        return Err(SamplerError::invalid(format!(
            "draw from iteration {} has a {}x{} trajectory, expected {}x{}",
            bad.iteration,
            bad.states.nrows(),
            bad.states.ncols(),
            model.state_dim(),
            data.pre_end()
        )));
    }

    let n = data.len();
    let post_start = data.post_start();
    let scale = options.scale;
    let observed: Vec<Option<f64>> = data.response().iter().map(|y| y.map(|v| scale.apply(v))).collect();

    // Per draw: counterfactual on the response scale and the running
    // post-period cumulative effect.
    let path_for = |(i, draw): (usize, &ParameterDraw)| -> (Vec<f64>, Vec<f64>) {
        let seed = counter_rng_seed(options.seed, i as u64);
        let cf: Vec<f64> = counterfactual_path(&model, data, draw, options.mode, seed)
            .into_iter()
            .map(|v| scale.apply(v))
            .collect();
        let mut running = 0.0;
        let cumulative: Vec<f64> = (post_start..n)
            .map(|t| {
                if let Some(y) = observed[t] {
                    running += y - cf[t];
                }
                running
            })
            .collect();
        (cf, cumulative)
    };

    #[cfg(feature = "parallel")]
    let paths: Vec<(Vec<f64>, Vec<f64>)> = draws.draws.par_iter().enumerate().map(path_for).collect();

    #[cfg(not(feature = "parallel"))]
    let paths: Vec<(Vec<f64>, Vec<f64>)> = draws.draws.iter().enumerate().map(path_for).collect();

    let alpha = options.alpha;
    let summary_at = |t: usize| -> SamplerResult<TimeStepSummary> {
        let cf: Vec<f64> = paths.iter().map(|(cf, _)| cf[t]).collect();
        let counterfactual = PointSummary::from_draws(&cf, alpha).ok_or_else(|| SamplerError::NumericalInstability {
            time: t,
            component: ComponentKind::Observation,
            iteration: None,
            detail: "no finite counterfactual draw".into(),
        })?;
        let effect = observed[t].and_then(|y| {
            let effects: Vec<f64> = cf.iter().map(|c| y - c).collect();
            PointSummary::from_draws(&effects, alpha)
        });
        let cumulative_effect = if t >= post_start {
            let cums: Vec<f64> = paths.iter().map(|(_, cum)| cum[t - post_start]).collect();
            PointSummary::from_draws(&cums, alpha)
        } else {
            None
        };
        Ok(TimeStepSummary {
            time: t,
            observed: observed[t],
            counterfactual,
            effect,
            cumulative_effect,
        })
    };

    #[cfg(feature = "parallel")]
    let steps: Vec<TimeStepSummary> = (0..n).into_par_iter().map(summary_at).collect::<SamplerResult<_>>()?;

    #[cfg(not(feature = "parallel"))]
    let steps: Vec<TimeStepSummary> = (0..n).map(summary_at).collect::<SamplerResult<_>>()?;

    let post_period = period_totals(&paths, &observed, post_start, alpha);

    Ok(PosteriorSummary {
        alpha,
        n_draws: paths.len(),
        pre_end: data.pre_end(),
        post_start,
        steps,
        post_period,
    })
}

/// Totals over the observed post-period steps.
fn period_totals(
    paths: &[(Vec<f64>, Vec<f64>)],
    observed: &[Option<f64>],
    post_start: usize,
    alpha: f64,
) -> Option<PeriodTotals> {
    let steps: Vec<(usize, f64)> = observed
        .iter()
        .enumerate()
        .skip(post_start)
        .filter_map(|(t, y)| y.map(|v| (t, v)))
        .collect();
    if steps.is_empty() {
        return None;
    }
    let k = steps.len() as f64;
    let actual_cumulative: f64 = steps.iter().map(|&(_, y)| y).sum();

    let predicted: Vec<f64> = paths
        .iter()
        .map(|(cf, _)| steps.iter().map(|&(t, _)| cf[t]).sum())
        .collect();
    let effects: Vec<f64> = predicted.iter().map(|p| actual_cumulative - p).collect();
    let relative: Vec<f64> = predicted
        .iter()
        .zip(&effects)
        .map(|(p, e)| e / p)
        .collect();
    let average = |values: &[f64]| -> Vec<f64> { values.iter().map(|v| v / k).collect() };

    let predicted_cumulative = PointSummary::from_draws(&predicted, alpha)?;
    let effect_cumulative = PointSummary::from_draws(&effects, alpha)?;

    // Observed total counted on both sides keeps p strictly positive.
    let n_draws = predicted.len() as f64;
    let at_or_above = predicted.iter().filter(|&&p| p >= actual_cumulative).count() as f64;
    let at_or_below = predicted.iter().filter(|&&p| p <= actual_cumulative).count() as f64;
    let p_value = ((at_or_above.min(at_or_below) + 1.0) / (n_draws + 1.0)).min(1.0);

    Some(PeriodTotals {
        n_steps: steps.len(),
        actual_average: actual_cumulative / k,
        actual_cumulative,
        predicted_average: PointSummary::from_draws(&average(&predicted), alpha)?,
        predicted_cumulative,
        effect_average: PointSummary::from_draws(&average(&effects), alpha)?,
        effect_cumulative,
        relative_effect: PointSummary::from_draws(&relative, alpha),
        p_value,
        prob_causal_effect: 1.0 - p_value,
    })
}
