//! Immutable model specification: active components, priors and sampling
//! counts.
//!
//! A [`ModelSpec`] is created once before sampling and never mutated while a
//! chain runs. It is shared read-only across concurrently running chains.

use alloc::format;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BURN_IN, DEFAULT_EXPECTED_MODEL_SIZE, DEFAULT_INITIAL_STATE_SCALE,
    DEFAULT_ITERATIONS, DEFAULT_OBSERVATION_SAMPLE_SIZE, DEFAULT_OBSERVATION_SD_GUESS,
    DEFAULT_SEED, DEFAULT_SLAB_VARIANCE, DEFAULT_STATE_SAMPLE_SIZE, DEFAULT_STATE_SD_GUESS,
    DEFAULT_THINNING,
};
use crate::error::{SamplerError, SamplerResult};

/// Inverse-gamma prior on a variance: σ² ~ IG(shape, scale).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InverseGammaPrior {
    /// Shape parameter a.
    pub shape: f64,
    /// Scale parameter b.
    pub scale: f64,
    /// Optional upper limit on the standard deviation. Draws are clamped to
    /// `sd_upper_limit²`.
    pub sd_upper_limit: Option<f64>,
}

impl InverseGammaPrior {
    /// Prior from a guess of the standard deviation and a prior sample size:
    /// shape = n/2, scale = n·guess²/2.
    pub fn from_sd_guess(sd_guess: f64, sample_size: f64) -> Self {
        Self {
            shape: sample_size / 2.0,
            scale: sample_size * sd_guess * sd_guess / 2.0,
            sd_upper_limit: None,
        }
    }

    /// Same prior with an upper limit on the sd.
    pub fn with_upper_limit(mut self, sd_upper_limit: f64) -> Self {
        self.sd_upper_limit = Some(sd_upper_limit);
        self
    }

    /// Starting value for the chain: the prior mean when it exists,
    /// otherwise scale/shape.
    pub fn initial_value(&self) -> f64 {
        if self.shape > 1.0 {
            self.scale / (self.shape - 1.0)
        } else {
            self.scale / self.shape
        }
    }

    fn validate(&self, name: &str) -> SamplerResult<()> {
        if !(self.shape > 0.0 && self.shape.is_finite()) {
            return Err(SamplerError::invalid(format!(
                "{name} prior shape must be positive and finite, got {}",
                self.shape
            )));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(SamplerError::invalid(format!(
                "{name} prior scale must be positive and finite, got {}",
                self.scale
            )));
        }
        if let Some(limit) = self.sd_upper_limit {
            if !(limit > 0.0) {
                return Err(SamplerError::invalid(format!(
                    "{name} sd upper limit must be positive, got {limit}"
                )));
            }
        }
        Ok(())
    }
}

/// Priors on every variance component plus the initial-state scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priors {
    /// Observation noise prior.
    pub observation: InverseGammaPrior,
    /// Level innovation prior.
    pub level: InverseGammaPrior,
    /// Trend innovation prior.
    pub trend: InverseGammaPrior,
    /// Seasonal innovation prior.
    pub seasonal: InverseGammaPrior,
    /// Initial-state variance as a multiple of the pre-period variance.
    pub initial_state_scale: f64,
}

impl Default for Priors {
    fn default() -> Self {
        let state = InverseGammaPrior::from_sd_guess(DEFAULT_STATE_SD_GUESS, DEFAULT_STATE_SAMPLE_SIZE);
        Self {
            observation: InverseGammaPrior::from_sd_guess(
                DEFAULT_OBSERVATION_SD_GUESS,
                DEFAULT_OBSERVATION_SAMPLE_SIZE,
            ),
            level: state,
            trend: state,
            seasonal: state,
            initial_state_scale: DEFAULT_INITIAL_STATE_SCALE,
        }
    }
}

/// How the spike-and-slab sampler couples inclusion indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Coupling {
    /// Stochastic search over indicators using the coefficient-integrated
    /// marginal likelihood, then one joint coefficient draw.
    #[default]
    Joint,
    /// Single-site conjugate update of each column against the partial
    /// residual of the others.
    Independent,
}

/// Spike-and-slab prior over the control columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionPrior {
    /// Prior inclusion probability per control column.
    pub prior_inclusion: Vec<f64>,
    /// Slab variance of an included coefficient.
    pub slab_variance: f64,
    /// Upper bound on the number of simultaneously included columns.
    pub max_model_size: Option<usize>,
    /// Indicator coupling.
    pub coupling: Coupling,
}

impl RegressionPrior {
    /// Uniform inclusion probability `expected_model_size / n_controls`.
    pub fn with_expected_model_size(n_controls: usize, expected_model_size: f64) -> Self {
        let pi = if n_controls == 0 {
            0.0
        } else {
            (expected_model_size / n_controls as f64).clamp(0.0, 1.0)
        };
        Self {
            prior_inclusion: alloc::vec![pi; n_controls],
            slab_variance: DEFAULT_SLAB_VARIANCE,
            max_model_size: None,
            coupling: Coupling::default(),
        }
    }

    /// Default prior for `n_controls` columns (expected model size 1).
    pub fn new(n_controls: usize) -> Self {
        Self::with_expected_model_size(n_controls, DEFAULT_EXPECTED_MODEL_SIZE)
    }

    /// Number of control columns this prior covers.
    pub fn n_controls(&self) -> usize {
        self.prior_inclusion.len()
    }

    fn validate(&self, n_controls: usize) -> SamplerResult<()> {
        if self.prior_inclusion.len() != n_controls {
            return Err(SamplerError::invalid(format!(
                "regression prior covers {} controls but design has {n_controls}",
                self.prior_inclusion.len()
            )));
        }
        if n_controls == 0 {
            return Err(SamplerError::invalid(
                "regression component requires at least one control column",
            ));
        }
        if let Some(j) = self
            .prior_inclusion
            .iter()
            .position(|p| !(0.0..=1.0).contains(p))
        {
            return Err(SamplerError::invalid(format!(
                "prior inclusion probability of control {j} must be in [0, 1], got {}",
                self.prior_inclusion[j]
            )));
        }
        if !(self.slab_variance > 0.0 && self.slab_variance.is_finite()) {
            return Err(SamplerError::invalid(format!(
                "slab variance must be positive and finite, got {}",
                self.slab_variance
            )));
        }
        Ok(())
    }
}

/// Iteration counts and base seed of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Total Gibbs iterations, burn-in included.
    pub iterations: usize,
    /// Leading iterations whose draws are discarded.
    pub burn_in: usize,
    /// Keep every k-th post-burn-in draw.
    pub thinning: usize,
    /// Base RNG seed. Chain `i` runs with `counter_rng_seed(seed, i)`.
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            burn_in: DEFAULT_BURN_IN,
            thinning: DEFAULT_THINNING,
            seed: DEFAULT_SEED,
        }
    }
}

impl SamplingConfig {
    /// Number of draws that will be retained by a complete run.
    pub fn retained(&self) -> usize {
        if self.iterations <= self.burn_in || self.thinning == 0 {
            return 0;
        }
        (self.iterations - self.burn_in).div_ceil(self.thinning)
    }

    /// Whether the draw of iteration `index` is kept.
    pub fn keeps(&self, index: usize) -> bool {
        index >= self.burn_in && (index - self.burn_in) % self.thinning == 0
    }
}

/// Immutable model specification.
///
/// Fixes which components are active (level, trend, seasonal with period P,
/// regression), the priors, and the sampling counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Local level random walk.
    pub level: bool,
    /// Local trend on top of the level (requires `level`).
    pub trend: bool,
    /// Seasonal period P, if a seasonal component is active.
    pub seasonal_period: Option<usize>,
    /// Spike-and-slab regression over control columns, if active.
    pub regression: Option<RegressionPrior>,
    /// Variance priors.
    pub priors: Priors,
    /// Iteration counts and base seed.
    pub sampling: SamplingConfig,
}

impl ModelSpec {
    /// Specification with no active components. Fails validation until a
    /// component is enabled.
    pub fn empty() -> Self {
        Self {
            level: false,
            trend: false,
            seasonal_period: None,
            regression: None,
            priors: Priors::default(),
            sampling: SamplingConfig::default(),
        }
    }

    /// Local level model with default priors.
    pub fn local_level() -> Self {
        Self {
            level: true,
            ..Self::empty()
        }
    }

    /// Local linear trend model with default priors.
    pub fn local_linear_trend() -> Self {
        Self {
            level: true,
            trend: true,
            ..Self::empty()
        }
    }

    /// Enable a seasonal component with period `period`.
    pub fn with_seasonal(mut self, period: usize) -> Self {
        self.seasonal_period = Some(period);
        self
    }

    /// Enable spike-and-slab regression.
    pub fn with_regression(mut self, prior: RegressionPrior) -> Self {
        self.regression = Some(prior);
        self
    }

    /// Replace the priors.
    pub fn with_priors(mut self, priors: Priors) -> Self {
        self.priors = priors;
        self
    }

    /// Replace the sampling counts.
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Whether any component is active.
    pub fn has_components(&self) -> bool {
        self.level || self.trend || self.seasonal_period.is_some() || self.regression.is_some()
    }

    /// Validate the specification against a design with `n_controls` columns.
    pub fn validate(&self, n_controls: usize) -> SamplerResult<()> {
        if !self.has_components() {
            return Err(SamplerError::invalid(
                "model has no active components (level, trend, seasonal or regression)",
            ));
        }
        if self.trend && !self.level {
            return Err(SamplerError::invalid("trend component requires the level component"));
        }
        if let Some(period) = self.seasonal_period {
            if period < 2 {
                return Err(SamplerError::invalid(format!(
                    "seasonal period must be at least 2, got {period}"
                )));
            }
        }
        match &self.regression {
            Some(prior) => prior.validate(n_controls)?,
            None if n_controls > 0 => {
                return Err(SamplerError::invalid(format!(
                    "{n_controls} control columns supplied but regression is disabled"
                )));
            }
            None => {}
        }

        self.priors.observation.validate("observation")?;
        if self.level {
            self.priors.level.validate("level")?;
        }
        if self.trend {
            self.priors.trend.validate("trend")?;
        }
        if self.seasonal_period.is_some() {
            self.priors.seasonal.validate("seasonal")?;
        }
        if !(self.priors.initial_state_scale > 0.0 && self.priors.initial_state_scale.is_finite()) {
            return Err(SamplerError::invalid(format!(
                "initial state scale must be positive and finite, got {}",
                self.priors.initial_state_scale
            )));
        }

        let sampling = &self.sampling;
        if sampling.iterations == 0 {
            return Err(SamplerError::invalid("iteration count must be positive"));
        }
        if sampling.thinning == 0 {
            return Err(SamplerError::invalid("thinning interval must be positive"));
        }
        if sampling.burn_in >= sampling.iterations {
            return Err(SamplerError::invalid(format!(
                "burn-in ({}) must be smaller than the iteration count ({})",
                sampling.burn_in, sampling.iterations
            )));
        }
        Ok(())
    }
}
