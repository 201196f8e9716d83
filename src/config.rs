//! Configuration for a causal impact analysis.

use serde::{Deserialize, Serialize};

use causal_impact_core::constants::{
    DEFAULT_ALPHA, DEFAULT_BURN_IN, DEFAULT_EXPECTED_MODEL_SIZE, DEFAULT_INITIAL_STATE_SCALE,
    DEFAULT_ITERATIONS, DEFAULT_OBSERVATION_SAMPLE_SIZE, DEFAULT_OBSERVATION_SD_GUESS, DEFAULT_SEED,
    DEFAULT_SLAB_VARIANCE, DEFAULT_STATE_SAMPLE_SIZE, DEFAULT_STATE_SD_GUESS, DEFAULT_THINNING,
};
use causal_impact_core::model::{
    Coupling, InverseGammaPrior, ModelSpec, Priors, RegressionPrior, SamplingConfig,
};
use causal_impact_core::PredictionMode;

use crate::error::{ImpactError, ImpactResult};

/// Observation sd upper limit as a multiple of the pre-period response sd.
pub const OBSERVATION_SD_LIMIT_FACTOR: f64 = 1.2;

/// Configuration options for [`CausalImpact`](crate::CausalImpact).
///
/// Prior sd guesses are expressed on the standardized response scale. When
/// standardization is off they are multiplied by the pre-period response sd,
/// so the same defaults work for unscaled data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // =========================================================================
    // Sampling
    // =========================================================================
    /// Gibbs iterations per chain, burn-in included. Default: 1,000.
    pub iterations: usize,

    /// Leading iterations discarded per chain. Default: 100.
    pub burn_in: usize,

    /// Keep every k-th post-burn-in draw. Default: 1.
    pub thinning: usize,

    /// Base seed. Per-chain seeds are derived from it, so the same seed,
    /// data and configuration give bit-identical results.
    pub seed: u64,

    /// Independent chains. Their draws are pooled before aggregation and
    /// compared for convergence. Default: 1.
    pub n_chains: usize,

    // =========================================================================
    // Model
    // =========================================================================
    /// Standardize response and controls with pre-period moments before
    /// fitting. Summaries are always reported on the original scale.
    /// Default: true.
    pub standardize: bool,

    /// Add a local trend on top of the local level. Default: false.
    pub trend: bool,

    /// Seasonal period, if a seasonal component should be fitted.
    pub seasonal_period: Option<usize>,

    /// Prior guess of the level (and trend, seasonal) innovation sd.
    ///
    /// The main knob for how much the counterfactual may drift. Default: 0.01.
    pub state_sd_guess: f64,

    /// Prior sample size behind `state_sd_guess`. Default: 32.
    pub state_sample_size: f64,

    /// Prior guess of the observation noise sd. Default: 0.1.
    pub observation_sd_guess: f64,

    /// Prior sample size behind `observation_sd_guess`. Default: 0.01.
    pub observation_sample_size: f64,

    /// Initial state variance as a multiple of the pre-period variance.
    /// Default: 1.0.
    pub initial_state_scale: f64,

    // =========================================================================
    // Regression over controls
    // =========================================================================
    /// Expected number of included controls; sets a uniform prior inclusion
    /// probability. Default: 1.0.
    pub expected_model_size: f64,

    /// Upper bound on simultaneously included controls. Default: None
    /// (bounded only by the number of usable observations).
    pub max_model_size: Option<usize>,

    /// Slab variance of an included coefficient. Default: 1.0.
    pub slab_variance: f64,

    /// Indicator coupling of the spike-and-slab sampler. Default: Joint.
    pub coupling: Coupling,

    // =========================================================================
    // Summaries
    // =========================================================================
    /// Two-sided interval level. Default: 0.05 (95% intervals).
    pub alpha: f64,

    /// How post-period states are carried forward. Default: Sampled.
    pub prediction_mode: PredictionMode,

    /// Summarize cancelled or failed chains instead of returning an error.
    /// Default: false.
    pub allow_incomplete: bool,

    /// Keep the pooled draws in the result. Default: false.
    pub keep_draws: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Sampling
            iterations: DEFAULT_ITERATIONS,
            burn_in: DEFAULT_BURN_IN,
            thinning: DEFAULT_THINNING,
            seed: DEFAULT_SEED,
            n_chains: 1,

            // Model
            standardize: true,
            trend: false,
            seasonal_period: None,
            state_sd_guess: DEFAULT_STATE_SD_GUESS,
            state_sample_size: DEFAULT_STATE_SAMPLE_SIZE,
            observation_sd_guess: DEFAULT_OBSERVATION_SD_GUESS,
            observation_sample_size: DEFAULT_OBSERVATION_SAMPLE_SIZE,
            initial_state_scale: DEFAULT_INITIAL_STATE_SCALE,

            // Regression
            expected_model_size: DEFAULT_EXPECTED_MODEL_SIZE,
            max_model_size: None,
            slab_variance: DEFAULT_SLAB_VARIANCE,
            coupling: Coupling::Joint,

            // Summaries
            alpha: DEFAULT_ALPHA,
            prediction_mode: PredictionMode::Sampled,
            allow_incomplete: false,
            keep_draws: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Short runs for exploration: 300 iterations, 50 burn-in.
    pub fn quick() -> Self {
        Self {
            iterations: 300,
            burn_in: 50,
            ..Default::default()
        }
    }

    /// Longer runs with several chains for reporting: 5,000 iterations per
    /// chain over 4 chains.
    pub fn thorough() -> Self {
        Self {
            iterations: 5_000,
            burn_in: 500,
            n_chains: 4,
            ..Default::default()
        }
    }

    /// Set the iteration count.
    pub fn iterations(mut self, n: usize) -> Self {
        assert!(n > 0, "iterations must be positive");
        self.iterations = n;
        self
    }

    /// Set the burn-in.
    pub fn burn_in(mut self, n: usize) -> Self {
        self.burn_in = n;
        self
    }

    /// Set the thinning interval.
    pub fn thinning(mut self, k: usize) -> Self {
        assert!(k > 0, "thinning must be positive");
        self.thinning = k;
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the number of chains.
    pub fn chains(mut self, n: usize) -> Self {
        assert!(n > 0, "n_chains must be positive");
        self.n_chains = n;
        self
    }

    /// Set the interval level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha < 1.0, "alpha must be in (0, 1)");
        self.alpha = alpha;
        self
    }

    /// Set the seasonal period.
    pub fn seasonal(mut self, period: usize) -> Self {
        assert!(period >= 2, "seasonal_period must be at least 2");
        self.seasonal_period = Some(period);
        self
    }

    /// Set the level innovation sd guess.
    pub fn state_sd_guess(mut self, sd: f64) -> Self {
        assert!(sd > 0.0 && sd.is_finite(), "state_sd_guess must be positive");
        self.state_sd_guess = sd;
        self
    }

    /// Set the expected model size.
    pub fn expected_model_size(mut self, size: f64) -> Self {
        assert!(size >= 0.0 && size.is_finite(), "expected_model_size must be non-negative");
        self.expected_model_size = size;
        self
    }

    /// Set the maximum model size.
    pub fn max_model_size(mut self, size: usize) -> Self {
        self.max_model_size = Some(size);
        self
    }

    /// Validate the configuration.
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> ImpactResult<()> {
        if self.iterations == 0 {
            return Err(ImpactError::config("iterations must be positive"));
        }
        if self.thinning == 0 {
            return Err(ImpactError::config("thinning must be positive"));
        }
        if self.burn_in >= self.iterations {
            return Err(ImpactError::config(format!(
                "burn_in ({}) must be smaller than iterations ({})",
                self.burn_in, self.iterations
            )));
        }
        if self.n_chains == 0 {
            return Err(ImpactError::config("n_chains must be positive"));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(ImpactError::config("alpha must be in (0, 1)"));
        }
        if matches!(self.seasonal_period, Some(p) if p < 2) {
            return Err(ImpactError::config("seasonal_period must be at least 2"));
        }
        for (name, value) in [
            ("state_sd_guess", self.state_sd_guess),
            ("state_sample_size", self.state_sample_size),
            ("observation_sd_guess", self.observation_sd_guess),
            ("observation_sample_size", self.observation_sample_size),
            ("initial_state_scale", self.initial_state_scale),
            ("slab_variance", self.slab_variance),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ImpactError::config(format!("{name} must be positive, got {value}")));
            }
        }
        if !(self.expected_model_size >= 0.0 && self.expected_model_size.is_finite()) {
            return Err(ImpactError::config("expected_model_size must be non-negative"));
        }
        if self.max_model_size == Some(0) {
            return Err(ImpactError::config("max_model_size must be positive"));
        }
        Ok(())
    }

    /// Model specification for a design with `n_controls` columns.
    ///
    /// `response_sd` is the pre-period sd of the response on the scale the
    /// model is fit on (1 after standardization). Sd guesses are multiplied
    /// by it and the observation sd is capped at 1.2 times it.
    pub fn model_spec(&self, n_controls: usize, response_sd: f64) -> ModelSpec {
        let sdy = if response_sd > 0.0 && response_sd.is_finite() {
            response_sd
        } else {
            1.0
        };
        let state = InverseGammaPrior::from_sd_guess(self.state_sd_guess * sdy, self.state_sample_size)
            .with_upper_limit(sdy);
        let priors = Priors {
            observation: InverseGammaPrior::from_sd_guess(
                self.observation_sd_guess * sdy,
                self.observation_sample_size,
            )
            .with_upper_limit(OBSERVATION_SD_LIMIT_FACTOR * sdy),
            level: state,
            trend: state,
            seasonal: state,
            initial_state_scale: self.initial_state_scale,
        };

        let mut spec = if self.trend {
            ModelSpec::local_linear_trend()
        } else {
            ModelSpec::local_level()
        }
        .with_priors(priors)
        .with_sampling(SamplingConfig {
            iterations: self.iterations,
            burn_in: self.burn_in,
            thinning: self.thinning,
            seed: self.seed,
        });

        if let Some(period) = self.seasonal_period {
            spec = spec.with_seasonal(period);
        }
        if n_controls > 0 {
            let mut prior = RegressionPrior::with_expected_model_size(n_controls, self.expected_model_size);
            prior.slab_variance = self.slab_variance;
            prior.max_model_size = self.max_model_size;
            prior.coupling = self.coupling;
            spec = spec.with_regression(prior);
        }
        spec
    }
}
