//! Main `CausalImpact` entry point and builder.

use causal_impact_core::model::Coupling;
use causal_impact_core::{summarize, AggregateOptions, Cancellation, DrawSet, DrawStatus, PredictionMode};

use crate::chains::run_chains;
use crate::config::Config;
use crate::data::ImpactData;
use crate::diagnostics::{Diagnostics, R_HAT_THRESHOLD};
use crate::error::{ImpactError, ImpactResult};
use crate::result::ImpactAnalysis;

/// Main entry point for causal impact analysis.
///
/// Use the builder pattern to configure and run an analysis.
///
/// # Example
///
/// ```ignore
/// use causal_impact::{CausalImpact, ImpactData};
///
/// let data = ImpactData::new(response, controls, (0, 69), (70, 99))?;
/// let analysis = CausalImpact::new()
///     .iterations(2_000)
///     .chains(4)
///     .seed(42)
///     .run(&data)?;
///
/// if let Some(totals) = analysis.post_period() {
///     println!("p = {:.3}", totals.p_value);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CausalImpact {
    config: Config,
    cancellation: Option<Cancellation>,
}

impl CausalImpact {
    /// Create with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from an existing configuration.
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            cancellation: None,
        }
    }

    /// Set Gibbs iterations per chain.
    pub fn iterations(mut self, n: usize) -> Self {
        self.config = self.config.iterations(n);
        self
    }

    /// Set burn-in iterations per chain.
    pub fn burn_in(mut self, n: usize) -> Self {
        self.config = self.config.burn_in(n);
        self
    }

    /// Set the thinning interval.
    pub fn thinning(mut self, k: usize) -> Self {
        self.config = self.config.thinning(k);
        self
    }

    /// Set the base seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config = self.config.seed(seed);
        self
    }

    /// Set the number of chains.
    pub fn chains(mut self, n: usize) -> Self {
        self.config = self.config.chains(n);
        self
    }

    /// Set the interval level.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.config = self.config.alpha(alpha);
        self
    }

    /// Enable or disable standardization.
    pub fn standardize(mut self, on: bool) -> Self {
        self.config.standardize = on;
        self
    }

    /// Enable or disable the local trend.
    pub fn trend(mut self, on: bool) -> Self {
        self.config.trend = on;
        self
    }

    /// Add a seasonal component with the given period.
    pub fn seasonal(mut self, period: usize) -> Self {
        self.config = self.config.seasonal(period);
        self
    }

    /// Set the level innovation sd guess.
    pub fn state_sd_guess(mut self, sd: f64) -> Self {
        self.config = self.config.state_sd_guess(sd);
        self
    }

    /// Set the expected number of included controls.
    pub fn expected_model_size(mut self, size: f64) -> Self {
        self.config = self.config.expected_model_size(size);
        self
    }

    /// Cap the number of included controls.
    pub fn max_model_size(mut self, size: usize) -> Self {
        self.config = self.config.max_model_size(size);
        self
    }

    /// Set the spike-and-slab coupling.
    pub fn coupling(mut self, coupling: Coupling) -> Self {
        self.config.coupling = coupling;
        self
    }

    /// Set the prediction mode.
    pub fn prediction_mode(mut self, mode: PredictionMode) -> Self {
        self.config.prediction_mode = mode;
        self
    }

    /// Summarize cancelled or failed chains instead of erroring.
    pub fn allow_incomplete(mut self, allow: bool) -> Self {
        self.config.allow_incomplete = allow;
        self
    }

    /// Keep the pooled draws in the result.
    pub fn keep_draws(mut self, keep: bool) -> Self {
        self.config.keep_draws = keep;
        self
    }

    /// Attach a cancellation token checked between iterations.
    pub fn cancellation(mut self, token: Cancellation) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Get the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the analysis.
    ///
    /// Fits the model on the pre-period, predicts the counterfactual for the
    /// whole window and summarizes effects on the original response scale.
    ///
    /// # Errors
    ///
    /// Invalid configuration, an unusable design, or a chain that did not
    /// complete (unless `allow_incomplete` is set).
    pub fn run(&self, data: &ImpactData) -> ImpactResult<ImpactAnalysis> {
        let config = &self.config;
        config.validate()?;

        let prepared = data.prepare(config.standardize)?;
        let series = &prepared.series;
        let (_, pre_var) = series.pre_moments();
        let spec = config.model_spec(series.n_controls(), pre_var.sqrt());

        tracing::info!(
            "Starting causal impact analysis: {} steps ({} pre, {} post), {} controls, {} chains x {} iterations",
            series.len(),
            series.pre_end(),
            series.post_len(),
            series.n_controls(),
            config.n_chains,
            config.iterations
        );

        let sets = run_chains(&spec, series, config.n_chains, self.cancellation.as_ref())?;
        self.check_chains(&sets)?;

        let diagnostics = Diagnostics::from_chains(&sets);
        if let Some(r_hat) = diagnostics.max_r_hat() {
            if r_hat > R_HAT_THRESHOLD {
                tracing::warn!(
                    "Chains have not converged: R-hat {:.3} exceeds {}; consider more iterations",
                    r_hat,
                    R_HAT_THRESHOLD
                );
            }
        }

        let pooled = DrawSet::pooled(&sets).ok_or_else(|| ImpactError::config("no chains were run"))?;
        let options = AggregateOptions {
            alpha: config.alpha,
            mode: config.prediction_mode,
            seed: config.seed,
            allow_incomplete: config.allow_incomplete,
            scale: prepared.response_scale(),
        };
        let summary = summarize(&spec, series, &pooled, &options)?;

        match &summary.post_period {
            Some(totals) => tracing::info!(
                "Analysis complete: {} draws, average effect {:.4} [{:.4}, {:.4}], p = {:.4}",
                summary.n_draws,
                totals.effect_average.mean,
                totals.effect_average.lower,
                totals.effect_average.upper,
                totals.p_value
            ),
            None => tracing::info!(
                "Analysis complete: {} draws, no observed post-period values",
                summary.n_draws
            ),
        }

        Ok(ImpactAnalysis {
            inclusion_probabilities: pooled.inclusion_frequencies(),
            coefficient_means: pooled.coefficient_means(),
            draws: config.keep_draws.then_some(pooled),
            summary,
            diagnostics,
            time_offset: prepared.time_offset,
            response_scale: prepared.response_scale(),
        })
    }

    /// Log every chain and refuse incomplete ones unless allowed.
    fn check_chains(&self, sets: &[DrawSet]) -> ImpactResult<()> {
        for (chain, set) in sets.iter().enumerate() {
            tracing::debug!(
                "Chain {} (seed {:#x}): {} of {} iterations, {} draws retained",
                chain,
                set.seed,
                set.iterations_completed,
                set.iterations_requested,
                set.len()
            );
            if set.retries > 0 {
                tracing::warn!(
                    "Chain {} needed {} jittered retries to stay numerically stable",
                    chain,
                    set.retries
                );
            }
            match &set.status {
                DrawStatus::Complete => {}
                DrawStatus::Cancelled => {
                    tracing::warn!(
                        "Chain {} cancelled after {} iterations",
                        chain,
                        set.iterations_completed
                    );
                    if !self.config.allow_incomplete {
                        return Err(ImpactError::IncompleteDraws {
                            completed: sets.iter().map(|s| s.iterations_completed).sum(),
                            requested: sets.iter().map(|s| s.iterations_requested).sum(),
                        });
                    }
                }
                DrawStatus::Failed(e) => {
                    tracing::warn!("Chain {} failed: {}", chain, e);
                    if !self.config.allow_incomplete {
                        return Err(ImpactError::ChainFailed {
                            chain,
                            source: e.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
