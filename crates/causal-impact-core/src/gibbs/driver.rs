//! The Gibbs driver state machine.

use alloc::format;
use alloc::vec::Vec;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{counter_rng_seed, Cancellation, ChainPhase, DrawSet, DrawStatus, ParameterDraw, Parameters};
use crate::constants::RETRY_JITTER;
use crate::error::{SamplerError, SamplerResult};
use crate::filter::draw_states;
use crate::model::{ComponentKind, InitialState, ModelSpec, StateSpaceModel};
use crate::regression::SpikeSlabSampler;
use crate::series::SeriesData;
use crate::types::{Matrix, Vector};
use crate::variance::{draw_variances, initial_variances};

/// Runs one Gibbs chain over a fixed specification and series.
///
/// The specification and data are borrowed read-only, so several drivers
/// can share them across threads. Everything mutable (RNG, phase,
/// iteration counter) is owned by the driver.
pub struct GibbsDriver<'a> {
    spec: &'a ModelSpec,
    data: &'a SeriesData,
    model: StateSpaceModel,
    regression: Option<SpikeSlabSampler>,
    /// Controls restricted to the pre-period (all rows, observed or not).
    pre_controls: Option<Matrix>,
    observed_rows: Vec<usize>,
    init: InitialState,
    rng: Xoshiro256PlusPlus,
    seed: u64,
    phase: ChainPhase,
    iteration: usize,
    retries: usize,
}

impl<'a> GibbsDriver<'a> {
    /// Validate inputs and set up chain `chain`.
    ///
    /// The chain's RNG is seeded with
    /// `counter_rng_seed(spec.sampling.seed, chain)`, so every chain of a run
    /// derives from the one seed in the specification.
    ///
    /// Fails with [`SamplerError::InvalidSpecification`] if the
    /// specification does not match the data or the pre-period is too short
    /// to identify the state, and with [`SamplerError::SingularDesign`] if
    /// the forced-in controls cannot be identified.
    pub fn new(spec: &'a ModelSpec, data: &'a SeriesData, chain: usize) -> SamplerResult<Self> {
        spec.validate(data.n_controls())?;
        let seed = counter_rng_seed(spec.sampling.seed, chain as u64);
        let model = StateSpaceModel::new(spec)?;

        let observed_rows = data.observed_pre_indices();
        if observed_rows.len() <= model.state_dim() {
            return Err(SamplerError::invalid(format!(
                "{} observed pre-period values cannot identify a {}-dimensional state",
                observed_rows.len(),
                model.state_dim()
            )));
        }

        let regression = match (&spec.regression, data.pre_design()) {
            (Some(prior), Some(design)) => Some(SpikeSlabSampler::new(design, prior)?),
            _ => None,
        };
        let pre_controls = data
            .controls()
            .map(|x| x.rows(0, data.pre_end()).into_owned());

        Ok(Self {
            spec,
            data,
            model,
            regression,
            pre_controls,
            observed_rows,
            init: data.initial_state(spec.priors.initial_state_scale),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            seed,
            phase: ChainPhase::Initializing,
            iteration: 0,
            retries: 0,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> ChainPhase {
        self.phase
    }

    /// Seed of this chain's RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Iterations that needed a jittered retry so far.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// The assembled state-space model.
    pub fn model(&self) -> &StateSpaceModel {
        &self.model
    }

    /// Starting values: prior-mean variances, forced-in controls at zero,
    /// and a flat trajectory at the initial level.
    ///
    /// Moves the chain out of `Initializing`.
    pub fn initial_parameters(&mut self) -> Parameters {
        let n = self.data.pre_end();
        let mut states = Matrix::zeros(self.model.state_dim(), n);
        if let Some(level) = self.model.blocks().iter().find(|b| b.kind == ComponentKind::Level) {
            states.row_mut(level.offset).fill(self.init.level_mean);
        }

        self.phase = if self.spec.sampling.burn_in > 0 {
            ChainPhase::BurningIn
        } else {
            ChainPhase::Sampling
        };

        Parameters {
            variances: initial_variances(&self.model, &self.spec.priors),
            regression: self.regression.as_ref().map(SpikeSlabSampler::initial_draw),
            states,
            log_likelihood: f64::NEG_INFINITY,
        }
    }

    /// Run one iteration from `params`, retrying once with jitter on a
    /// numerical or singularity failure.
    ///
    /// A second failure moves the chain to `Failed` and is returned with the
    /// iteration index attached.
    pub fn step(&mut self, params: &Parameters) -> SamplerResult<Parameters> {
        self.step_with(params, &mut Self::attempt)
    }

    fn step_with<F>(&mut self, params: &Parameters, attempt: &mut F) -> SamplerResult<Parameters>
    where
        F: FnMut(&mut Self, &Parameters, f64) -> SamplerResult<Parameters>,
    {
        let index = self.iteration;
        let next = match attempt(self, params, 0.0) {
            Ok(next) => next,
            Err(e) if e.is_retryable() => {
                self.retries += 1;
                attempt(self, params, RETRY_JITTER).map_err(|e| {
                    self.phase = ChainPhase::Failed;
                    e.at_iteration(index)
                })?
            }
            Err(e) => {
                self.phase = ChainPhase::Failed;
                return Err(e.at_iteration(index));
            }
        };

        self.iteration += 1;
        self.phase = if self.iteration >= self.spec.sampling.iterations {
            ChainPhase::Done
        } else if self.iteration < self.spec.sampling.burn_in {
            ChainPhase::BurningIn
        } else {
            ChainPhase::Sampling
        };
        Ok(next)
    }

    /// One pass of regression → states → variances.
    fn attempt(&mut self, params: &Parameters, jitter: f64) -> SamplerResult<Parameters> {
        let observations = self.data.fitting_observations();
        let z = self.model.loading();

        let regression = match (&self.regression, &params.regression) {
            (Some(sampler), Some(current)) => {
                // Target: observation minus structural contribution of the
                // previous trajectory, at observed pre-period steps.
                let target = Vector::from_iterator(
                    self.observed_rows.len(),
                    self.observed_rows.iter().map(|&t| {
                        let y = observations[t].unwrap_or(0.0);
                        if self.model.state_dim() == 0 {
                            y
                        } else {
                            y - z.dot(&params.states.column(t))
                        }
                    }),
                );
                Some(sampler.draw(&target, params.variances.observation, current, jitter, &mut self.rng)?)
            }
            _ => None,
        };

        let offsets = match (&regression, &self.pre_controls) {
            (Some(draw), Some(x)) => draw.contributions(x),
            _ => alloc::vec![0.0; observations.len()],
        };

        let filter_jitter = jitter * self.init.variance;
        let draw = draw_states(
            &self.model,
            observations,
            &offsets,
            &params.variances,
            &self.init,
            filter_jitter,
            &mut self.rng,
        )?;

        let variances = draw_variances(
            &self.model,
            &self.spec.priors,
            observations,
            &offsets,
            &draw.states,
            &mut self.rng,
        )?;

        Ok(Parameters {
            variances,
            regression,
            states: draw.states,
            log_likelihood: draw.log_likelihood,
        })
    }

    /// Run every requested iteration, honoring `cancel` between iterations.
    ///
    /// Never returns an error: a fatal failure or a cancellation ends the run
    /// early and is recorded in the returned [`DrawSet`]'s status. The draws
    /// retained up to that point stay valid.
    pub fn run(&mut self, cancel: Option<&Cancellation>) -> DrawSet {
        self.run_with(cancel, &mut Self::attempt)
    }

    fn run_with<F>(&mut self, cancel: Option<&Cancellation>, attempt: &mut F) -> DrawSet
    where
        F: FnMut(&mut Self, &Parameters, f64) -> SamplerResult<Parameters>,
    {
        let sampling = self.spec.sampling;
        let mut set = DrawSet::new(&sampling, self.seed);
        let mut params = self.initial_parameters();

        while self.iteration < sampling.iterations {
            if cancel.is_some_and(Cancellation::is_cancelled) {
                set.status = DrawStatus::Cancelled;
                break;
            }
            let index = self.iteration;
            match self.step_with(&params, attempt) {
                Ok(next) => params = next,
                Err(e) => {
                    set.status = DrawStatus::Failed(e);
                    break;
                }
            }
            set.iterations_completed = self.iteration;
            set.log_likelihood_trace.push(params.log_likelihood);
            if sampling.keeps(index) {
                set.draws.push(ParameterDraw::snapshot(index, &params));
            }
        }

        set.retries = self.retries;
        set
    }
}

/// Run chain `chain` of `spec` to completion.
///
/// The chain's seed is derived from `spec.sampling.seed` and the chain
/// index (see [`GibbsDriver::new`]).
///
/// Construction failures (invalid specification, unidentifiable forced-in
/// controls) are returned as errors. Sampling failures and cancellation are
/// recorded in the draw set status.
pub fn run_chain(
    spec: &ModelSpec,
    data: &SeriesData,
    chain: usize,
    cancel: Option<&Cancellation>,
) -> SamplerResult<DrawSet> {
    let mut driver = GibbsDriver::new(spec, data, chain)?;
    Ok(driver.run(cancel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RegressionPrior, SamplingConfig};
    use crate::posterior::{summarize, AggregateOptions};
    use crate::types::Observation;
    use rand_distr::{Distribution, Normal};

    fn sampling(iterations: usize, burn_in: usize, seed: u64) -> SamplingConfig {
        SamplingConfig {
            iterations,
            burn_in,
            thinning: 1,
            seed,
        }
    }

    fn local_level_series(n: usize, obs_sd: f64, level_sd: f64, seed: u64) -> Vec<Observation> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let obs = Normal::new(0.0, obs_sd).unwrap();
        let lvl = Normal::new(0.0, level_sd).unwrap();
        let mut level = 0.0;
        (0..n)
            .map(|_| {
                level += lvl.sample(&mut rng);
                Some(level + obs.sample(&mut rng))
            })
            .collect()
    }

    /// Fails iteration 3 on its first attempt only.
    fn flaky_attempt(driver: &mut GibbsDriver<'_>, params: &Parameters, jitter: f64) -> SamplerResult<Parameters> {
        if driver.iteration() == 3 && jitter == 0.0 {
            return Err(SamplerError::singular("rank-deficient controls"));
        }
        driver.attempt(params, jitter)
    }

    /// Fails every attempt from iteration 5 on.
    fn broken_attempt(driver: &mut GibbsDriver<'_>, params: &Parameters, jitter: f64) -> SamplerResult<Parameters> {
        if driver.iteration() >= 5 {
            return Err(SamplerError::NumericalInstability {
                time: 2,
                component: ComponentKind::Level,
                iteration: None,
                detail: format!("predicted variance -1e-3 (jitter {jitter:e})"),
            });
        }
        driver.attempt(params, jitter)
    }

    #[test]
    fn test_gibbs_determinism() {
        let y = local_level_series(60, 0.5, 0.1, 1);
        let data = SeriesData::new(y, None, 50, 50).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(40, 0, 7));

        let a = run_chain(&spec, &data, 0, None).unwrap();
        let b = run_chain(&spec, &data, 0, None).unwrap();
        assert_eq!(a, b, "same seed should give identical draws");
        assert_eq!(a.seed, counter_rng_seed(7, 0));

        let c = run_chain(&spec, &data, 1, None).unwrap();
        assert_ne!(a.draws, c.draws);

        let reseeded = spec.clone().with_sampling(sampling(40, 0, 8));
        let d = run_chain(&reseeded, &data, 0, None).unwrap();
        assert_ne!(a.draws, d.draws, "the specification seed drives the chain");
    }

    #[test]
    fn test_burn_in_and_thinning() {
        let y = local_level_series(40, 0.5, 0.1, 2);
        let data = SeriesData::new(y, None, 40, 40).unwrap();
        let spec = ModelSpec::local_level().with_sampling(SamplingConfig {
            iterations: 50,
            burn_in: 10,
            thinning: 3,
            seed: 1,
        });
        let set = run_chain(&spec, &data, 0, None).unwrap();
        assert!(set.is_complete());
        assert_eq!(set.len(), spec.sampling.retained());
        assert_eq!(set.draws[0].iteration, 10);
        assert_eq!(set.draws[1].iteration, 13);
        assert_eq!(set.log_likelihood_trace.len(), 50);
        assert_eq!(set.draws[0].states.ncols(), 40);
    }

    #[test]
    fn test_phase_transitions() {
        let y = local_level_series(30, 0.5, 0.1, 3);
        let data = SeriesData::new(y, None, 30, 30).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(3, 1, 1));
        let mut driver = GibbsDriver::new(&spec, &data, 0).unwrap();
        assert_eq!(driver.phase(), ChainPhase::Initializing);

        let p0 = driver.initial_parameters();
        assert_eq!(driver.phase(), ChainPhase::BurningIn);
        let p1 = driver.step(&p0).unwrap();
        assert_eq!(driver.phase(), ChainPhase::Sampling);
        let p2 = driver.step(&p1).unwrap();
        assert_eq!(driver.phase(), ChainPhase::Sampling);
        driver.step(&p2).unwrap();
        assert_eq!(driver.phase(), ChainPhase::Done);
    }

    #[test]
    fn test_cancelled_run_keeps_valid_prefix() {
        let y = local_level_series(30, 0.5, 0.1, 4);
        let data = SeriesData::new(y, None, 30, 30).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(100, 0, 1));
        let cancel = Cancellation::new();
        cancel.cancel();
        let set = run_chain(&spec, &data, 0, Some(&cancel)).unwrap();
        assert_eq!(set.status, DrawStatus::Cancelled);
        assert!(!set.is_complete());
        assert_eq!(set.iterations_completed, 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_zero_component_spec_rejected() {
        let data = SeriesData::new(alloc::vec![Some(1.0), Some(2.0)], None, 2, 2).unwrap();
        let err = GibbsDriver::new(&ModelSpec::empty(), &data, 0).err().unwrap();
        assert!(matches!(err, SamplerError::InvalidSpecification { .. }));
    }

    #[test]
    fn test_short_pre_period_rejected() {
        let y: Vec<Observation> = (0..5).map(|t| Some(t as f64)).collect();
        let data = SeriesData::new(y, None, 5, 5).unwrap();
        let spec = ModelSpec::local_linear_trend().with_seasonal(7);
        assert!(GibbsDriver::new(&spec, &data, 0).is_err());
    }

    #[test]
    fn test_observation_variance_recovered() {
        // True observation sd 0.5 (variance 0.25), small level drift.
        let y = local_level_series(300, 0.5, 0.05, 11);
        let data = SeriesData::new(y, None, 300, 300).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(600, 200, 5));
        let set = run_chain(&spec, &data, 0, None).unwrap();
        assert!(set.is_complete());

        let vars = set.observation_variances();
        let mean = vars.iter().sum::<f64>() / vars.len() as f64;
        assert!((mean - 0.25).abs() < 0.06, "posterior mean observation variance {mean}");
    }

    #[test]
    fn test_regression_selects_driving_control() {
        let n = 120;
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(21);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let x = Matrix::from_fn(n, 2, |_, _| normal.sample(&mut rng));
        let y: Vec<Observation> = (0..n)
            .map(|t| Some(1.0 + 3.0 * x[(t, 0)] + 0.1 * normal.sample(&mut rng)))
            .collect();
        let data = SeriesData::new(y, Some(x), 100, 100).unwrap();
        let spec = ModelSpec::local_level()
            .with_regression(RegressionPrior::new(2))
            .with_sampling(sampling(400, 100, 3));

        let set = run_chain(&spec, &data, 0, None).unwrap();
        assert!(set.is_complete());
        let freq = set.inclusion_frequencies().unwrap();
        assert!(freq[0] > 0.95, "driving control inclusion {}", freq[0]);
        assert!(freq[1] < 0.5, "noise control inclusion {}", freq[1]);
        let beta = set.coefficient_means().unwrap();
        assert!((beta[0] - 3.0).abs() < 0.2, "coefficient mean {}", beta[0]);
    }

    #[test]
    fn test_regression_only_model_runs() {
        let n = 40;
        let x = Matrix::from_fn(n, 1, |t, _| (t as f64 * 0.7).sin());
        let y: Vec<Observation> = (0..n).map(|t| Some(2.0 * x[(t, 0)] + 0.01 * (t % 3) as f64)).collect();
        let data = SeriesData::new(y, Some(x), 30, 30).unwrap();
        let spec = ModelSpec::empty()
            .with_regression(RegressionPrior::with_expected_model_size(1, 0.5))
            .with_sampling(sampling(50, 10, 9));
        let set = run_chain(&spec, &data, 0, None).unwrap();
        assert!(set.is_complete());
        assert_eq!(set.draws[0].states.nrows(), 0);
    }

    #[test]
    fn test_missing_pre_period_values_tolerated() {
        let mut y = local_level_series(50, 0.3, 0.1, 12);
        y[10] = None;
        y[11] = None;
        y[25] = None;
        let data = SeriesData::new(y, None, 40, 40).unwrap();
        let spec = ModelSpec::local_linear_trend().with_sampling(sampling(60, 10, 4));
        let set = run_chain(&spec, &data, 0, None).unwrap();
        assert!(set.is_complete());
        assert!(set.draws.iter().all(|d| d.states.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_transient_failure_recovers_with_one_retry() {
        let y = local_level_series(50, 0.5, 0.1, 5);
        let data = SeriesData::new(y, None, 40, 40).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(20, 2, 3));
        let mut driver = GibbsDriver::new(&spec, &data, 0).unwrap();

        let set = driver.run_with(None, &mut flaky_attempt);
        assert!(set.is_complete());
        assert_eq!(set.retries, 1);
        assert_eq!(set.iterations_completed, 20);
        assert_eq!(set.len(), 18);
        assert_eq!(driver.phase(), ChainPhase::Done);
    }

    #[test]
    fn test_repeated_failure_ends_chain_with_iteration() {
        let y = local_level_series(50, 0.5, 0.1, 6);
        let data = SeriesData::new(y, None, 40, 40).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(20, 2, 3));
        let mut driver = GibbsDriver::new(&spec, &data, 0).unwrap();

        let set = driver.run_with(None, &mut broken_attempt);
        assert_eq!(driver.phase(), ChainPhase::Failed);
        assert!(!set.is_complete());
        assert_eq!(set.retries, 1);
        assert_eq!(set.iterations_completed, 5);
        assert_eq!(set.len(), 3, "draws before the failure are kept");
        match &set.status {
            DrawStatus::Failed(SamplerError::NumericalInstability {
                time,
                component,
                iteration,
                ..
            }) => {
                assert_eq!(*time, 2);
                assert_eq!(*component, ComponentKind::Level);
                assert_eq!(*iteration, Some(5));
            }
            other => panic!("unexpected status: {other:?}"),
        }

        let err = summarize(&spec, &data, &set, &AggregateOptions::default()).unwrap_err();
        assert_eq!(
            err,
            SamplerError::IncompleteDraws {
                completed: 5,
                requested: 20
            }
        );
        let options = AggregateOptions {
            allow_incomplete: true,
            ..AggregateOptions::default()
        };
        let summary = summarize(&spec, &data, &set, &options).unwrap();
        assert_eq!(summary.n_draws, 3);
    }

    #[test]
    fn test_nan_observation_variance_fails_after_retry() {
        let y = local_level_series(40, 0.5, 0.1, 7);
        let data = SeriesData::new(y, None, 40, 40).unwrap();
        let spec = ModelSpec::local_level().with_sampling(sampling(10, 0, 1));
        let mut driver = GibbsDriver::new(&spec, &data, 0).unwrap();

        let p0 = driver.initial_parameters();
        let p1 = driver.step(&p0).unwrap();
        let mut p2 = driver.step(&p1).unwrap();
        p2.variances.observation = f64::NAN;

        let err = driver.step(&p2).unwrap_err();
        assert_eq!(driver.phase(), ChainPhase::Failed);
        assert_eq!(driver.retries(), 1);
        assert_eq!(driver.iteration(), 2);
        match err {
            SamplerError::NumericalInstability {
                time,
                component,
                iteration,
                ..
            } => {
                assert_eq!(time, 0);
                assert_eq!(component, ComponentKind::Observation);
                assert_eq!(iteration, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
