//! Gibbs sampling over states, regression coefficients and variances.
//!
//! Each iteration runs, in order:
//!
//! 1. Regression draw given the previous trajectory
//! 2. State trajectory draw (FFBS) with the new regression offsets
//! 3. Variance draws given the new trajectory
//!
//! The current parameters are an explicit value threaded from one iteration
//! to the next; each chain owns its own copy and its own RNG.

mod driver;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::SamplerError;
use crate::model::{SamplingConfig, Variances};
use crate::regression::RegressionDraw;
use crate::types::Matrix;

pub use driver::{run_chain, GibbsDriver};

/// Lifecycle of one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainPhase {
    /// Starting values not yet drawn.
    Initializing,
    /// Iterating, draws discarded.
    BurningIn,
    /// Iterating, draws retained subject to thinning.
    Sampling,
    /// All requested iterations completed.
    Done,
    /// Stopped by an unrecoverable sampling failure.
    Failed,
}

/// Current parameter values threaded through the iterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Variance components.
    pub variances: Variances,
    /// Regression coefficients and indicators, if regression is active.
    pub regression: Option<RegressionDraw>,
    /// Latent trajectory over the pre-period, one column per step.
    pub states: Matrix,
    /// Log likelihood of the pre-period under these parameters.
    pub log_likelihood: f64,
}

/// One retained snapshot of the parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDraw {
    /// Iteration that produced the draw.
    pub iteration: usize,
    /// Variance components.
    pub variances: Variances,
    /// Regression coefficients and indicators, if regression is active.
    pub regression: Option<RegressionDraw>,
    /// Latent trajectory over the pre-period.
    pub states: Matrix,
    /// Log likelihood of the pre-period.
    pub log_likelihood: f64,
}

impl ParameterDraw {
    fn snapshot(iteration: usize, params: &Parameters) -> Self {
        Self {
            iteration,
            variances: params.variances,
            regression: params.regression.clone(),
            states: params.states.clone(),
            log_likelihood: params.log_likelihood,
        }
    }
}

/// How a chain ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawStatus {
    /// Every requested iteration completed.
    Complete,
    /// Stopped at a cancellation point.
    Cancelled,
    /// Stopped by a fatal sampling failure.
    Failed(SamplerError),
}

/// Retained draws of one or more chains.
///
/// The draws are valid up to the last fully completed iteration even when
/// the run stopped early; [`DrawSet::is_complete`] tells the two apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawSet {
    /// Retained draws in iteration order.
    pub draws: Vec<ParameterDraw>,
    /// How the run ended.
    pub status: DrawStatus,
    /// Iterations fully completed.
    pub iterations_completed: usize,
    /// Iterations requested.
    pub iterations_requested: usize,
    /// Burn-in used.
    pub burn_in: usize,
    /// Thinning interval used.
    pub thinning: usize,
    /// Seed the chain was run with.
    pub seed: u64,
    /// Log likelihood of every completed iteration, burn-in included.
    pub log_likelihood_trace: Vec<f64>,
    /// Iterations that needed a jittered retry.
    pub retries: usize,
}

impl DrawSet {
    fn new(sampling: &SamplingConfig, seed: u64) -> Self {
        Self {
            draws: Vec::with_capacity(sampling.retained()),
            status: DrawStatus::Complete,
            iterations_completed: 0,
            iterations_requested: sampling.iterations,
            burn_in: sampling.burn_in,
            thinning: sampling.thinning,
            seed,
            log_likelihood_trace: Vec::with_capacity(sampling.iterations),
            retries: 0,
        }
    }

    /// Number of retained draws.
    pub fn len(&self) -> usize {
        self.draws.len()
    }

    /// Whether no draw was retained.
    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }

    /// Whether every requested iteration completed.
    pub fn is_complete(&self) -> bool {
        self.status == DrawStatus::Complete
    }

    /// Observation variance of every retained draw.
    pub fn observation_variances(&self) -> Vec<f64> {
        self.draws.iter().map(|d| d.variances.observation).collect()
    }

    /// Log likelihood of every retained draw.
    pub fn log_likelihoods(&self) -> Vec<f64> {
        self.draws.iter().map(|d| d.log_likelihood).collect()
    }

    /// Fraction of retained draws including each control column.
    pub fn inclusion_frequencies(&self) -> Option<Vec<f64>> {
        let first = self.draws.first()?.regression.as_ref()?;
        let mut counts = alloc::vec![0usize; first.included.len()];
        for draw in &self.draws {
            if let Some(reg) = &draw.regression {
                for (c, &g) in counts.iter_mut().zip(&reg.included) {
                    *c += g as usize;
                }
            }
        }
        let n = self.draws.len() as f64;
        Some(counts.into_iter().map(|c| c as f64 / n).collect())
    }

    /// Posterior mean coefficient of each control column (zeros counted).
    pub fn coefficient_means(&self) -> Option<Vec<f64>> {
        let first = self.draws.first()?.regression.as_ref()?;
        let mut sums = alloc::vec![0.0; first.coefficients.len()];
        for draw in &self.draws {
            if let Some(reg) = &draw.regression {
                for (s, &b) in sums.iter_mut().zip(reg.coefficients.iter()) {
                    *s += b;
                }
            }
        }
        let n = self.draws.len() as f64;
        Some(sums.into_iter().map(|s| s / n).collect())
    }

    /// Pool the draws of several chains into one set.
    ///
    /// The pooled status is the first non-complete status, if any, so a
    /// pool containing a failed or cancelled chain is itself incomplete.
    pub fn pooled(sets: &[DrawSet]) -> Option<DrawSet> {
        let first = sets.first()?;
        let mut pooled = DrawSet {
            draws: sets.iter().flat_map(|s| s.draws.iter().cloned()).collect(),
            status: DrawStatus::Complete,
            iterations_completed: sets.iter().map(|s| s.iterations_completed).sum(),
            iterations_requested: sets.iter().map(|s| s.iterations_requested).sum(),
            burn_in: first.burn_in,
            thinning: first.thinning,
            seed: first.seed,
            log_likelihood_trace: sets.iter().flat_map(|s| s.log_likelihood_trace.iter().copied()).collect(),
            retries: sets.iter().map(|s| s.retries).sum(),
        };
        if let Some(s) = sets.iter().find(|s| !s.is_complete()) {
            pooled.status = s.status.clone();
        }
        Some(pooled)
    }
}

/// Cooperative cancellation flag, checked by the driver between iterations.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    /// New, not-yet-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Derive the seed of stream `index` from a base seed (SplitMix64 finalizer).
///
/// Used for per-chain seeds and per-draw prediction streams, so results
/// do not depend on execution order.
pub fn counter_rng_seed(base: u64, index: u64) -> u64 {
    let mut z = base.wrapping_add(index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
