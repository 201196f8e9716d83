//! Convergence diagnostics across chains.

use serde::{Deserialize, Serialize};

use causal_impact_core::statistics::{compute_ess, split_r_hat};
use causal_impact_core::{DrawSet, DrawStatus};

/// Split R̂ above which chains are reported as not converged.
pub const R_HAT_THRESHOLD: f64 = 1.1;

fn as_slices(chains: &[Vec<f64>]) -> Vec<&[f64]> {
    chains.iter().map(Vec::as_slice).collect()
}

/// Per-chain summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainDiagnostics {
    /// Chain index.
    pub chain: usize,
    /// Seed the chain ran with.
    pub seed: u64,
    /// How the chain ended.
    pub status: DrawStatus,
    /// Iterations completed.
    pub iterations_completed: usize,
    /// Draws retained.
    pub retained: usize,
    /// Iterations that needed a jittered retry.
    pub retries: usize,
    /// Effective sample size of the retained observation variances.
    pub ess_observation_variance: f64,
    /// Effective sample size of the retained log likelihoods.
    pub ess_log_likelihood: f64,
}

impl ChainDiagnostics {
    /// Diagnose one chain.
    pub fn from_draws(chain: usize, set: &DrawSet) -> Self {
        Self {
            chain,
            seed: set.seed,
            status: set.status.clone(),
            iterations_completed: set.iterations_completed,
            retained: set.len(),
            retries: set.retries,
            ess_observation_variance: compute_ess(&set.observation_variances()),
            ess_log_likelihood: compute_ess(&set.log_likelihoods()),
        }
    }
}

/// Diagnostics of a multi-chain run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// One entry per chain.
    pub chains: Vec<ChainDiagnostics>,
    /// Split R̂ of the observation variance, when enough draws exist.
    pub r_hat_observation_variance: Option<f64>,
    /// Split R̂ of the log likelihood, when enough draws exist.
    pub r_hat_log_likelihood: Option<f64>,
}

impl Diagnostics {
    /// Diagnose a set of chains.
    pub fn from_chains(sets: &[DrawSet]) -> Self {
        let variances: Vec<Vec<f64>> = sets.iter().map(DrawSet::observation_variances).collect();
        let log_likelihoods: Vec<Vec<f64>> = sets.iter().map(DrawSet::log_likelihoods).collect();

        Self {
            chains: sets
                .iter()
                .enumerate()
                .map(|(i, set)| ChainDiagnostics::from_draws(i, set))
                .collect(),
            r_hat_observation_variance: split_r_hat(&as_slices(&variances)),
            r_hat_log_likelihood: split_r_hat(&as_slices(&log_likelihoods)),
        }
    }

    /// Largest available R̂.
    pub fn max_r_hat(&self) -> Option<f64> {
        [self.r_hat_observation_variance, self.r_hat_log_likelihood]
            .into_iter()
            .flatten()
            .reduce(f64::max)
    }

    /// Whether every available R̂ is below [`R_HAT_THRESHOLD`].
    ///
    /// Too few draws to compute R̂ counts as converged.
    pub fn converged(&self) -> bool {
        self.max_r_hat().is_none_or(|r| r <= R_HAT_THRESHOLD)
    }

    /// Smallest per-chain effective sample size.
    pub fn min_ess(&self) -> f64 {
        self.chains
            .iter()
            .flat_map(|c| [c.ess_observation_variance, c.ess_log_likelihood])
            .fold(f64::INFINITY, f64::min)
    }

    /// Retries across chains.
    pub fn total_retries(&self) -> usize {
        self.chains.iter().map(|c| c.retries).sum()
    }
}
