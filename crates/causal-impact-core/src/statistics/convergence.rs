//! Convergence diagnostics for Gibbs chains.

use alloc::vec::Vec;

use crate::math;

/// Largest lag considered by [`compute_ess`].
const MAX_LAG: usize = 50;

/// Autocorrelation below which the lag sum is truncated.
const RHO_CUTOFF: f64 = 0.05;

/// Effective sample size of a chain accounting for autocorrelation.
///
/// ESS = N / (1 + 2 * Σ_k ρ_k)
/// where ρ_k is the lag-k autocorrelation, summed until it first drops
/// below a small cutoff.
pub fn compute_ess(chain: &[f64]) -> f64 {
    let n = chain.len();
    if n < 2 {
        return n as f64;
    }

    let mean: f64 = chain.iter().sum::<f64>() / n as f64;
    let var: f64 = chain.iter().map(|&x| math::sq(x - mean)).sum::<f64>() / n as f64;

    if var < 1e-12 {
        return n as f64; // No variance, treat as independent
    }

    let mut sum_rho = 0.0;
    for k in 1..=MAX_LAG.min(n / 2) {
        let rho_k = autocorrelation(chain, k, mean, var);
        if rho_k < RHO_CUTOFF {
            break;
        }
        sum_rho += rho_k;
    }

    n as f64 / (1.0 + 2.0 * sum_rho)
}

/// Lag-k autocorrelation.
pub fn autocorrelation(chain: &[f64], k: usize, mean: f64, var: f64) -> f64 {
    let n = chain.len();
    if k >= n {
        return 0.0;
    }

    let cov: f64 = (0..(n - k))
        .map(|i| (chain[i] - mean) * (chain[i + k] - mean))
        .sum::<f64>()
        / (n - k) as f64;

    cov / var
}

/// Split Gelman–Rubin R̂.
///
/// Each chain is cut in half and the halves are treated as separate chains,
/// so a single drifting chain also shows up as R̂ > 1. Chains are truncated
/// to the shortest length. Returns `None` when fewer than four draws per
/// half-chain are available.
pub fn split_r_hat(chains: &[&[f64]]) -> Option<f64> {
    let len = chains.iter().map(|c| c.len()).min()?;
    let half = len / 2;
    if half < 4 {
        return None;
    }

    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|c| [&c[..half], &c[half..2 * half]])
        .collect();
    let m = halves.len() as f64;
    let n = half as f64;

    let means: Vec<f64> = halves.iter().map(|h| h.iter().sum::<f64>() / n).collect();
    let grand = means.iter().sum::<f64>() / m;
    let between = n / (m - 1.0) * means.iter().map(|&mu| math::sq(mu - grand)).sum::<f64>();
    let within = halves
        .iter()
        .zip(&means)
        .map(|(h, &mu)| h.iter().map(|&x| math::sq(x - mu)).sum::<f64>() / (n - 1.0))
        .sum::<f64>()
        / m;

    if within < 1e-300 {
        // Every half-chain is constant: converged iff they agree.
        return Some(if between < 1e-300 { 1.0 } else { f64::INFINITY });
    }

    let var_plus = (n - 1.0) / n * within + between / n;
    Some(math::sqrt(var_plus / within))
}
