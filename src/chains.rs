//! Multi-chain execution.
//!
//! Chain `i` is seeded with `counter_rng_seed(spec.sampling.seed, i)`, so
//! the draws of a chain do not depend on how many chains run or in what
//! order. With the
//! `parallel` feature chains run on the rayon pool; results are identical
//! either way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use causal_impact_core::{run_chain, Cancellation, DrawSet, ModelSpec, SamplerResult, SeriesData};

/// Run `n_chains` independent chains.
///
/// Construction failures (invalid specification, unusable design) are
/// returned as an error. Sampling failures and cancellation are recorded in
/// each chain's draw set status.
pub fn run_chains(
    spec: &ModelSpec,
    data: &SeriesData,
    n_chains: usize,
    cancel: Option<&Cancellation>,
) -> SamplerResult<Vec<DrawSet>> {
    #[cfg(feature = "parallel")]
    let sets: Vec<SamplerResult<DrawSet>> = {
        (0..n_chains)
            .into_par_iter()
            .map(|chain| run_chain(spec, data, chain, cancel))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let sets: Vec<SamplerResult<DrawSet>> = {
        (0..n_chains)
            .map(|chain| run_chain(spec, data, chain, cancel))
            .collect()
    };

    sets.into_iter().collect()
}
