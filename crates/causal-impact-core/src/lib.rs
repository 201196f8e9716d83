//! Core Bayesian structural time-series inference for causal impact analysis.
//!
//! This crate holds the inference engine: the state-space model, the
//! forward-filter backward-sample (FFBS) state sampler, the spike-and-slab
//! regression sampler over control series, the conjugate variance samplers,
//! the Gibbs driver that ties them together, and the posterior aggregator
//! that turns retained draws into counterfactual and effect summaries.
//!
//! It is designed to work in `no_std` environments with only an allocator.
//!
//! # Features
//!
//! - `std` (default): Enable standard library support
//! - `parallel`: Aggregate per-time-step summaries with rayon (requires `std`)
//!
//! # Usage
//!
//! This crate is typically used through the `causal-impact` crate, which adds
//! input validation, standardization, multi-chain orchestration and logging.
//!
//! ```ignore
//! use causal_impact_core::{
//!     gibbs::run_chain,
//!     model::ModelSpec,
//!     posterior::{summarize, AggregateOptions},
//!     SeriesData,
//! };
//!
//! let data = SeriesData::new(response, None, 80, 80)?;
//! let spec = ModelSpec::local_level();
//! let draws = run_chain(&spec, &data, 0, None)?;
//! let summary = summarize(&spec, &data, &draws, &AggregateOptions::default())?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod filter;
pub mod gibbs;
pub mod linalg;
pub mod math;
pub mod model;
pub mod posterior;
pub mod regression;
pub mod series;
pub mod statistics;
pub mod types;
pub mod variance;

// Re-export commonly used items at crate root
pub use error::{SamplerError, SamplerResult};
pub use gibbs::{
    counter_rng_seed, run_chain, Cancellation, ChainPhase, DrawSet, DrawStatus, GibbsDriver, ParameterDraw,
    Parameters,
};
pub use model::{ComponentKind, ModelSpec, StateSpaceModel, Variances};
pub use posterior::{summarize, AggregateOptions, PosteriorSummary, PredictionMode, ResponseScale};
pub use statistics::PointSummary;
pub use series::SeriesData;
pub use types::{Matrix, Observation, Vector};
