//! # causal-impact
//!
//! Estimate the causal effect of an intervention on a time series.
//!
//! A Bayesian structural time-series model (local level, optional trend and
//! seasonality, spike-and-slab regression on control series) is fit to the
//! pre-intervention period. Its posterior predictive distribution over the
//! post-intervention period is the counterfactual: what the response would
//! have been without the intervention. The difference between observed and
//! counterfactual is the effect, reported per time step, cumulatively and
//! as post-period totals with credible intervals and a tail-area
//! probability.
//!
//! ## Quick Start
//!
//! ```ignore
//! use causal_impact::{CausalImpact, ImpactData};
//!
//! // Response plus one control column; indices 0..=69 are before the
//! // intervention, 70..=99 after.
//! let data = ImpactData::new(response, vec![control], (0, 69), (70, 99))?;
//! let analysis = CausalImpact::new().seed(42).run(&data)?;
//!
//! println!("{}", causal_impact::output::format_table(&analysis));
//! ```
//!
//! ## Reproducibility
//!
//! The same seed, data and configuration produce bit-identical results,
//! with or without the `parallel` feature.
//!
//! ## Missing values
//!
//! `NaN` in the response marks a missing observation. Missing steps are
//! skipped when fitting and contribute no pointwise effect. Controls must be
//! complete.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
mod config;
mod error;
mod impact;
mod result;

// Functional modules
pub mod chains;
pub mod data;
pub mod diagnostics;
pub mod output;

// Re-exports for public API
pub use config::{Config, OBSERVATION_SD_LIMIT_FACTOR};
pub use data::{ImpactData, PreparedSeries, Scaler};
pub use diagnostics::{ChainDiagnostics, Diagnostics};
pub use error::{ImpactError, ImpactResult};
pub use impact::CausalImpact;
pub use result::ImpactAnalysis;

// Re-export the engine types that appear in results
pub use causal_impact_core::model::Coupling;
pub use causal_impact_core::posterior::{PeriodTotals, TimeStepSummary};
pub use causal_impact_core::{
    Cancellation, DrawSet, DrawStatus, PointSummary, PosteriorSummary, PredictionMode, ResponseScale,
    SamplerError,
};

/// The inference engine, for direct use of the sampler and aggregator.
pub use causal_impact_core as engine;
