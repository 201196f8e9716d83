//! Posterior aggregation: counterfactuals, pointwise and cumulative effects,
//! and post-period totals.

mod aggregate;

pub use aggregate::{
    counterfactual_path, summarize, AggregateOptions, PeriodTotals, PosteriorSummary, PredictionMode,
    ResponseScale, TimeStepSummary,
};
pub use crate::statistics::PointSummary;
