//! Statistical summaries of posterior draws.
//!
//! - **Quantiles** (`quantile`): Type 2 quantiles and point summaries
//! - **Convergence** (`convergence`): effective sample size and split R̂

mod convergence;
mod quantile;

pub use convergence::{autocorrelation, compute_ess, split_r_hat};
pub use quantile::{compute_quantile, compute_quantile_sorted, PointSummary};
