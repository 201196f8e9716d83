//! Kalman filtering and forward-filter backward-sample (FFBS) state draws.
//!
//! - **Forward filter** (`kalman`): Gaussian belief over the state at each
//!   step, skipping the update where the observation is absent
//! - **Backward sampler** (`ffbs`): one exact joint draw of the trajectory

pub mod ffbs;
pub mod kalman;

pub use ffbs::{backward_sample, draw_states, StateDraw};
pub use kalman::{forward_filter, predictive_log_likelihood, FilterOutput, Innovation};
