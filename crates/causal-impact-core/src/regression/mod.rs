//! Variable selection over control series.
//!
//! The regression component has no latent state. Each Gibbs iteration draws
//! inclusion indicators and coefficients here, and the resulting per-step
//! contribution xₜᵀβ is handed to the filter as an observation offset.

pub mod spike_slab;

pub use spike_slab::{RegressionDraw, SpikeSlabSampler};
