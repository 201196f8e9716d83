//! Result of an impact analysis.

use serde::{Deserialize, Serialize};

use causal_impact_core::posterior::{PeriodTotals, TimeStepSummary};
use causal_impact_core::{DrawSet, PosteriorSummary, ResponseScale};

use crate::diagnostics::Diagnostics;

/// Everything an analysis produces.
///
/// Time indices inside `summary` count from the pre-period start; add
/// `time_offset` to map them back to the caller's series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysis {
    /// Per-step and post-period summaries on the original response scale.
    pub summary: PosteriorSummary,
    /// Convergence diagnostics of the chains.
    pub diagnostics: Diagnostics,
    /// Posterior inclusion probability of each control, if any.
    pub inclusion_probabilities: Option<Vec<f64>>,
    /// Posterior mean coefficient of each control on the model scale
    /// (standardized controls when standardization is on).
    pub coefficient_means: Option<Vec<f64>>,
    /// Pooled draws, when requested.
    pub draws: Option<DrawSet>,
    /// Index of the pre-period start in the caller's series.
    pub time_offset: usize,
    /// Back-transform from the model scale.
    pub response_scale: ResponseScale,
}

impl ImpactAnalysis {
    /// Post-period totals, if the post-period has observations.
    pub fn post_period(&self) -> Option<&PeriodTotals> {
        self.summary.post_period.as_ref()
    }

    /// Posterior tail-area probability of the observed post-period total.
    pub fn p_value(&self) -> Option<f64> {
        self.post_period().map(|p| p.p_value)
    }

    /// Posterior probability of a causal effect.
    pub fn prob_causal_effect(&self) -> Option<f64> {
        self.post_period().map(|p| p.prob_causal_effect)
    }

    /// Summary at index `t` of the caller's series.
    pub fn at(&self, t: usize) -> Option<&TimeStepSummary> {
        self.summary.steps.get(t.checked_sub(self.time_offset)?)
    }

    /// Post-period steps.
    pub fn post_steps(&self) -> &[TimeStepSummary] {
        self.summary.post_steps()
    }

    /// Whether the interval on the cumulative effect excludes zero.
    pub fn is_significant(&self) -> bool {
        self.post_period()
            .is_some_and(|p| !p.effect_cumulative.covers(0.0))
    }
}
