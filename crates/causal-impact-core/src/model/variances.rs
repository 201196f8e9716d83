//! Current values of the variance components.

use serde::{Deserialize, Serialize};

use super::ComponentKind;

/// One set of variance components.
///
/// Components that are not active in the model are `None`. The observation
/// variance is always present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Variances {
    /// Observation noise variance σ²_ε.
    pub observation: f64,
    /// Level innovation variance σ²_μ.
    pub level: Option<f64>,
    /// Trend innovation variance σ²_δ.
    pub trend: Option<f64>,
    /// Seasonal innovation variance σ²_s.
    pub seasonal: Option<f64>,
}

impl Variances {
    /// Variance of a component, if it is active.
    pub fn get(&self, kind: ComponentKind) -> Option<f64> {
        match kind {
            ComponentKind::Observation => Some(self.observation),
            ComponentKind::Level => self.level,
            ComponentKind::Trend => self.trend,
            ComponentKind::Seasonal => self.seasonal,
            ComponentKind::Regression => None,
        }
    }

    /// Overwrite the variance of an active state component.
    pub fn set(&mut self, kind: ComponentKind, value: f64) {
        match kind {
            ComponentKind::Observation => self.observation = value,
            ComponentKind::Level => self.level = Some(value),
            ComponentKind::Trend => self.trend = Some(value),
            ComponentKind::Seasonal => self.seasonal = Some(value),
            ComponentKind::Regression => {}
        }
    }
}
