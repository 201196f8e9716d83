//! Structural time-series model definition.
//!
//! - **Specification** (`spec`): immutable component toggles, priors and
//!   sampling counts
//! - **State space** (`state_space`): transition, loading and noise matrices
//!   assembled once from a specification
//! - **Variances** (`variances`): the current set of variance components

pub mod spec;
pub mod state_space;
pub mod variances;

use core::fmt;

use serde::{Deserialize, Serialize};

pub use spec::{Coupling, InverseGammaPrior, ModelSpec, Priors, RegressionPrior, SamplingConfig};
pub use state_space::{Block, InitialState, StateSpaceModel};
pub use variances::Variances;

/// Named model components, used to index variances and to report which part
/// of the model a numerical failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Observation noise.
    Observation,
    /// Local level random walk.
    Level,
    /// Local trend (slope) random walk.
    Trend,
    /// Seasonal dummies with sum-to-zero identification.
    Seasonal,
    /// Static regression over control series.
    Regression,
}

impl ComponentKind {
    /// Lowercase display name.
    pub fn name(&self) -> &'static str {
        match self {
            ComponentKind::Observation => "observation",
            ComponentKind::Level => "level",
            ComponentKind::Trend => "trend",
            ComponentKind::Seasonal => "seasonal",
            ComponentKind::Regression => "regression",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
