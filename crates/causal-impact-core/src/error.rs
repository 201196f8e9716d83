//! Error types surfaced by the inference engine.

use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::model::ComponentKind;

/// Failure raised while validating inputs or while sampling.
///
/// Every variant carries enough context (offending time index, component or
/// iteration) to diagnose the failure without re-running the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum SamplerError {
    /// Malformed inputs or configuration, detected before sampling starts.
    #[error("invalid specification: {reason}")]
    InvalidSpecification {
        /// What was wrong with the inputs.
        reason: String,
    },

    /// A covariance or variance lost positivity beyond tolerance.
    #[error(
        "numerical instability in {component} component at time {time} (iteration {iteration:?}): {detail}"
    )]
    NumericalInstability {
        /// Time index at which the violation was detected.
        time: usize,
        /// Component owning the offending variance.
        component: ComponentKind,
        /// Gibbs iteration, attached by the driver.
        iteration: Option<usize>,
        /// Offending quantity.
        detail: String,
    },

    /// No invertible subset of controls of acceptable size could be formed.
    #[error("singular regression design (iteration {iteration:?}): {reason}")]
    SingularDesign {
        /// Why the design could not be used.
        reason: String,
        /// Gibbs iteration, attached by the driver.
        iteration: Option<usize>,
    },

    /// The draws collection stopped early and was not explicitly accepted.
    #[error("draws collection is incomplete ({completed} of {requested} iterations)")]
    IncompleteDraws {
        /// Iterations fully completed.
        completed: usize,
        /// Iterations requested.
        requested: usize,
    },
}

impl SamplerError {
    /// Convenience constructor for [`SamplerError::InvalidSpecification`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`SamplerError::SingularDesign`].
    pub fn singular(reason: impl Into<String>) -> Self {
        Self::SingularDesign {
            reason: reason.into(),
            iteration: None,
        }
    }

    /// Whether the driver may retry the iteration with added jitter.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NumericalInstability { .. } | Self::SingularDesign { .. }
        )
    }

    /// Attach the Gibbs iteration index to a sampling failure.
    pub fn at_iteration(self, index: usize) -> Self {
        match self {
            Self::NumericalInstability {
                time,
                component,
                detail,
                ..
            } => Self::NumericalInstability {
                time,
                component,
                iteration: Some(index),
                detail,
            },
            Self::SingularDesign { reason, .. } => Self::SingularDesign {
                reason,
                iteration: Some(index),
            },
            other => other,
        }
    }
}

/// Result alias for engine operations.
pub type SamplerResult<T> = Result<T, SamplerError>;
