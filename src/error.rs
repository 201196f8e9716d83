//! Errors returned by the analysis facade.

use causal_impact_core::SamplerError;

/// Result alias for facade operations.
pub type ImpactResult<T> = Result<T, ImpactError>;

/// Failure of an impact analysis.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImpactError {
    /// Fewer than three non-missing response values.
    #[error("response must contain at least 3 non-missing values, found {found}")]
    TooFewObservations {
        /// Non-missing values found.
        found: usize,
    },

    /// The pre-period response has zero variance.
    #[error("pre-period response is constant ({value}); nothing to model")]
    ConstantResponse {
        /// The constant value.
        value: f64,
    },

    /// A response value is infinite.
    #[error("response value at index {index} is not finite")]
    NonFiniteResponse {
        /// Offending index.
        index: usize,
    },

    /// A control column differs in length from the response.
    #[error("control {control} has {found} values but the response has {expected}")]
    ControlLength {
        /// Control column.
        control: usize,
        /// Response length.
        expected: usize,
        /// Column length.
        found: usize,
    },

    /// A control column contains a missing or non-finite value.
    #[error("control {control} has a missing or non-finite value at index {index}")]
    MissingControlValue {
        /// Control column.
        control: usize,
        /// Offending index.
        index: usize,
    },

    /// The pre/post ranges are out of bounds or overlap.
    #[error("invalid periods: {reason}")]
    InvalidPeriods {
        /// What was wrong.
        reason: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// A chain stopped early and incomplete draws were not accepted.
    #[error("chain {chain} did not complete: {source}")]
    ChainFailed {
        /// Chain index.
        chain: usize,
        /// Underlying failure.
        #[source]
        source: SamplerError,
    },

    /// A chain was cancelled and incomplete draws were not accepted.
    #[error("sampling was cancelled after {completed} of {requested} iterations")]
    IncompleteDraws {
        /// Iterations completed across chains.
        completed: usize,
        /// Iterations requested across chains.
        requested: usize,
    },

    /// Failure inside the inference engine.
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

impl ImpactError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub(crate) fn periods(reason: impl Into<String>) -> Self {
        Self::InvalidPeriods {
            reason: reason.into(),
        }
    }
}
