//! Type aliases and common types.

use nalgebra::{DMatrix, DVector};

/// Dense, heap-allocated matrix used for state covariances and designs.
pub type Matrix = DMatrix<f64>;

/// Dense, heap-allocated vector used for states and coefficients.
pub type Vector = DVector<f64>;

/// One response value. `None` marks an absent observation: missing data in
/// the pre-period, or any post-period step while fitting.
pub type Observation = Option<f64>;
