//! State-space form of the structural model.
//!
//! ```text
//! yₜ   = Zᵀ αₜ + xₜᵀ β + εₜ,        εₜ ~ N(0, σ²_ε)
//! αₜ₊₁ = T αₜ + ηₜ,                ηₜ ~ N(0, diag(σ²) on noisy indices)
//! ```
//!
//! The state vector stacks the active blocks in a fixed order:
//!
//! | block    | dim   | transition                          | loading |
//! |----------|-------|-------------------------------------|---------|
//! | level    | 1     | μₜ₊₁ = μₜ (+ δₜ with trend)         | 1       |
//! | trend    | 1     | δₜ₊₁ = δₜ                           | 0       |
//! | seasonal | P − 1 | sₜ₊₁ = −Σ sₜ₋ⱼ, lags shift down    | 1, 0, … |
//!
//! The regression component carries no latent state: its contribution
//! xₜᵀβ enters as a known observation offset, subtracted before filtering.
//! Blocks are assembled once from the [`ModelSpec`]; nothing here is mutated
//! during sampling.

use alloc::vec::Vec;

use crate::error::SamplerResult;
use crate::model::{ComponentKind, ModelSpec, Variances};
use crate::types::{Matrix, Vector};

/// One contiguous block of the state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Component this block implements.
    pub kind: ComponentKind,
    /// Index of the first state element of the block.
    pub offset: usize,
    /// Number of state elements.
    pub dim: usize,
    /// State index receiving the block's innovation.
    pub noise_index: usize,
}

/// Prior on the first state, derived from the pre-period data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialState {
    /// Mean of the initial level (first observed pre-period value).
    pub level_mean: f64,
    /// Variance placed on every initial state element.
    pub variance: f64,
}

/// Linear-Gaussian state-space matrices for one specification.
#[derive(Debug, Clone)]
pub struct StateSpaceModel {
    blocks: Vec<Block>,
    transition: Matrix,
    loading: Vector,
    dim: usize,
}

impl StateSpaceModel {
    /// Assemble the transition and loading from a specification.
    ///
    /// The specification must already have been validated; this only fails if
    /// it describes no component at all.
    pub fn new(spec: &ModelSpec) -> SamplerResult<Self> {
        if !spec.has_components() {
            return Err(crate::error::SamplerError::invalid(
                "model has no active components (level, trend, seasonal or regression)",
            ));
        }

        let mut blocks = Vec::new();
        let mut offset = 0;
        if spec.level {
            blocks.push(Block {
                kind: ComponentKind::Level,
                offset,
                dim: 1,
                noise_index: offset,
            });
            offset += 1;
        }
        if spec.trend {
            blocks.push(Block {
                kind: ComponentKind::Trend,
                offset,
                dim: 1,
                noise_index: offset,
            });
            offset += 1;
        }
        if let Some(period) = spec.seasonal_period {
            blocks.push(Block {
                kind: ComponentKind::Seasonal,
                offset,
                dim: period - 1,
                noise_index: offset,
            });
            offset += period - 1;
        }
        let dim = offset;

        let mut transition = Matrix::zeros(dim, dim);
        let mut loading = Vector::zeros(dim);
        let level_index = blocks.iter().find(|b| b.kind == ComponentKind::Level).map(|b| b.offset);

        for block in &blocks {
            let o = block.offset;
            match block.kind {
                ComponentKind::Level => {
                    transition[(o, o)] = 1.0;
                    loading[o] = 1.0;
                }
                ComponentKind::Trend => {
                    transition[(o, o)] = 1.0;
                    if let Some(level) = level_index {
                        transition[(level, o)] = 1.0;
                    }
                }
                ComponentKind::Seasonal => {
                    for j in 0..block.dim {
                        transition[(o, o + j)] = -1.0;
                    }
                    for j in 1..block.dim {
                        transition[(o + j, o + j - 1)] = 1.0;
                    }
                    loading[o] = 1.0;
                }
                ComponentKind::Observation | ComponentKind::Regression => {}
            }
        }

        Ok(Self {
            blocks,
            transition,
            loading,
            dim,
        })
    }

    /// Dimension of the latent state (0 for a regression-only model).
    pub fn state_dim(&self) -> usize {
        self.dim
    }

    /// Active state blocks, in state order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Transition matrix T.
    pub fn transition(&self) -> &Matrix {
        &self.transition
    }

    /// Observation loading Z.
    pub fn loading(&self) -> &Vector {
        &self.loading
    }

    /// Component owning state index `index`.
    pub fn component_at(&self, index: usize) -> ComponentKind {
        self.blocks
            .iter()
            .find(|b| index >= b.offset && index < b.offset + b.dim)
            .map(|b| b.kind)
            .unwrap_or(ComponentKind::Observation)
    }

    /// Process-noise covariance (diagonal, non-zero only on noise indices).
    pub fn state_noise(&self, variances: &Variances) -> Matrix {
        let mut q = Matrix::zeros(self.dim, self.dim);
        for block in &self.blocks {
            if let Some(v) = variances.get(block.kind) {
                q[(block.noise_index, block.noise_index)] = v;
            }
        }
        q
    }

    /// Mean and covariance of the first state.
    pub fn initial_distribution(&self, init: &InitialState) -> (Vector, Matrix) {
        let mut mean = Vector::zeros(self.dim);
        if let Some(level) = self.blocks.iter().find(|b| b.kind == ComponentKind::Level) {
            mean[level.offset] = init.level_mean;
        }
        let cov = Matrix::from_diagonal_element(self.dim, self.dim, init.variance);
        (mean, cov)
    }

    /// Structural contribution Zᵀα to the observation.
    pub fn observation_mean(&self, state: &Vector) -> f64 {
        self.loading.dot(state)
    }

    /// Propagate a state one step through T without noise.
    pub fn project(&self, state: &Vector) -> Vector {
        &self.transition * state
    }
}
