//! Small dense linear-algebra kernels shared by the filter and the samplers.
//!
//! Everything here works on nalgebra's dynamically sized matrices. The state
//! dimension is fixed once per model (level + trend + seasonal lags), so the
//! hot loops reuse the same shapes every iteration.
//!
//! Positive-definiteness is handled the same way everywhere: try a plain
//! Cholesky factorization, then escalate through [`JITTER_LADDER`] relative to
//! the mean diagonal. Sampling from a covariance that is only positive
//! semi-definite falls back to a clipped symmetric eigendecomposition.

use nalgebra::{Cholesky, Dyn, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::constants::{JITTER_LADDER, POSITIVITY_TOLERANCE};
use crate::math;
use crate::types::{Matrix, Vector};

/// Cholesky factor of a dynamically sized SPD matrix.
pub type CholeskyFactor = Cholesky<f64, Dyn>;

/// Replace `m` with `(m + mᵀ) / 2` in place.
pub fn symmetrize(m: &mut Matrix) {
    let n = m.nrows();
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (m[(i, j)] + m[(j, i)]);
            m[(i, j)] = avg;
            m[(j, i)] = avg;
        }
    }
}

/// Mean of the absolute diagonal, floored at 1 so jitter has a usable scale.
pub fn diagonal_scale(m: &Matrix) -> f64 {
    let n = m.nrows();
    if n == 0 {
        return 1.0;
    }
    let mean = m.diagonal().iter().map(|&d| math::abs(d)).sum::<f64>() / n as f64;
    mean.max(1.0)
}

/// Add `jitter` to every diagonal element in place.
pub fn add_diagonal(m: &mut Matrix, jitter: f64) {
    if jitter == 0.0 {
        return;
    }
    for i in 0..m.nrows().min(m.ncols()) {
        m[(i, i)] += jitter;
    }
}

/// Cholesky factorization that rejects zero or non-finite pivots.
pub fn factor(m: &Matrix) -> Option<CholeskyFactor> {
    let chol = Cholesky::new(m.clone())?;
    let l = chol.l_dirty();
    let usable = (0..l.nrows()).all(|i| l[(i, i)] > 0.0 && l[(i, i)].is_finite());
    if usable {
        Some(chol)
    } else {
        None
    }
}

/// Factor an SPD matrix, escalating diagonal jitter when the plain
/// factorization fails.
///
/// Returns the factor and the absolute jitter that was needed (0 when the
/// matrix factored as given), or `None` if even the largest jitter failed.
pub fn cholesky_jittered(m: &Matrix) -> Option<(CholeskyFactor, f64)> {
    if let Some(chol) = factor(m) {
        return Some((chol, 0.0));
    }
    let scale = diagonal_scale(m);
    for &rel in &JITTER_LADDER {
        let jitter = rel * scale;
        let mut jittered = m.clone();
        add_diagonal(&mut jittered, jitter);
        if let Some(chol) = factor(&jittered) {
            return Some((chol, jitter));
        }
    }
    None
}

/// log |A| from the Cholesky factor of A.
pub fn log_det(chol: &CholeskyFactor) -> f64 {
    let l = chol.l_dirty();
    (0..l.nrows()).map(|i| math::ln(l[(i, i)])).sum::<f64>() * 2.0
}

/// bᵀ A⁻¹ b from the Cholesky factor of A, computed as ‖L⁻¹ b‖².
pub fn inverse_quadratic_form(chol: &CholeskyFactor, b: &Vector) -> f64 {
    let l = chol.l();
    match l.solve_lower_triangular(b) {
        Some(y) => y.dot(&y),
        None => b.dot(&chol.solve(b)),
    }
}

/// Draw a vector of independent standard normals.
pub fn standard_normal_vector<R: Rng>(n: usize, rng: &mut R) -> Vector {
    Vector::from_fn(n, |_, _| rng.sample(StandardNormal))
}

/// Draw from N(mean, cov) for a symmetric positive semi-definite `cov`.
///
/// Uses a Cholesky factor when one exists. A singular but PSD covariance
/// (deterministic directions, e.g. a state with no innovation) goes through a
/// symmetric eigendecomposition with tiny negative eigenvalues clipped to
/// zero. Returns `None` if an eigenvalue is negative beyond tolerance.
pub fn sample_gaussian<R: Rng>(mean: &Vector, cov: &Matrix, rng: &mut R) -> Option<Vector> {
    let n = mean.len();
    if n == 0 {
        return Some(mean.clone());
    }

    if let Some(chol) = factor(cov) {
        let z = standard_normal_vector(n, rng);
        return Some(mean + chol.l() * z);
    }

    let scale = diagonal_scale(cov);
    let eigen = SymmetricEigen::new(cov.clone());
    let min_eigenvalue = eigen.eigenvalues.iter().cloned().fold(f64::INFINITY, f64::min);
    if min_eigenvalue < -POSITIVITY_TOLERANCE * scale * 1e3 {
        return None;
    }

    let z = standard_normal_vector(n, rng);
    let scaled = Vector::from_fn(n, |i, _| math::sqrt(eigen.eigenvalues[i].max(0.0)) * z[i]);
    Some(mean + &eigen.eigenvectors * scaled)
}

/// Draw from N(Λ⁻¹ b, Λ⁻¹) given a precision matrix Λ.
///
/// The mean comes from a Cholesky solve and the noise from L⁻ᵀ z, so Λ is
/// never inverted explicitly. Returns `None` if Λ cannot be factored.
pub fn sample_from_precision<R: Rng>(
    precision: &Matrix,
    b: &Vector,
    rng: &mut R,
) -> Option<Vector> {
    let n = b.len();
    if n == 0 {
        return Some(Vector::zeros(0));
    }
    let (chol, _) = cholesky_jittered(precision)?;
    let mean = chol.solve(b);
    let z = standard_normal_vector(n, rng);
    let noise = chol.l().tr_solve_lower_triangular(&z)?;
    Some(mean + noise)
}

/// Smallest diagonal element and its index, if any.
pub fn min_diagonal(m: &Matrix) -> Option<(usize, f64)> {
    m.diagonal()
        .iter()
        .cloned()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
}
