//! Multivariate normal sampling for coefficient draws.
//!
//! Draws are generated as `β = μ + L z` where `L` is the lower Cholesky factor
//! of the covariance matrix and `z` is a vector of independent standard normals.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;

/// Lower Cholesky factor of a symmetric positive (semi-)definite matrix.
///
/// Returns `None` if the matrix is not square or not positive definite even
/// after a small diagonal jitter (semi-definite covariances are common when a
/// coefficient is fixed).
pub fn cholesky_lower(cov: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if !cov.is_square() || cov.iter().any(|v| !v.is_finite()) {
        return None;
    }
    if let Some(chol) = cov.clone().cholesky() {
        return Some(chol.l());
    }

    let scale = cov.diagonal().iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    for &eps in &[1e-12, 1e-10, 1e-8] {
        let jittered = cov + DMatrix::<f64>::identity(cov.nrows(), cov.ncols()) * (eps * scale);
        if let Some(chol) = jittered.cholesky() {
            return Some(chol.l());
        }
    }
    None
}

/// Draw `n` samples from `N(mean, L Lᵀ)`; one sample per row of the result.
pub fn sample_mvn<R: Rng + ?Sized>(
    rng: &mut R,
    mean: &DVector<f64>,
    lower: &DMatrix<f64>,
    n: usize,
) -> DMatrix<f64> {
    let p = mean.len();
    let mut out = DMatrix::<f64>::zeros(n, p);
    let mut z = DVector::<f64>::zeros(p);
    for i in 0..n {
        for zj in z.iter_mut() {
            *zj = rng.sample(StandardNormal);
        }
        let draw = mean + lower * &z;
        out.row_mut(i).copy_from(&draw.transpose());
    }
    out
}
