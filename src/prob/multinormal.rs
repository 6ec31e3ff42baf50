use nalgebra::*;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::fmt::{self, Display};
use rand::Rng;
use rand_distr::StandardNormal;
use crate::error::{ModelError, Result};

/// Multivariate normal parametrized by μ (px1) and Σ (pxp). Besides the moments, this
/// structure caches the precision matrix Σ⁻¹ and the factor |Σ|^-1/2, which are what
/// density evaluation and mode search actually read. Anything that changes the moments
/// leaves the caches stale until update() is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiNormal {

    mu : DVector<f64>,

    sigma : DMatrix<f64>,

    sigma_inv : DMatrix<f64>,

    /// |Σ|^-1/2
    det_factor : f64,

    fresh : bool
}

impl MultiNormal {

    /// Builds a new multivariate normal from a mean vector and a positive-definite
    /// covariance matrix, with its caches computed.
    pub fn new(mu : DVector<f64>, sigma : DMatrix<f64>) -> Result<Self> {
        let mut mn = Self::from_moments(mu, sigma)?;
        mn.update()?;
        Ok(mn)
    }

    /// Builds the distribution without computing the caches.
    pub fn from_moments(mu : DVector<f64>, sigma : DMatrix<f64>) -> Result<Self> {
        if sigma.nrows() != sigma.ncols() || mu.nrows() != sigma.nrows() {
            return Err(ModelError::DimensionMismatch { expected : mu.nrows(), found : sigma.nrows() });
        }
        Ok(Self {
            sigma_inv : DMatrix::zeros(0, 0),
            det_factor : std::f64::NAN,
            fresh : false,
            mu,
            sigma
        })
    }

    /// Recomputes Σ⁻¹ and |Σ|^-1/2 from the current covariance.
    pub fn update(&mut self) -> Result<()> {
        let (sigma_inv, det_factor) = factorize(&self.sigma)?;
        self.sigma_inv = sigma_inv;
        self.det_factor = det_factor;
        self.fresh = true;
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.mu.nrows()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mu
    }

    pub fn cov(&self) -> &DMatrix<f64> {
        &self.sigma
    }

    pub fn cov_inv(&self) -> &DMatrix<f64> {
        debug_assert!(self.fresh, "precision read before update()");
        &self.sigma_inv
    }

    pub fn det_factor(&self) -> f64 {
        debug_assert!(self.fresh, "determinant factor read before update()");
        self.det_factor
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// (2π)^(-k/2) |Σ|^-1/2 exp(-½ (x-μ)ᵀ Σ⁻¹ (x-μ))
    pub fn density(&self, x : &DVector<f64>) -> f64 {
        self.log_density(x).exp()
    }

    pub fn log_density(&self, x : &DVector<f64>) -> f64 {
        let k = self.dim() as f64;
        let xmu = x - &self.mu;
        let quad = (xmu.transpose() * self.cov_inv() * &xmu)[0];
        -0.5 * k * (2. * PI).ln() + self.det_factor().ln() - 0.5 * quad
    }

    /// Density at the mean, where the exponential term vanishes.
    pub fn peak(&self) -> f64 {
        (2. * PI).powf(-(self.dim() as f64) / 2.) * self.det_factor()
    }

    /// Reduced multivariate normal over the informed dimensions. Marginals of a
    /// Gaussian are exact: the corresponding entries are just copied.
    pub fn marginal(&self, keep : &[usize]) -> MultiNormal {
        MultiNormal {
            mu : self.mu.select_rows(keep.iter()),
            sigma : self.sigma.select_rows(keep.iter()).select_columns(keep.iter()),
            sigma_inv : DMatrix::zeros(0, 0),
            det_factor : std::f64::NAN,
            fresh : false
        }
    }

    /// Distribution of the dimensions at keep when the dimensions at fixed are held at
    /// value:
    ///
    /// μ' = μ_i + Σ_ij Σ_jj⁻¹ (x_j - μ_j)
    /// Σ' = Σ_ii - Σ_ij Σ_jj⁻¹ Σ_ji (upper Schur complement)
    pub fn conditional(&self, keep : &[usize], fixed : &[usize], value : &DVector<f64>) -> Result<MultiNormal> {
        if fixed.len() != value.nrows() {
            return Err(ModelError::DimensionMismatch { expected : fixed.len(), found : value.nrows() });
        }
        let mu_i = self.mu.select_rows(keep.iter());
        let mu_j = self.mu.select_rows(fixed.iter());
        let sigma_ii = self.sigma.select_rows(keep.iter()).select_columns(keep.iter());
        let sigma_ij = self.sigma.select_rows(keep.iter()).select_columns(fixed.iter());
        let sigma_jj = self.sigma.select_rows(fixed.iter()).select_columns(fixed.iter());
        let sigma_ji = self.sigma.select_rows(fixed.iter()).select_columns(keep.iter());
        let (partial_inv, _) = factorize(&sigma_jj)?;
        let gain = sigma_ij * partial_inv;
        let mu = mu_i + &gain * (value - mu_j);
        let sigma = build_symmetric(sigma_ii - gain * sigma_ji);
        MultiNormal::from_moments(mu, sigma)
    }

    /// Draws a single realization as μ + L z, where L is the Cholesky factor of Σ.
    pub fn sample<R>(&self, rng : &mut R) -> Result<DVector<f64>>
    where
        R : Rng
    {
        let chol = Cholesky::new(self.sigma.clone()).ok_or(ModelError::SingularCovariance)?;
        let z = DVector::from_fn(self.dim(), |_, _| rng.sample::<f64, _>(StandardNormal) );
        Ok(&self.mu + chol.l() * z)
    }

}

impl Display for MultiNormal {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MNorm({})", self.mu.nrows())
    }

}

/// Returns Σ⁻¹ and |Σ|^-1/2 from a single Cholesky factorization (|Σ| = Π diag(L)²).
pub fn factorize(s : &DMatrix<f64>) -> Result<(DMatrix<f64>, f64)> {
    let chol = Cholesky::new(s.clone()).ok_or(ModelError::SingularCovariance)?;
    let diag_prod = chol.l_dirty().diagonal().iter().fold(1.0, |acc, d| acc * d );
    let det_factor = 1. / diag_prod;
    if !det_factor.is_finite() {
        return Err(ModelError::SingularCovariance);
    }
    Ok((chol.inverse(), det_factor))
}

/// Builds a symmetric matrix from M as (1/2)*(M + M^T)
pub fn build_symmetric(m : DMatrix<f64>) -> DMatrix<f64> {
    assert!(m.nrows() == m.ncols(), "build_symmetric: Informed non-square matrix");
    let mt = m.transpose();
    (m + mt).scale(0.5)
}

/// Verifies if the informed matrix is symmetric and positive semi-definite,
/// up to the informed tolerance.
pub fn is_psd(m : &DMatrix<f64>, tol : f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    let asym = (m - m.transpose()).abs().max();
    if asym > tol {
        return false;
    }
    let eigen = SymmetricEigen::new(m.clone());
    eigen.eigenvalues.iter().all(|e| *e >= -tol )
}

/// Outer product d dᵀ.
pub fn dyad(d : &DVector<f64>) -> DMatrix<f64> {
    d * d.transpose()
}
