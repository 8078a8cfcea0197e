//! The regression capability the imputation engine trains per country.

use crate::error::Result;

/// A supervised regressor over dense row-major feature matrices.
///
/// Implementations must tolerate NaN feature values at both fit and
/// predict time; the engine never pre-fills the covariates it passes
/// in.
pub trait Regressor {
    /// Train on the given rows. `features` and `targets` have equal length.
    fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()>;

    /// Predict one value per feature row.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;
}
