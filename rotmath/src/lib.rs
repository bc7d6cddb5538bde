//! Statistics and curve fitting for the rotation-synchronization analysis
//!
//! Small numerical toolkit shared by the catalog-analysis crates: order
//! statistics, robust scatter estimates, histogramming, binomial and Poisson
//! interval estimates, polynomial least squares, a bounded double-Gaussian
//! fitter, and natural cubic splines.

use thiserror::Error;

pub mod fitting;
pub mod stats;

pub use fitting::{polyfit, CubicSpline, DoubleGaussian, DoubleGaussianFit, Polynomial};

/// Errors raised by the fitting routines
#[derive(Debug, Error)]
pub enum FitError {
    #[error("fit needs at least {needed} points, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("input lengths differ: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("least-squares system is singular: {0}")]
    Singular(String),

    #[error("spline abscissas must be strictly increasing")]
    UnsortedAbscissas,
}

/// Standard Result type for fitting operations
pub type Result<T> = std::result::Result<T, FitError>;
