//! Stellar model grids for the Kepler tidal-synchronization analysis
//!
//! Loads MIST and DSEP isochrone grids, interpolates them to predicted
//! absolute Ks magnitudes at a requested temperature, metallicity, and age,
//! and computes the magnitude excesses (observed minus model) that serve as
//! the photometric binarity indicator. The empirical main-sequence
//! flattening corrections over metallicity and temperature live here too.

use std::path::PathBuf;
use thiserror::Error;

pub mod corrections;
pub mod excess;
pub mod grid;

pub use corrections::{flatten_ms_metallicity, flatten_ms_temperature, Polynomial};
pub use grid::{Isochrone, IsochroneSet, ModelGrid};

/// Reference metallicity of the Kepler field sample (dex)
pub const REFERENCE_FEH: f64 = 0.08;

/// Reference main-sequence age for excess computation (Gyr)
pub const REFERENCE_AGE_GYR: f64 = 1.0;

/// Errors raised while loading or evaluating model grids
#[derive(Debug, Error)]
pub enum IsochroneError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: csv::Error },

    #[error("no isochrone files found under {0}")]
    EmptyGrid(PathBuf),

    #[error("isochrone grid is not sorted in {0}")]
    UnsortedGrid(&'static str),

    #[error("correction fit needs at least {needed} populated bins, got {got}")]
    TooFewBins { needed: usize, got: usize },

    #[error("least-squares fit is degenerate: {0}")]
    DegenerateFit(String),
}

/// Standard Result type for isochrone operations
pub type Result<T> = std::result::Result<T, IsochroneError>;
