//! Stellar catalog access for the Kepler tidal-synchronization analysis
//!
//! This crate provides typed rows for the pre-computed input catalogs
//! (APOGEE spectroscopy, Kepler photometric stellar parameters, McQuillan
//! rotation periods, the Villanova eclipsing-binary list), CSV readers for
//! each, a caching store that loads every catalog at most once per process,
//! identifier cross-matching, and the sample splitter used to tag rows with
//! named selection criteria.

use std::path::PathBuf;
use thiserror::Error;

pub mod io;
pub mod rows;
pub mod splitter;
pub mod store;
pub mod xmatch;

pub use rows::{ApogeeStar, EclipsingBinary, KicStar, RotationPeriod};
pub use splitter::SampleSplitter;
pub use store::CatalogStore;

/// Errors raised while loading or selecting catalog data
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse { path: PathBuf, source: csv::Error },

    #[error("catalog data directory does not exist: {0}")]
    MissingDataDir(PathBuf),

    #[error("unknown splitter criterion: {0:?} (criteria must be tagged before use)")]
    UnknownCriterion(String),

    #[error("subsample {0:?} selected no rows")]
    EmptySample(String),
}

/// Standard Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;
