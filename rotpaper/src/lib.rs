//! Figure and table generation for the Kepler tidally-synchronized binary
//! paper
//!
//! Ties the catalog, model, and statistics crates together into the figure
//! functions, table writers, and significance reports the paper needs, plus
//! the CLI registry that maps figure-name tokens to those functions.

use std::path::PathBuf;
use thiserror::Error;

pub mod context;
pub mod figures;
pub mod output;
pub mod samples;
pub mod significance;
pub mod style;
pub mod tables;

pub use context::Context;

/// Errors raised while generating paper outputs
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] catalogs::CatalogError),

    #[error(transparent)]
    Isochrone(#[from] isochrones::IsochroneError),

    #[error(transparent)]
    Fit(#[from] rotmath::FitError),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("figure rendering failed: {0}")]
    Draw(String),

    #[error("unknown figure name: {0:?} (run with --list-figs)")]
    UnknownFigure(String),
}

impl<E: std::error::Error + Send + Sync> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for Error
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        Error::Draw(err.to_string())
    }
}

/// Standard Result type for paper-output operations
pub type Result<T> = std::result::Result<T, Error>;
