//! CSV readers for the input catalogs
//!
//! All catalogs are row-oriented CSV exports with a header line. Empty
//! numeric fields deserialize to `None`.

use std::fs::File;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::rows::{ApogeeStar, EclipsingBinary, KicStar, NonDetection, RotationPeriod};
use crate::{CatalogError, Result};

/// Deserialize a 0/1 integer column as a boolean flag.
pub fn bool_from_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = u8::deserialize(deserializer)?;
    Ok(value != 0)
}

/// Read every record of a headered CSV file into a vector of typed rows.
pub fn read_csv_rows<T, P>(path: P) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: T = record.map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }
    log::debug!("read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read the APOGEE spectroscopic cross-match.
pub fn read_apogee<P: AsRef<Path>>(path: P) -> Result<Vec<ApogeeStar>> {
    read_csv_rows(path)
}

/// Read the photometric stellar-parameter table for the Kepler target list.
pub fn read_kic_stars<P: AsRef<Path>>(path: P) -> Result<Vec<KicStar>> {
    read_csv_rows(path)
}

/// Read the McQuillan rotation-period catalog.
pub fn read_mcquillan<P: AsRef<Path>>(path: P) -> Result<Vec<RotationPeriod>> {
    read_csv_rows(path)
}

/// Read the list of McQuillan targets without a period detection.
pub fn read_mcquillan_nondetections<P: AsRef<Path>>(path: P) -> Result<Vec<NonDetection>> {
    read_csv_rows(path)
}

/// Read the Villanova eclipsing-binary catalog.
pub fn read_ebs<P: AsRef<Path>>(path: P) -> Result<Vec<EclipsingBinary>> {
    read_csv_rows(path)
}
