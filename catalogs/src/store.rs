//! Caching catalog store
//!
//! Every accessor loads its catalog file at most once per process and hands
//! out a shared slice. The data directory is resolved from the
//! `ROTPAPER_DATA` environment variable, with an explicit-path override for
//! tests and one-off runs.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::io;
use crate::rows::{ApogeeStar, EclipsingBinary, KicStar, NonDetection, RotationPeriod};
use crate::{CatalogError, Result};

/// Environment variable pointing at the catalog data directory
pub const DATA_DIR_ENV: &str = "ROTPAPER_DATA";

/// Memoizing loader for the pre-computed input catalogs.
pub struct CatalogStore {
    root: PathBuf,
    apogee: OnceCell<Arc<[ApogeeStar]>>,
    kic_stars: OnceCell<Arc<[KicStar]>>,
    mcquillan: OnceCell<Arc<[RotationPeriod]>>,
    mcquillan_nondet: OnceCell<Arc<[NonDetection]>>,
    ebs: OnceCell<Arc<[EclipsingBinary]>>,
}

impl CatalogStore {
    /// Create a store rooted at an explicit data directory.
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CatalogError::MissingDataDir(root));
        }
        Ok(Self {
            root,
            apogee: OnceCell::new(),
            kic_stars: OnceCell::new(),
            mcquillan: OnceCell::new(),
            mcquillan_nondet: OnceCell::new(),
            ebs: OnceCell::new(),
        })
    }

    /// Create a store rooted at `$ROTPAPER_DATA`, defaulting to `./data`.
    pub fn from_env() -> Result<Self> {
        let root = env::var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        Self::new(root)
    }

    /// The resolved data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// APOGEE spectroscopic cross-match, loaded once.
    pub fn apogee(&self) -> Result<Arc<[ApogeeStar]>> {
        self.apogee
            .get_or_try_init(|| {
                io::read_apogee(self.root.join("apogee_allstar.csv")).map(Arc::from)
            })
            .cloned()
    }

    /// Photometric stellar parameters for the full target list, loaded once.
    pub fn kic_stars(&self) -> Result<Arc<[KicStar]>> {
        self.kic_stars
            .get_or_try_init(|| io::read_kic_stars(self.root.join("kic_stars.csv")).map(Arc::from))
            .cloned()
    }

    /// McQuillan rotation periods, loaded once.
    pub fn mcquillan(&self) -> Result<Arc<[RotationPeriod]>> {
        self.mcquillan
            .get_or_try_init(|| io::read_mcquillan(self.root.join("mcquillan.csv")).map(Arc::from))
            .cloned()
    }

    /// McQuillan targets without a period detection, loaded once.
    pub fn mcquillan_nondetections(&self) -> Result<Arc<[NonDetection]>> {
        self.mcquillan_nondet
            .get_or_try_init(|| {
                io::read_mcquillan_nondetections(self.root.join("mcquillan_nondetections.csv"))
                    .map(Arc::from)
            })
            .cloned()
    }

    /// Villanova eclipsing binaries, loaded once.
    pub fn ebs(&self) -> Result<Arc<[EclipsingBinary]>> {
        self.ebs
            .get_or_try_init(|| io::read_ebs(self.root.join("villanova_ebs.csv")).map(Arc::from))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seed_store(dir: &Path) {
        fs::write(
            dir.join("mcquillan.csv"),
            "kepid,prot,prot_err,rper\n100,5.0,0.1,200.0\n101,14.0,0.2,310.0\n",
        )
        .unwrap();
    }

    #[test]
    fn test_missing_root_rejected() {
        let result = CatalogStore::new("/definitely/not/here");
        assert!(matches!(result, Err(CatalogError::MissingDataDir(_))));
    }

    #[test]
    fn test_loads_are_memoized() {
        let dir = tempfile::tempdir().unwrap();
        seed_store(dir.path());
        let store = CatalogStore::new(dir.path()).unwrap();

        let first = store.mcquillan().unwrap();
        assert_eq!(first.len(), 2);

        // Deleting the file after the first load must not matter: the second
        // access comes out of the cache.
        fs::remove_file(dir.path().join("mcquillan.csv")).unwrap();
        let second = store.mcquillan().unwrap();
        assert_eq!(second.len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path()).unwrap();
        assert!(store.apogee().is_err());
    }
}
