//! Shared analysis context
//!
//! Owns the catalog store, the model grids, and the derived samples. Every
//! expensive product (grid load, sample assembly, correction derivation) is
//! memoized so figure functions can ask for what they need without
//! coordinating among themselves.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use catalogs::{CatalogStore, SampleSplitter};
use isochrones::{IsochroneSet, ModelGrid};

use crate::output::OutputPaths;
use crate::samples::{self, CorrectionSet, SampleStar};
use crate::Result;

/// How the model grids are obtained.
enum ModelSource {
    /// Load from `<data_dir>/<model>/` grid files
    DataDir,
    /// Synthetic analytic grids (tests and demos)
    Synthetic,
}

pub struct Context {
    store: CatalogStore,
    out: OutputPaths,
    model_source: ModelSource,
    mist: OnceCell<Arc<IsochroneSet>>,
    dsep: OnceCell<Arc<IsochroneSet>>,
    apogee: OnceCell<(Arc<SampleSplitter<SampleStar>>, Arc<CorrectionSet>)>,
    mcquillan: OnceCell<Arc<SampleSplitter<SampleStar>>>,
    nondetections: OnceCell<Arc<SampleSplitter<SampleStar>>>,
    ebs: OnceCell<Arc<SampleSplitter<SampleStar>>>,
}

impl Context {
    pub fn new(store: CatalogStore, out: OutputPaths) -> Self {
        Self::with_source(store, out, ModelSource::DataDir)
    }

    /// Context backed by the synthetic model grids instead of grid files.
    pub fn with_synthetic_models(store: CatalogStore, out: OutputPaths) -> Self {
        Self::with_source(store, out, ModelSource::Synthetic)
    }

    fn with_source(store: CatalogStore, out: OutputPaths, model_source: ModelSource) -> Self {
        Self {
            store,
            out,
            model_source,
            mist: OnceCell::new(),
            dsep: OnceCell::new(),
            apogee: OnceCell::new(),
            mcquillan: OnceCell::new(),
            nondetections: OnceCell::new(),
            ebs: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn out(&self) -> &OutputPaths {
        &self.out
    }

    fn load_grid(&self, model: ModelGrid) -> Result<Arc<IsochroneSet>> {
        match self.model_source {
            ModelSource::DataDir => Ok(Arc::new(IsochroneSet::load(self.store.root(), model)?)),
            ModelSource::Synthetic => Ok(Arc::new(IsochroneSet::synthetic(model))),
        }
    }

    /// The MIST model grid, loaded once.
    pub fn mist(&self) -> Result<Arc<IsochroneSet>> {
        self.mist
            .get_or_try_init(|| self.load_grid(ModelGrid::Mist))
            .cloned()
    }

    /// The DSEP model grid, loaded once.
    pub fn dsep(&self) -> Result<Arc<IsochroneSet>> {
        self.dsep
            .get_or_try_init(|| self.load_grid(ModelGrid::Dsep))
            .cloned()
    }

    fn apogee_parts(
        &self,
    ) -> Result<&(Arc<SampleSplitter<SampleStar>>, Arc<CorrectionSet>)> {
        self.apogee.get_or_try_init(|| {
            let mist = self.mist()?;
            let (split, corrections) = samples::build_apogee_sample(&self.store, &mist)?;
            Ok((Arc::new(split), corrections))
        })
    }

    /// The corrected spectroscopic sample.
    pub fn apogee_sample(&self) -> Result<Arc<SampleSplitter<SampleStar>>> {
        Ok(self.apogee_parts()?.0.clone())
    }

    /// The flattening corrections derived from the spectroscopic sample.
    pub fn corrections(&self) -> Result<Arc<CorrectionSet>> {
        Ok(self.apogee_parts()?.1.clone())
    }

    /// The corrected McQuillan rotator sample.
    pub fn mcquillan_sample(&self) -> Result<Arc<SampleSplitter<SampleStar>>> {
        self.mcquillan
            .get_or_try_init(|| {
                let mist = self.mist()?;
                let corrections = self.corrections()?;
                samples::build_mcquillan_sample(&self.store, &mist, &corrections).map(Arc::new)
            })
            .cloned()
    }

    /// The corrected McQuillan non-detection sample.
    pub fn nondetection_sample(&self) -> Result<Arc<SampleSplitter<SampleStar>>> {
        self.nondetections
            .get_or_try_init(|| {
                let mist = self.mist()?;
                let corrections = self.corrections()?;
                samples::build_nondetection_sample(&self.store, &mist, &corrections).map(Arc::new)
            })
            .cloned()
    }

    /// The corrected eclipsing-binary sample.
    pub fn eb_sample(&self) -> Result<Arc<SampleSplitter<SampleStar>>> {
        self.ebs
            .get_or_try_init(|| {
                let mist = self.mist()?;
                let corrections = self.corrections()?;
                samples::build_eb_sample(&self.store, &mist, &corrections).map(Arc::new)
            })
            .cloned()
    }
}
